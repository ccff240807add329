/// Realtime wire format
///
/// Every WebSocket text frame carries one named event:
///
/// ```text
/// {"event": "task:updated", "data": { ...full task... }}
/// ```
///
/// # Server → client
///
/// | Event | Scope | Data |
/// |---|---|---|
/// | `task:created` | broadcast | full task |
/// | `task:created` | creator only | `{userId, message}` |
/// | `task:assigned` | assignee only | `{userId, message}` |
/// | `task:updated` | broadcast | full task |
/// | `task:deleted` | broadcast | task ID string |
///
/// # Client → server
///
/// | Event | Data |
/// |---|---|
/// | `user:joined` | user ID string |
///
/// The two `task:created` shapes share one name; decoding tells them apart
/// by the presence of `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::domain::TaskNotice;
use crate::models::Task;

pub const TASK_CREATED: &str = "task:created";
pub const TASK_ASSIGNED: &str = "task:assigned";
pub const TASK_UPDATED: &str = "task:updated";
pub const TASK_DELETED: &str = "task:deleted";
pub const USER_JOINED: &str = "user:joined";

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// One named event on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: JsonValue,
}

fn invalid(event: &str, reason: impl ToString) -> WireError {
    WireError::InvalidPayload {
        event: event.to_string(),
        reason: reason.to_string(),
    }
}

/// Event pushed from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Broadcast: a task was created
    TaskCreated(Task),

    /// To the creator only: confirmation of their own creation
    CreatorNotice(TaskNotice),

    /// To the assignee only
    TaskAssigned(TaskNotice),

    /// Broadcast: a task changed
    TaskUpdated(Task),

    /// Broadcast: a task was removed
    TaskDeleted(Uuid),
}

impl ServerEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::TaskCreated(_) | ServerEvent::CreatorNotice(_) => TASK_CREATED,
            ServerEvent::TaskAssigned(_) => TASK_ASSIGNED,
            ServerEvent::TaskUpdated(_) => TASK_UPDATED,
            ServerEvent::TaskDeleted(_) => TASK_DELETED,
        }
    }

    /// Whether a client should drop its cached task list on this event
    pub fn invalidates_tasks(&self) -> bool {
        !matches!(self, ServerEvent::TaskAssigned(_))
    }

    fn data(&self) -> Result<JsonValue, serde_json::Error> {
        match self {
            ServerEvent::TaskCreated(task) | ServerEvent::TaskUpdated(task) => {
                serde_json::to_value(task)
            }
            ServerEvent::CreatorNotice(notice) | ServerEvent::TaskAssigned(notice) => {
                serde_json::to_value(notice)
            }
            ServerEvent::TaskDeleted(id) => Ok(JsonValue::String(id.to_string())),
        }
    }

    /// Serializes to a text frame
    pub fn encode(&self) -> Result<String, WireError> {
        let frame = Frame {
            event: self.name().to_string(),
            data: self.data()?,
        };
        Ok(serde_json::to_string(&frame)?)
    }

    /// Parses a text frame
    pub fn decode(text: &str) -> Result<Self, WireError> {
        let frame: Frame = serde_json::from_str(text)?;
        let event = frame.event.as_str();

        match event {
            TASK_CREATED if frame.data.get("message").is_some() => {
                let notice = serde_json::from_value(frame.data).map_err(|e| invalid(event, e))?;
                Ok(ServerEvent::CreatorNotice(notice))
            }
            TASK_CREATED => {
                let task = serde_json::from_value(frame.data).map_err(|e| invalid(event, e))?;
                Ok(ServerEvent::TaskCreated(task))
            }
            TASK_ASSIGNED => {
                let notice = serde_json::from_value(frame.data).map_err(|e| invalid(event, e))?;
                Ok(ServerEvent::TaskAssigned(notice))
            }
            TASK_UPDATED => {
                let task = serde_json::from_value(frame.data).map_err(|e| invalid(event, e))?;
                Ok(ServerEvent::TaskUpdated(task))
            }
            TASK_DELETED => {
                let id = frame
                    .data
                    .as_str()
                    .ok_or_else(|| invalid(event, "expected task id string"))?;
                let id = Uuid::parse_str(id).map_err(|e| invalid(event, e))?;
                Ok(ServerEvent::TaskDeleted(id))
            }
            other => Err(WireError::UnknownEvent(other.to_string())),
        }
    }
}

/// Event sent from client to server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Join the room of the given user
    UserJoined(Uuid),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::UserJoined(_) => USER_JOINED,
        }
    }

    pub fn encode(&self) -> Result<String, WireError> {
        let data = match self {
            ClientEvent::UserJoined(user_id) => JsonValue::String(user_id.to_string()),
        };
        let frame = Frame {
            event: self.name().to_string(),
            data,
        };
        Ok(serde_json::to_string(&frame)?)
    }

    pub fn decode(text: &str) -> Result<Self, WireError> {
        let frame: Frame = serde_json::from_str(text)?;

        match frame.event.as_str() {
            USER_JOINED => {
                let id = frame
                    .data
                    .as_str()
                    .ok_or_else(|| invalid(USER_JOINED, "expected user id string"))?;
                let id = Uuid::parse_str(id).map_err(|e| invalid(USER_JOINED, e))?;
                Ok(ClientEvent::UserJoined(id))
            }
            other => Err(WireError::UnknownEvent(other.to_string())),
        }
    }
}
