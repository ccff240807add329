/// Task events
///
/// - [`domain`]: what happened, as emitted by the task service
/// - [`wire`]: how it travels over the realtime channel
///
/// The dispatcher in [`crate::realtime`] turns the former into the latter.

pub mod domain;
pub mod wire;

pub use domain::{DomainEvent, TaskNotice};
pub use wire::{ClientEvent, ServerEvent, WireError};
