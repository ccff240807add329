/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use collabtask_api::{app::AppState, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::in_memory(config);
/// let app = collabtask_api::app::build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use collabtask_shared::auth::middleware::authenticate;
use collabtask_shared::realtime::{ConnectionRegistry, EventDispatcher, InMemoryRegistry};
use collabtask_shared::service::{AccountService, TaskService};
use collabtask_shared::store::{MemoryStore, PgStore, Store};
use sqlx::PgPool;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};

/// Shared application state
///
/// Cloned into every handler via axum's `State` extractor; every field is
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    /// Set when the store is PostgreSQL, for health checks
    pub db: Option<PgPool>,

    pub registry: Arc<dyn ConnectionRegistry>,

    pub tasks: TaskService,

    pub accounts: AccountService,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services around `store` and a fresh connection registry
    pub fn new(store: Arc<dyn Store>, db: Option<PgPool>, config: Config) -> Self {
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryRegistry::new());
        let dispatcher = EventDispatcher::new(registry.clone());

        Self {
            tasks: TaskService::new(store.clone(), dispatcher),
            accounts: AccountService::new(store.clone(), config.jwt.secret.as_str()),
            store,
            db,
            registry,
            config: Arc::new(config),
        }
    }

    /// State backed by PostgreSQL
    pub fn with_database(pool: PgPool, config: Config) -> Self {
        Self::new(Arc::new(PgStore::new(pool.clone())), Some(pool), config)
    }

    /// State backed by the process-lifetime in-memory store
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), None, config)
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// ├── GET  /ws                      # realtime channel
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /logout
///     │   ├── GET  /me              # authenticated
///     │   └── PUT  /profile         # authenticated
///     ├── /tasks/                   # authenticated
///     │   ├── POST   /
///     │   ├── GET    /
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   └── GET    /:id/audit
///     └── /notifications/           # authenticated
///         ├── GET /
///         └── PUT /:id/read
/// ```
///
/// The realtime channel authenticates itself during the upgrade, so it sits
/// outside the JWT layer.
pub fn build_router(state: AppState) -> Router {
    let auth_layer = axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/profile", put(routes::auth::update_profile))
        .route_layer(auth_layer.clone());

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/:id/audit", get(routes::tasks::task_audit_trail))
        .route_layer(auth_layer.clone());

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id/read", put(routes::notifications::mark_read))
        .route_layer(auth_layer);

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(routes::realtime::ws_handler))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.secure_cookies))
        .with_state(state)
}

/// Span for one HTTP request
///
/// Records the path only. The query is left out because `/ws` carries the
/// session token there.
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

/// CORS for the configured browser origins
///
/// A `*` entry switches to permissive CORS, which cannot carry cookies.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Accepts the bearer header or the session cookie and injects
/// [`AuthContext`](collabtask_shared::auth::AuthContext) into request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);
    Ok(next.run(req).await)
}
