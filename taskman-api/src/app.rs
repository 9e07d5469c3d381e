/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskman_api::{app::{build_router, AppState}, config::Config};
/// use taskman_shared::{db::pool::{create_pool, DatabaseConfig}, store::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::from_url(&config.database.url, 10)).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskman_shared::{
    auth::middleware::{require_user, AuthError},
    services::{AccountService, TaskService},
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Registration, sign-in and account maintenance
    pub accounts: AccountService,

    /// Task CRUD and lifecycle
    pub tasks: TaskService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state over `store`
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), config.hashing_params()),
            tasks: TaskService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                         # Health check (public)
/// └── /v1/
///     ├── POST   /users                   # Sign up (public; admins may assign roles)
///     ├── POST   /sessions                # Sign in (public)
///     ├── GET    /users/me                # Current user
///     ├── GET    /users/:id               # Show account (self or admin)
///     ├── PATCH  /users/:id               # Update account (self or admin)
///     ├── DELETE /users/:id               # Delete account (admin)
///     ├── GET    /tasks                   # Visible tasks
///     ├── POST   /tasks                   # Create task
///     ├── GET    /tasks/:id               # Show task
///     ├── PATCH  /tasks/:id               # Update task
///     ├── DELETE /tasks/:id               # Delete task
///     └── POST   /tasks/:id/events/:event # Fire a lifecycle event
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/users", post(routes::users::sign_up))
        .route("/sessions", post(routes::sessions::sign_in));

    let protected_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .route(
            "/users/:id",
            get(routes::users::show_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::show_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/events/:event", post(routes::tasks::fire_event))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_layer));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
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
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Bearer token authentication for protected routes
async fn auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    require_user(state.store.clone(), state.config.jwt.secret.clone(), req, next).await
}
