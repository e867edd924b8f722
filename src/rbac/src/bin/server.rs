//! # RBAC HTTP Server
//!
//! HTTP boundary for the Gatekeeper RBAC engine. Exposes authentication,
//! permission-guarded sample routes, and the management panel.
//!
//! ## Endpoints
//!
//! - `POST /api/auth/register` - Create an account
//! - `POST /api/auth/login` - Exchange credentials for a token
//! - `GET /api/profile` - Guarded by `profile:view`
//! - `GET /api/admin/dashboard` - Guarded by `dashboard:view`
//! - `/api/admin/panel/*` - Role/permission management, guarded by `system:admin`
//! - `GET /health` - Health check
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `DATABASE_URL` - PostgreSQL connection string (required)
//! - `REDIS_URL` - Redis connection string (optional; in-process cache if unset)
//! - `JWT_SECRET` - Token signing secret (required)
//! - `CACHE_TTL_SECS` - Role cache TTL in seconds (default: 3600)
//! - `RUST_LOG` - Log level (default: info)

use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    serve, Router,
};
use gatekeeper_rbac::types::{
    AssignPermissionRequest, AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest,
    UnassignPermissionRequest, UnassignRoleRequest,
};
use gatekeeper_rbac::{
    AuthResponse, AuthService, Config, InMemoryRoleCache, LoginRequest, PostgresPolicyStore,
    RbacEngine, RbacError, RedisRoleCache, RegisterRequest, RoleCache,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    engine: Arc<RbacEngine>,
    auth: Arc<AuthService>,
    start_time: std::time::Instant,
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Plain confirmation body for mutations
#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Application error type, mapped onto HTTP statuses
#[derive(Debug)]
enum AppError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<RbacError> for AppError {
    fn from(err: RbacError) -> Self {
        match &err {
            RbacError::InvalidCredentials | RbacError::InvalidToken(_) => {
                AppError::Unauthorized(err.to_string())
            }
            RbacError::Conflict(_) => AppError::Conflict(err.to_string()),
            _ if err.is_not_found() => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    loaded_roles: usize,
    version: String,
}

/// Access-guard middleware: bearer token → verified user id → engine check.
///
/// A missing or invalid token is an authentication failure (401); a valid
/// token without the required permission is a deny (403); a store outage is
/// an infrastructure error (500). The three are deliberately distinct.
async fn permission_guard(
    State((state, required)): State<(AppState, &'static str)>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("malformed Authorization header".to_string()))?;

    let user_id = state.auth.verify(token)?;

    let allowed = state.engine.check_access(&user_id, required).await?;
    if !allowed {
        return Err(AppError::Forbidden(format!(
            "access denied: missing permission {}",
            required
        )));
    }

    Ok(next.run(request).await)
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    state.auth.register(&req).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user created".to_string(),
        }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth.login(&req).await?;
    Ok(Json(response))
}

/// GET /api/admin/dashboard
async fn admin_dashboard() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "hello admin, this is the dashboard".to_string(),
    })
}

/// GET /api/profile
async fn profile() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "hello user, this is your profile".to_string(),
    })
}

/// GET /api/admin/panel/roles
async fn get_roles(State(state): State<AppState>) -> Result<Response, AppError> {
    let roles = state.engine.roles().await?;
    Ok(Json(roles).into_response())
}

/// GET /api/admin/panel/permissions
async fn get_permissions(State(state): State<AppState>) -> Result<Response, AppError> {
    let permissions = state.engine.permissions().await?;
    Ok(Json(permissions).into_response())
}

/// GET /api/admin/panel/users/:id/roles
async fn get_user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let roles = state.engine.user_roles(&user_id).await?;
    Ok(Json(roles).into_response())
}

/// POST /api/admin/panel/roles
async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.create_role(&req).await?;
    Ok(Json(MessageResponse {
        message: "role created".to_string(),
    }))
}

/// POST /api/admin/panel/permissions
async fn create_permission(
    State(state): State<AppState>,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.create_permission(&req).await?;
    Ok(Json(MessageResponse {
        message: "permission created".to_string(),
    }))
}

/// POST /api/admin/panel/roles/assign-perm
async fn assign_permission(
    State(state): State<AppState>,
    Json(req): Json<AssignPermissionRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.assign_permission_to_role(&req).await?;
    Ok(Json(MessageResponse {
        message: "permission assigned to role".to_string(),
    }))
}

/// POST /api/admin/panel/users/assign-role
async fn assign_role(
    State(state): State<AppState>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.assign_role_to_user(&req).await?;
    Ok(Json(MessageResponse {
        message: "role assigned to user".to_string(),
    }))
}

/// DELETE /api/admin/panel/roles/remove-perm
async fn remove_permission(
    State(state): State<AppState>,
    Json(req): Json<UnassignPermissionRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.remove_permission_from_role(&req).await?;
    Ok(Json(MessageResponse {
        message: "permission removed from role".to_string(),
    }))
}

/// DELETE /api/admin/panel/users/remove-role
async fn remove_role(
    State(state): State<AppState>,
    Json(req): Json<UnassignRoleRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.engine.remove_role_from_user(&req).await?;
    Ok(Json(MessageResponse {
        message: "role removed from user".to_string(),
    }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        loaded_roles: state.engine.loaded_roles(),
        version: gatekeeper_rbac::VERSION.to_string(),
    })
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let dashboard = Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), "dashboard:view"),
            permission_guard,
        ));

    let profile_routes = Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), "profile:view"),
            permission_guard,
        ));

    let admin_panel = Router::new()
        .route("/roles", get(get_roles).post(create_role))
        .route("/permissions", get(get_permissions).post(create_permission))
        .route("/users/:id/roles", get(get_user_roles))
        .route("/roles/assign-perm", post(assign_permission))
        .route("/users/assign-role", post(assign_role))
        .route("/roles/remove-perm", delete(remove_permission))
        .route("/users/remove-role", delete(remove_role))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), "system:admin"),
            permission_guard,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", dashboard.merge(profile_routes))
        .nest("/api/admin/panel", admin_panel)
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gatekeeper RBAC server v{}", gatekeeper_rbac::VERSION);

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Port: {}", config.port);
    info!("  Role cache TTL: {:?}", config.cache_ttl);
    info!(
        "  Cache backend: {}",
        if config.redis_url.is_some() { "redis" } else { "in-process" }
    );

    // Policy store is a hard dependency; fail fast if it is unreachable.
    let store = PostgresPolicyStore::connect(&config.database_url).await?;
    store.run_migrations().await?;
    info!("Connected to policy store");

    // The cache is best-effort at runtime, but a configured-and-unreachable
    // Redis at bootstrap is an operator error worth failing on.
    let cache: Arc<dyn RoleCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisRoleCache::connect(url).await?;
            info!("Connected to role cache");
            Arc::new(redis)
        }
        None => Arc::new(InMemoryRoleCache::new()),
    };

    let store = Arc::new(store);
    let engine = Arc::new(RbacEngine::with_cache_ttl(
        store.clone(),
        cache,
        config.cache_ttl,
    ));

    // A failed initial load is survivable: the engine serves an empty graph
    // (denying everything) until the next successful reload.
    if let Err(e) = engine.load_policy().await {
        warn!("failed to load RBAC policy at startup: {}", e);
    }

    let auth = Arc::new(AuthService::new(store, &config.jwt_secret));

    let state = AppState {
        engine,
        auth,
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind HTTP server: {}", e);
            return Err(e.into());
        }
    };

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}
