use axum::{
    extract::{FromRef, Request},
    http::HeaderName,
    Router,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Collaborators of the guard engine.
pub mod auth;
pub mod config;
pub mod gateway;
pub mod notify;
pub mod queries;
pub mod storage;

// Route table and guard engine.
pub mod navigation;

// HTTP surface.
pub mod handlers;
pub mod models;
pub mod routes;
use routes::{authenticated, public};
use auth::AuthSession;

// --- Public Re-exports ---

pub use auth::{AuthOracle, AuthState, Credentials, JwtAuthOracle, Session};
pub use config::AppConfig;
pub use gateway::{GatewayState, HttpQueryGateway, QueryGateway};
pub use navigation::{NavigationGuards, NavigationState, RouteTable, app_routes};
pub use storage::{MemoryStorage, PostgresStore, StorageHelper, StorageState};

/// ApiDoc
///
/// OpenAPI document for the gate service, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::navigate, handlers::get_routes, handlers::list_storage,
        handlers::clear_storage, handlers::get_storage_item, handlers::set_storage_item,
        handlers::delete_storage_item
    ),
    components(
        schemas(
            models::NavigateRequest, models::NavigationResponse, models::OutcomeKind,
            models::RouteSummary, models::StorageEntry, models::SetItemRequest,
            navigation::RouteMeta, navigation::RouteProps,
            notify::Notification, notify::NotificationColor,
        )
    ),
    tags(
        (name = "spec-portal", description = "Navigation gate for the spec portal client")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, cloneable container of every shared service. Handlers pull the parts they
/// need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Guard engine: route table plus its collaborators.
    pub navigation: NavigationState,
    /// Storage adapter, already bound to its durable or fallback backend.
    pub storage: StorageState,
    /// Auth Oracle, shared with the engine and the `AuthSession` extractor.
    pub auth: AuthState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for NavigationState {
    fn from_ref(app_state: &AppState) -> NavigationState {
        app_state.navigation.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects requests to `authenticated_routes` with 401 unless the Auth Oracle accepts
/// their credentials (the `AuthSession` extractor does the rejecting).
async fn auth_middleware(
    _session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                ))
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
             ServiceBuilder::new()
                 .layer(SetRequestIdLayer::new(
                     x_request_id.clone(),
                     MakeRequestUuid,
                 ))
                 .layer(
                     TraceLayer::new_for_http()
                         .make_span_with(trace_span_logger)
                         .on_response(
                             DefaultOnResponse::new()
                                 .level(Level::INFO)
                                 .latency_unit(tower_http::LatencyUnit::Millis)
                         )
                 )
                 .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set above, so every
/// log line of one request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
