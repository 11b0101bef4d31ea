use crate::{
    AppState,
    auth::{AuthSession, Credentials},
    models::{NavigateRequest, NavigationResponse, RouteSummary, SetItemRequest, StorageEntry},
    navigation::TransitionRequest,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

// --- Navigation Handlers ---

/// navigate
///
/// [Public Route] Runs the guard protocol for one client-side transition and returns
/// its outcome. Credentials are optional; missing or invalid ones simply mean "no session".
#[utoipa::path(
    post,
    path = "/navigate",
    request_body = NavigateRequest,
    responses((status = 200, description = "Transition outcome", body = NavigationResponse))
)]
pub async fn navigate(
    State(state): State<AppState>,
    credentials: Credentials,
    Json(payload): Json<NavigateRequest>,
) -> Json<NavigationResponse> {
    let request = TransitionRequest::parse(&payload.to);
    let navigation = state.navigation.navigate(&request, &credentials).await;
    Json(NavigationResponse::from(navigation))
}

/// get_routes
///
/// [Public Route] Lists the route table in matching order.
#[utoipa::path(
    get,
    path = "/routes",
    responses((status = 200, description = "Route table", body = [RouteSummary]))
)]
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteSummary>> {
    let routes = state
        .navigation
        .routes()
        .records()
        .map(RouteSummary::from)
        .collect();
    Json(routes)
}

// --- Storage Handlers ---

fn to_entries(items: Vec<(String, String)>) -> Vec<StorageEntry> {
    items
        .into_iter()
        .map(|(key, value)| StorageEntry { key, value })
        .collect()
}

/// list_storage
///
/// [Authenticated Route] Lists every entry of the caller's storage scope.
#[utoipa::path(
    get,
    path = "/storage",
    responses((status = 200, description = "Entries", body = [StorageEntry]))
)]
pub async fn list_storage(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> Json<Vec<StorageEntry>> {
    let items = state.storage.storage_items(&session.subject).await;
    Json(to_entries(items))
}

/// clear_storage
///
/// [Authenticated Route] Empties the caller's storage scope.
#[utoipa::path(
    delete,
    path = "/storage",
    responses((status = 204, description = "Cleared"))
)]
pub async fn clear_storage(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> StatusCode {
    state.storage.clear(&session.subject).await;
    StatusCode::NO_CONTENT
}

/// get_storage_item
///
/// [Authenticated Route] Reads one key of the caller's scope.
#[utoipa::path(
    get,
    path = "/storage/{key}",
    params(("key" = String, Path, description = "Storage key")),
    responses(
        (status = 200, description = "Found", body = StorageEntry),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_storage_item(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StorageEntry>, StatusCode> {
    match state.storage.get_item(&session.subject, &key).await {
        Some(value) => Ok(Json(StorageEntry { key, value })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// set_storage_item
///
/// [Authenticated Route] Writes one key of the caller's scope and echoes the stored value.
#[utoipa::path(
    put,
    path = "/storage/{key}",
    params(("key" = String, Path, description = "Storage key")),
    request_body = SetItemRequest,
    responses((status = 200, description = "Stored", body = StorageEntry))
)]
pub async fn set_storage_item(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<SetItemRequest>,
) -> Json<StorageEntry> {
    let value = state
        .storage
        .set_item(&session.subject, &key, &payload.value)
        .await;
    Json(StorageEntry { key, value })
}

/// delete_storage_item
///
/// [Authenticated Route] Removes one key of the caller's scope.
/// 204 when the key existed, 404 otherwise.
#[utoipa::path(
    delete,
    path = "/storage/{key}",
    params(("key" = String, Path, description = "Storage key")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_storage_item(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> StatusCode {
    if state.storage.remove_item(&session.subject, &key).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
