use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Storage endpoints scoped to the caller's session subject. Every handler receives the
/// validated `AuthSession`, and the `auth_middleware` layer above this module rejects
/// anonymous requests before they reach a handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/DELETE /storage
        // Lists or clears every entry of the caller's scope.
        .route(
            "/storage",
            get(handlers::list_storage).delete(handlers::clear_storage),
        )
        // GET/PUT/DELETE /storage/{key}
        // Single-key access. DELETE answers 404 when the key did not exist.
        .route(
            "/storage/{key}",
            get(handlers::get_storage_item)
                .put(handlers::set_storage_item)
                .delete(handlers::delete_storage_item),
        )
}
