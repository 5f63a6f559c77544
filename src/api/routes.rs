use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Entity clone action (single top-level entity only)
        .route(
            "/api/_action/clone/:entity/:id",
            post(handlers::clone_entity::<S>),
        )
        // Root collection: listing and create
        .route(
            "/api/:entity",
            get(handlers::list_root::<S>).post(handlers::create_root::<S>),
        )
        // Everything nested: detail, nested listing, create, update, delete.
        // The resolved segment chain decides detail vs. listing for GET.
        .route(
            "/api/:entity/*path",
            get(handlers::get_path::<S>)
                .post(handlers::create_path::<S>)
                .patch(handlers::update_path::<S>)
                .delete(handlers::delete_path::<S>),
        )
}
