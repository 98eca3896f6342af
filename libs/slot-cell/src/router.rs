use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SlotState};

/// Doctor slot management. Mounted under `/doctor`.
pub fn slot_routes(state: Arc<SlotState>) -> Router {
    Router::new()
        .route("/slots/create", post(handlers::create_slot))
        .route("/slots/createBulk", post(handlers::create_bulk_slots))
        .route("/slots", get(handlers::list_slots).delete(handlers::delete_slots_for_date))
        .route("/slots/{slot_id}", delete(handlers::delete_slot))
        .route("/slots/{slot_id}/availability", put(handlers::set_slot_availability))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
