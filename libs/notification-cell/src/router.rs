use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put, delete},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, NotificationState};

pub fn notification_routes(state: Arc<NotificationState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread-count", get(handlers::unread_count))
        .route("/read-all", put(handlers::mark_all_read))
        .route("/clear-read", delete(handlers::clear_read))
        .route("/device-token", put(handlers::register_device_token))
        .route("/{notification_id}/read", put(handlers::mark_read))
        .route("/{notification_id}", delete(handlers::delete_notification))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
