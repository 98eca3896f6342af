use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

/// Patient booking and discovery. Mounted under `/appointment`.
pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_my_appointments).post(handlers::book_appointment))
        .route("/doctors", get(handlers::list_doctors))
        .route("/doctors/{doctor_id}/slots", get(handlers::list_doctor_slots))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", put(handlers::cancel_my_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

/// Doctor-side lifecycle. Mounted under `/doctor` next to the slot routes.
pub fn doctor_appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::list_doctor_appointments))
        .route("/appointments/{appointment_id}/complete", put(handlers::complete_appointment))
        .route("/appointments/{appointment_id}/cancel", put(handlers::doctor_cancel_appointment))
        .route("/appointments/{appointment_id}/prescription", put(handlers::update_prescription))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
