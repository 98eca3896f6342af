use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, doctor_appointment_routes, AppointmentState};
use notification_cell::{notification_routes, NotificationState};
use slot_cell::{slot_routes, SlotState};

use crate::context::AppContext;

pub fn create_router(context: &AppContext) -> Router {
    let appointment_state = Arc::new(AppointmentState {
        config: context.config.clone(),
        booking: context.booking.clone(),
        lifecycle: context.lifecycle.clone(),
        slots: context.slots.clone(),
        directory: context.directory.clone(),
        clock: context.clock,
    });
    let slot_state = Arc::new(SlotState {
        config: context.config.clone(),
        slots: context.slots.clone(),
        clock: context.clock,
    });
    let notification_state = Arc::new(NotificationState {
        config: context.config.clone(),
        store: context.notifications.clone(),
        directory: context.directory.clone(),
    });

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/appointment", appointment_routes(appointment_state.clone()))
        .nest("/doctor", slot_routes(slot_state).merge(doctor_appointment_routes(appointment_state)))
        .nest("/notifications", notification_routes(notification_state))
}
