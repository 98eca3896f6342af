pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::AppointmentState;
pub use models::*;
pub use router::{appointment_routes, doctor_appointment_routes};
pub use services::*;
