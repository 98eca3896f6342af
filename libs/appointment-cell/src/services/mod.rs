pub mod booking;
pub mod lifecycle;
pub mod memory_store;
pub mod participants;
pub mod reminder;
pub mod store;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use memory_store::MemoryAppointmentStore;
pub use participants::describe;
pub use reminder::{ReminderScheduler, SHORT_REMINDER_WINDOW};
pub use store::{AppointmentStore, SupabaseAppointmentStore};
