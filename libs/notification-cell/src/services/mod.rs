pub mod dispatcher;
pub mod memory_store;
pub mod outbox;
pub mod push;
pub mod store;
pub mod templates;

pub use dispatcher::NotificationDispatcher;
pub use memory_store::MemoryNotificationStore;
pub use outbox::{NotificationOutbox, OutboxWorker};
pub use push::{DisabledPushProvider, FcmPushProvider, PushProvider};
pub use store::{NotificationStore, SupabaseNotificationStore};
