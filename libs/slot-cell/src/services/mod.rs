pub mod generator;
pub mod memory_store;
pub mod slots;
pub mod store;

pub use generator::SlotGenerator;
pub use memory_store::MemorySlotStore;
pub use slots::SlotService;
pub use store::{SlotStore, SupabaseSlotStore};
