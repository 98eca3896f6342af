pub mod directory;
pub mod memory;

pub use directory::{ParticipantDirectory, SupabaseDirectory};
pub use memory::MemoryDirectory;
