pub mod context;
pub mod router;

pub use context::AppContext;
pub use router::create_router;
