//! Graph repository implementations

mod memory;
mod repository;

pub use memory::InMemoryGraphRepository;
pub use repository::SqliteGraphRepository;
