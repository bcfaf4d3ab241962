//! Storage Engine
//!
//! In-memory key-value repository with TTL support.

mod repository;
mod store;
mod ttl;

pub use repository::{CommandRepository, RepositoryError};
pub use store::InMemoryRepository;
pub use ttl::TtlCleaner;
