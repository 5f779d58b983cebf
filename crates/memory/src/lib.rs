//! Decision memory implementations for Curator.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryDecisionMemory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDecisionMemory;
