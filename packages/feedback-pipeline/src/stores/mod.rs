//! Storage implementations.
//!
//! Available backends:
//! - `MemoryStore` / `MemoryVectorStore` - in-memory (always available)
//! - `LocalFileStore` - raw uploads on the local filesystem
//! - `PostgresStore` / `PgVectorStore` - PostgreSQL + pgvector (requires `postgres` feature)

pub mod files;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use files::LocalFileStore;
pub use memory::{MemoryStore, MemoryVectorStore};

#[cfg(feature = "postgres")]
pub use postgres::{PgVectorStore, PostgresStore};
