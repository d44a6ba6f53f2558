//! Durable blob storage.
//!
//! [`BlobStore`] is the capability the favorites layer persists through.
//! [`Database`] implements it on SQLite; [`MemoryBlobStore`] keeps blobs in
//! process memory.

mod blobs;
mod memory;
mod schema;
mod types;

pub use blobs::BlobStore;
pub use memory::MemoryBlobStore;
pub use schema::Database;
pub use types::{DatabaseError, StorageError};
