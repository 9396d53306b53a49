//! Storage layer: a `GraphStore` trait over a relational+property-graph
//! capability (§1), realized with embedded SQLite, plus a content-addressed
//! `BlobStore` trait for the object-storage tier (§4.5).

pub mod blob;
mod sqlite;
#[cfg(feature = "embeddings")]
mod sqlite_vec;
mod traits;

pub use blob::{BlobStore, FilesystemBlobStore};
pub use sqlite::SqliteStore;
pub use traits::{EdgeFilter, GraphStore, NodeFilter, OpenStore, StorageError, StorageResult, Subgraph};
#[cfg(feature = "embeddings")]
pub use sqlite_vec::{EmbeddedKind, SqliteVecStore, DEFAULT_EMBEDDING_DIMENSIONS};
