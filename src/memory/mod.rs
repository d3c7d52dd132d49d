//! Memory records and their persistence
//!
//! - [`types`]: the `MemoryRecord` shape and the `Mood` scale
//! - [`store`]: `MemoryStore` trait with sqlite and in-memory backends
//! - [`accessor`]: the normalizing facade the analytics engine reads from

pub mod accessor;
pub mod store;
pub mod types;

pub use accessor::{chronological, MemoryAccessor, RecordFilter};
pub use store::{InMemoryStore, MemoryStore, SqliteStore, StoreError, StoreResult};
pub use types::{MemoryRecord, Mood};
