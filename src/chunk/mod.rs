//! Chunk Layer: Ranged Read dari Object Storage
//!
//! Satu chunk = satu byte range dari satu object. Read berjalan di
//! worker thread; caller menunggu lewat [`Chunk::wait`].
//!
//! Layer ini tidak memakai queue. Caller biasanya mengalirkan `Chunk`
//! lewat [`Circular`](crate::core::Circular) dari producer ke consumer.

mod error;
mod fetcher;
mod range;
mod store;

pub use error::FetchError;
pub use fetcher::{Chunk, ChunkFetcher};
pub use range::ByteRange;
pub use store::{FileStore, MemoryStore, ObjectStore};
