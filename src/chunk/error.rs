//! Error types untuk ranged object read

use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::range::ByteRange;

/// Kegagalan saat fetch satu byte range
///
/// `Clone` supaya satu hasil bisa dibaca berkali-kali lewat
/// [`Chunk::wait`](super::Chunk::wait) dari beberapa thread.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Size 0, atau `offset + size` overflow
    #[error("invalid byte range: offset {offset}, size {size}")]
    InvalidRange { offset: u64, size: u64 },

    /// Bucket atau key mengandung segment terlarang
    #[error("invalid object name {0:?}")]
    InvalidKey(String),

    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    /// Range dimulai di atau setelah akhir object
    #[error("range {range} not satisfiable for object of {len} bytes")]
    RangeNotSatisfiable { range: ByteRange, len: u64 },

    #[error("storage I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// Store panic di tengah read
    #[error("fetch worker panicked")]
    WorkerPanicked,
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        FetchError::Io(Arc::new(err))
    }
}
