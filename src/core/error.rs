//! Error types untuk circular queue
//!
//! Hanya ada satu kondisi runtime: queue sudah di-close.
//! Penuh TIDAK pernah jadi error - push akan block sampai ada slot.

use std::fmt;

use thiserror::Error;

/// Queue sudah di-close.
///
/// Terminal: caller harus berhenti produce/consume, jangan retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is closed")]
pub struct Closed;

/// Push gagal karena queue sudah di-close.
///
/// Element yang ditolak dikembalikan ke caller, jadi ownership
/// tidak pernah hilang di dalam queue.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is closed")]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Ambil kembali element yang ditolak
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl supaya tidak butuh `T: Debug`
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError").finish_non_exhaustive()
    }
}

impl<T> From<PushError<T>> for Closed {
    #[inline]
    fn from(_: PushError<T>) -> Self {
        Closed
    }
}

/// Nilai capacity tidak valid saat konstruksi.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// Capacity negatif - tidak di-clamp ke 0 karena 0 = unbounded
    #[error("capacity must not be negative, got {0}")]
    Negative(i64),
    /// Capacity melewati `Capacity::MAX_BOUNDED`
    #[error("capacity {0} exceeds the supported maximum")]
    TooLarge(u64),
    /// Slot untuk capacity ini gagal dialokasikan
    #[error("cannot allocate {0} queue slots")]
    Alloc(usize),
    /// Input bukan angka
    #[error("invalid capacity {0:?}: expected a non-negative integer")]
    Parse(String),
}
