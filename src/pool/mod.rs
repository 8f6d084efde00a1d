//! Reuse Pool: Recycle instance supaya tidak alokasi ulang di hot path
//!
//! Pool tidak dipakai oleh queue. Caller yang memakai queue bisa
//! `get()` sebelum push dan `put()` setelah pop.

use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

/// Default batas instance idle yang disimpan pool
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Instance yang bisa di-reset ke kondisi "zero" untuk dipakai ulang
pub trait Reset {
    /// Kembalikan semua field ke nilai awal
    fn reset(&mut self);
}

impl<T> Reset for Vec<T> {
    /// Clear isi, pertahankan alokasi
    #[inline]
    fn reset(&mut self) {
        self.clear();
    }
}

/// Thread-safe pool dari instance yang bisa di-reset
///
/// `get()` selalu mengembalikan instance dalam kondisi reset: entah
/// instance idle dari pool, entah instance baru dari factory.
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    max_idle: usize,
}

impl<T: Reset> Pool<T> {
    /// Membuat pool dengan factory untuk instance baru
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_max_idle(factory, DEFAULT_MAX_IDLE)
    }

    /// Seperti [`Pool::new`], dengan batas instance idle yang disimpan.
    /// Instance yang di-`put` saat pool sudah penuh langsung di-drop.
    pub fn with_max_idle<F>(factory: F, max_idle: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle,
        }
    }

    /// Ambil instance dari pool, atau buat baru jika pool kosong
    #[inline]
    pub fn get(&self) -> T {
        match self.idle.lock().pop() {
            Some(item) => item,
            None => {
                trace!("pool empty, building new instance");
                (self.factory)()
            }
        }
    }

    /// Kembalikan instance ke pool
    ///
    /// Instance di-reset di sini, jadi `get()` berikutnya tidak
    /// pernah melihat state lama.
    #[inline]
    pub fn put(&self, mut item: T) {
        item.reset();

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Jumlah instance idle saat ini
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .finish_non_exhaustive()
    }
}
