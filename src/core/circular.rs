//! Blocking Bounded FIFO Queue (Multi-Producer Multi-Consumer)
//!
//! Implementasi menggunakan satu Mutex + dua Condvar (`not_full`, `not_empty`).
//! Blocking disengaja: producer yang kena queue penuh di-suspend (bukan spin),
//! consumer yang kena queue kosong juga di-suspend.
//!
//! Head dan tail adalah counter monotonic (tidak pernah wrap, tidak pernah reset).
//! Slot fisik = `counter % capacity`, jadi `head == tail` selalu berarti kosong
//! dan tidak ambigu dengan kondisi penuh.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use super::capacity::Capacity;
use super::error::{CapacityError, Closed, PushError};

/// Penyimpanan element
enum Storage<T> {
    /// Fixed slots, dialokasikan sekali saat konstruksi
    Ring(Box<[Option<T>]>),
    /// Capacity 0 - tumbuh sesuai kebutuhan
    Growable(VecDeque<T>),
}

/// State yang dijaga oleh lock
struct State<T> {
    head: u64,
    tail: u64,
    closed: bool,
    storage: Storage<T>,
}

impl<T> State<T> {
    #[inline(always)]
    fn len(&self) -> usize {
        (self.tail - self.head) as usize
    }

    /// Tulis ke slot `tail`. Caller sudah memastikan ada ruang.
    #[inline(always)]
    fn write(&mut self, value: T) {
        match &mut self.storage {
            Storage::Ring(slots) => {
                let idx = (self.tail % slots.len() as u64) as usize;
                debug_assert!(slots[idx].is_none(), "slot {} still occupied", idx);
                slots[idx] = Some(value);
            }
            Storage::Growable(items) => items.push_back(value),
        }
        self.tail += 1;
    }

    /// Baca dari slot `head`, `None` jika kosong
    #[inline(always)]
    fn read(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }

        let value = match &mut self.storage {
            Storage::Ring(slots) => {
                let idx = (self.head % slots.len() as u64) as usize;
                slots[idx].take()
            }
            Storage::Growable(items) => items.pop_front(),
        };
        debug_assert!(value.is_some(), "occupied slot {} was empty", self.head);

        if value.is_some() {
            self.head += 1;
        }
        value
    }
}

/// Thread-safe circular queue dengan blocking backpressure
///
/// Queue hanya memindahkan handle element (`Arc<P>`, `Box<P>`, `&P`, ...),
/// tidak pernah clone atau copy payload di belakangnya. Setiap element
/// dikirim ke tepat satu consumer, urutan FIFO strict.
///
/// ```
/// use std::sync::Arc;
/// use circular::core::Circular;
///
/// let queue = Circular::new(2);
/// let packet = Arc::new(42u64);
/// queue.push(Arc::clone(&packet)).unwrap();
///
/// let popped = queue.pop().unwrap();
/// assert!(Arc::ptr_eq(&packet, &popped));
/// ```
pub struct Circular<T> {
    capacity: Capacity,
    state: Mutex<State<T>>,
    // Producer menunggu di sini saat penuh
    not_full: Condvar,
    // Consumer menunggu di sini saat kosong
    not_empty: Condvar,
}

impl<T> Circular<T> {
    /// Membuat queue baru. `capacity == 0` berarti unbounded.
    ///
    /// Untuk capacity > 0, semua slot dialokasikan di sini.
    /// Setelah itu, tidak ada alokasi di push/pop.
    pub fn new(capacity: usize) -> Self {
        Self::with_capacity(Capacity::new(capacity))
    }

    /// Membuat queue dari [`Capacity`] yang sudah divalidasi
    ///
    /// # Panics
    ///
    /// Panic jika slot tidak bisa dialokasikan. Untuk capacity dari input
    /// luar, pakai [`Circular::try_with_capacity`].
    pub fn with_capacity(capacity: Capacity) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(queue) => queue,
            Err(err) => panic!("{}", err),
        }
    }

    /// Seperti [`Circular::with_capacity`], tapi gagal alokasi
    /// dikembalikan sebagai [`CapacityError::Alloc`]
    pub fn try_with_capacity(capacity: Capacity) -> Result<Self, CapacityError> {
        let storage = match capacity.limit() {
            Some(n) => {
                let mut slots = Vec::new();
                slots
                    .try_reserve_exact(n)
                    .map_err(|_| CapacityError::Alloc(n))?;
                slots.resize_with(n, || None);
                Storage::Ring(slots.into_boxed_slice())
            }
            None => Storage::Growable(VecDeque::new()),
        };

        Ok(Self {
            capacity,
            state: Mutex::new(State {
                head: 0,
                tail: 0,
                closed: false,
                storage,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    /// Push element ke tail (Producer side)
    ///
    /// Block selama queue penuh. Gagal dengan [`PushError`] jika queue
    /// sudah di-close, termasuk jika close terjadi selagi menunggu;
    /// element dikembalikan di dalam error.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        let mut state = self.state.lock();

        if let Some(limit) = self.capacity.limit() {
            while !state.closed && state.len() >= limit {
                trace!(len = state.len(), "push blocked: queue full");
                self.not_full.wait(&mut state);
                trace!(len = state.len(), closed = state.closed, "push woke");
            }
        }

        if state.closed {
            return Err(PushError(value));
        }

        state.write(value);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop element dari head (Consumer side)
    ///
    /// Block selama queue kosong dan masih open. Setelah close, element
    /// yang sudah ter-buffer tetap dikembalikan sampai habis, baru
    /// kemudian gagal dengan [`Closed`].
    pub fn pop(&self) -> Result<T, Closed> {
        let mut state = self.state.lock();

        loop {
            if let Some(value) = state.read() {
                drop(state);
                self.not_full.notify_one();
                return Ok(value);
            }

            if state.closed {
                return Err(Closed);
            }

            trace!("pop blocked: queue empty");
            self.not_empty.wait(&mut state);
            trace!(len = state.len(), closed = state.closed, "pop woke");
        }
    }

    /// Jumlah element dalam queue (snapshot, bisa langsung stale)
    #[inline]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Cek apakah queue kosong
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cek apakah queue sudah di-close
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Kapasitas yang dikonfigurasi
    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Snapshot `(head, tail)` counter
    ///
    /// Keduanya monotonic, `tail - head == len()`.
    pub fn cursors(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.head, state.tail)
    }

    /// Close queue dan bangunkan SEMUA thread yang sedang block
    ///
    /// Producer yang menunggu akan gagal dengan `Closed`; consumer yang
    /// menunggu akan drain sisa element lalu gagal. Aman dipanggil
    /// berkali-kali - panggilan kedua dan seterusnya tidak berefek.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let pending = state.len();
        drop(state);

        debug!(pending, "queue closed");

        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

// Manual impl supaya tidak butuh `T: Debug`
impl<T> fmt::Debug for Circular<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Circular")
            .field("capacity", &self.capacity)
            .field("len", &state.len())
            .field("head", &state.head)
            .field("tail", &state.tail)
            .field("closed", &state.closed)
            .finish()
    }
}
