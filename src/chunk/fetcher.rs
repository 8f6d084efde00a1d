//! Asynchronous ranged read dengan wait handle
//!
//! [`ChunkFetcher::fetch`] memvalidasi range, lalu menjalankan read di
//! worker thread. [`Chunk`] adalah handle untuk menunggu hasilnya.
//! Buffer hasil read diambil dari [`Pool`] dan dikembalikan saat chunk di-drop,
//! atau oleh worker jika chunk sudah di-drop sebelum read selesai.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::error::FetchError;
use super::range::ByteRange;
use super::store::ObjectStore;
use crate::pool::Pool;

/// Batas buffer idle yang disimpan fetcher
const MAX_IDLE_BUFFERS: usize = 64;

type FetchResult = Result<Vec<u8>, FetchError>;

/// Hasil fetch yang di-share antara worker dan [`Chunk`]
///
/// Siapa pun yang melepas `Arc` terakhir (chunk atau worker) ikut
/// mengembalikan buffer ke pool.
struct Completion {
    result: OnceLock<FetchResult>,
    lock: Mutex<()>,
    ready: Condvar,
    buffers: Arc<Pool<Vec<u8>>>,
}

impl Completion {
    fn new(buffers: Arc<Pool<Vec<u8>>>) -> Self {
        Self {
            result: OnceLock::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
            buffers,
        }
    }

    /// Dipanggil tepat sekali oleh worker
    fn complete(&self, result: FetchResult) {
        let _ = self.result.set(result);
        let _guard = self.lock.lock();
        self.ready.notify_all();
    }

    fn wait(&self) -> &FetchResult {
        let mut guard = self.lock.lock();
        loop {
            if let Some(result) = self.result.get() {
                return result;
            }
            self.ready.wait(&mut guard);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(Ok(buf)) = self.result.take() {
            self.buffers.put(buf);
        }
    }
}

/// Menjalankan ranged read terhadap satu [`ObjectStore`]
pub struct ChunkFetcher<S> {
    store: Arc<S>,
    buffers: Arc<Pool<Vec<u8>>>,
}

impl<S: ObjectStore + 'static> ChunkFetcher<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Share store yang sudah ada
    pub fn from_arc(store: Arc<S>) -> Self {
        let buffers = Arc::new(Pool::with_max_idle(Vec::new, MAX_IDLE_BUFFERS));
        Self::with_buffer_pool(store, buffers)
    }

    /// Pakai pool buffer milik caller, misalnya untuk share antar fetcher
    pub fn with_buffer_pool(store: Arc<S>, buffers: Arc<Pool<Vec<u8>>>) -> Self {
        Self { store, buffers }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn buffer_pool(&self) -> &Arc<Pool<Vec<u8>>> {
        &self.buffers
    }

    /// Mulai fetch `size` bytes dari `offset` di object `bucket/key`
    ///
    /// Range tidak valid gagal di sini, sebelum worker dijalankan.
    /// Error dari store dilaporkan lewat [`Chunk::wait`].
    pub fn fetch(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        size: u64,
    ) -> Result<Chunk, FetchError> {
        let range = ByteRange::new(offset, size)?;
        let completion = Arc::new(Completion::new(Arc::clone(&self.buffers)));

        let worker = {
            let store = Arc::clone(&self.store);
            let buffers = Arc::clone(&self.buffers);
            let completion = Arc::clone(&completion);
            let bucket = bucket.to_string();
            let key = key.to_string();

            thread::Builder::new()
                .name("chunk-fetch".into())
                .spawn(move || {
                    let mut buf = buffers.get();
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        store.read_range(&bucket, &key, range, &mut buf)
                    }));

                    let result = match outcome {
                        Ok(Ok(())) => Ok(buf),
                        Ok(Err(err)) => {
                            warn!(%bucket, %key, %range, error = %err, "chunk fetch failed");
                            buffers.put(buf);
                            Err(err)
                        }
                        Err(_) => {
                            warn!(%bucket, %key, %range, "chunk fetch worker panicked");
                            Err(FetchError::WorkerPanicked)
                        }
                    };
                    completion.complete(result);
                })?
        };

        debug!(%bucket, %key, %range, "chunk fetch started");

        Ok(Chunk {
            completion,
            worker: Some(worker),
            bucket: bucket.to_string(),
            key: key.to_string(),
            range,
        })
    }
}

impl<S> fmt::Debug for ChunkFetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkFetcher")
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

/// Wait handle untuk satu ranged read
///
/// `wait` boleh dipanggil berkali-kali dan dari beberapa thread;
/// semua mendapat hasil yang sama.
pub struct Chunk {
    completion: Arc<Completion>,
    worker: Option<JoinHandle<()>>,
    bucket: String,
    key: String,
    range: ByteRange,
}

impl Chunk {
    /// Block sampai read selesai, lalu kembalikan bytes atau error
    pub fn wait(&self) -> Result<&[u8], FetchError> {
        match self.completion.wait() {
            Ok(data) => Ok(data.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Cek tanpa block apakah read sudah selesai
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.completion.result.get().is_some()
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // Read masih jalan: worker di-detach dan mengembalikan buffer sendiri
        if !self.is_ready() {
            debug!(range = %self.range, "chunk dropped before read finished");
            return;
        }

        // Worker sudah set hasil, tinggal exit - join singkat supaya
        // `Arc` terakhir ada di sini dan buffer langsung kembali ke pool
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("range", &self.range)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MemoryStore;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn fetcher_with(data: &[u8]) -> ChunkFetcher<MemoryStore> {
        let store = MemoryStore::new();
        store.insert("bucket", "object", data.to_vec());
        ChunkFetcher::new(store)
    }

    /// Store yang menahan read sampai test mengizinkan
    struct GatedStore {
        inner: MemoryStore,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ObjectStore for GatedStore {
        fn read_range(
            &self,
            bucket: &str,
            key: &str,
            range: ByteRange,
            buf: &mut Vec<u8>,
        ) -> Result<(), FetchError> {
            self.gate.lock().recv().ok();
            self.inner.read_range(bucket, key, range, buf)
        }
    }

    struct PanickingStore;

    impl ObjectStore for PanickingStore {
        fn read_range(
            &self,
            _bucket: &str,
            _key: &str,
            _range: ByteRange,
            _buf: &mut Vec<u8>,
        ) -> Result<(), FetchError> {
            panic!("backend exploded");
        }
    }

    #[test]
    fn test_fetch_range() {
        let fetcher = fetcher_with(b"0123456789");

        let chunk = fetcher.fetch("bucket", "object", 2, 4).unwrap();
        assert_eq!(chunk.wait().unwrap(), b"2345");
        assert!(chunk.is_ready());
        assert_eq!(chunk.range().to_string(), "bytes=2-5");
        assert_eq!((chunk.bucket(), chunk.key()), ("bucket", "object"));

        // Wait kedua mengembalikan hasil yang sama
        assert_eq!(chunk.wait().unwrap(), b"2345");
    }

    #[test]
    fn test_invalid_range_fails_synchronously() {
        let fetcher = fetcher_with(b"0123456789");
        assert!(matches!(
            fetcher.fetch("bucket", "object", 0, 0),
            Err(FetchError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_store_errors_surface_on_wait() {
        let fetcher = fetcher_with(b"0123456789");

        let missing = fetcher.fetch("bucket", "missing", 0, 4).unwrap();
        assert!(matches!(missing.wait(), Err(FetchError::NotFound { .. })));

        let past_end = fetcher.fetch("bucket", "object", 10, 4).unwrap();
        assert!(matches!(
            past_end.wait(),
            Err(FetchError::RangeNotSatisfiable { len: 10, .. })
        ));
    }

    #[test]
    fn test_wait_blocks_until_read_completes() {
        let (open_tx, open_rx) = mpsc::channel();
        let inner = MemoryStore::new();
        inner.insert("bucket", "object", b"payload".to_vec());
        let fetcher = ChunkFetcher::new(GatedStore {
            inner,
            gate: Mutex::new(open_rx),
        });

        let chunk = Arc::new(fetcher.fetch("bucket", "object", 0, 7).unwrap());
        assert!(!chunk.is_ready());

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let chunk = Arc::clone(&chunk);
                thread::spawn(move || chunk.wait().map(|data| data.to_vec()))
            })
            .collect();

        open_tx.send(()).unwrap();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().unwrap(), b"payload");
        }
        assert!(chunk.is_ready());
    }

    #[test]
    fn test_worker_panic_reported() {
        let fetcher = ChunkFetcher::new(PanickingStore);
        let chunk = fetcher.fetch("bucket", "object", 0, 1).unwrap();
        assert!(matches!(chunk.wait(), Err(FetchError::WorkerPanicked)));
    }

    #[test]
    fn test_buffer_returned_to_pool_on_drop() {
        let fetcher = fetcher_with(&[7u8; 4096]);
        assert_eq!(fetcher.buffer_pool().idle(), 0);

        let chunk = fetcher.fetch("bucket", "object", 0, 4096).unwrap();
        assert_eq!(chunk.wait().unwrap().len(), 4096);
        drop(chunk);
        assert_eq!(fetcher.buffer_pool().idle(), 1);

        // Fetch berikutnya memakai buffer yang sama, dalam kondisi kosong
        let chunk = fetcher.fetch("bucket", "object", 100, 10).unwrap();
        assert_eq!(chunk.wait().unwrap(), &[7u8; 10]);
        assert_eq!(fetcher.buffer_pool().idle(), 0);
    }

    #[test]
    fn test_drop_before_read_finishes_still_returns_buffer() {
        let (open_tx, open_rx) = mpsc::channel();
        let inner = MemoryStore::new();
        inner.insert("bucket", "object", vec![3u8; 1024]);
        let fetcher = ChunkFetcher::new(GatedStore {
            inner,
            gate: Mutex::new(open_rx),
        });

        let chunk = fetcher.fetch("bucket", "object", 0, 1024).unwrap();
        assert!(!chunk.is_ready());

        // Drop tidak menunggu worker yang masih tertahan
        let (dropped_tx, dropped_rx) = mpsc::channel();
        thread::spawn(move || {
            drop(chunk);
            dropped_tx.send(()).ok();
        });
        dropped_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.buffer_pool().idle(), 0);

        open_tx.send(()).unwrap();

        // Worker selesai belakangan dan mengembalikan buffer ke pool
        let deadline = Instant::now() + Duration::from_secs(5);
        while fetcher.buffer_pool().idle() == 0 {
            assert!(Instant::now() < deadline, "buffer never returned to pool");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(fetcher.buffer_pool().idle(), 1);

        // Buffer yang kembali sudah di-reset
        let reused = fetcher.buffer_pool().get();
        assert!(reused.is_empty());
        assert!(reused.capacity() >= 1024);
    }
}
