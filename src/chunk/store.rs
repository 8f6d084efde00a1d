//! Object storage backends untuk ranged read
//!
//! Object dialamatkan dengan `(bucket, key)`. Semantik range mengikuti
//! HTTP range request: range yang melewati akhir object dipotong,
//! range yang dimulai setelah akhir object ditolak.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::MmapOptions;
use parking_lot::RwLock;

use super::error::FetchError;
use super::range::ByteRange;

/// Sumber object yang bisa dibaca per byte range
pub trait ObjectStore: Send + Sync {
    /// Append isi `range` dari object `bucket/key` ke `buf`
    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
        buf: &mut Vec<u8>,
    ) -> Result<(), FetchError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    #[inline]
    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
        buf: &mut Vec<u8>,
    ) -> Result<(), FetchError> {
        (**self).read_range(bucket, key, range, buf)
    }
}

/// In-process object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), Arc<[u8]>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simpan object, mengembalikan isi lama jika ada
    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<Arc<[u8]>> {
        self.objects
            .write()
            .insert((bucket.to_string(), key.to_string()), data.into())
    }

    pub fn remove(&self, bucket: &str, key: &str) -> Option<Arc<[u8]>> {
        self.objects
            .write()
            .remove(&(bucket.to_string(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
        buf: &mut Vec<u8>,
    ) -> Result<(), FetchError> {
        // Clone Arc, lepas lock sebelum copy
        let object = self
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        let span = range.clamp(object.len() as u64)?;
        buf.extend_from_slice(&object[span]);
        Ok(())
    }
}

/// Object store di local filesystem: object = file `root/bucket/key`
///
/// Range dibaca via mmap, hanya bagian yang diminta yang di-map.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path file untuk `bucket/key`
    ///
    /// Segment kosong, `.`, `..`, dan path absolut ditolak supaya
    /// object tidak bisa keluar dari `root`.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, FetchError> {
        if !is_valid_segment(bucket) {
            return Err(FetchError::InvalidKey(bucket.to_string()));
        }
        if key.is_empty() || !key.split('/').all(is_valid_segment) {
            return Err(FetchError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.join(bucket);
        path.extend(key.split('/'));
        Ok(path)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

impl ObjectStore for FileStore {
    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
        buf: &mut Vec<u8>,
    ) -> Result<(), FetchError> {
        let path = self.object_path(bucket, key)?;

        let file = File::open(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => FetchError::from(err),
        })?;

        // File kosong selalu gagal di sini, jadi tidak pernah map 0 bytes
        let span = range.clamp(file.metadata()?.len())?;

        // SAFETY: Mapping read-only dan hanya hidup selama copy di bawah.
        // File yang di-truncate oleh proses lain selagi di-map adalah UB
        // yang sama dengan semua pemakai mmap; store ini mengasumsikan
        // object immutable setelah ditulis.
        let mmap = unsafe {
            MmapOptions::new()
                .offset(span.start as u64)
                .len(span.len())
                .map(&file)?
        };

        buf.extend_from_slice(&mmap);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read(
        store: &dyn ObjectStore,
        key: &str,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, FetchError> {
        let mut buf = Vec::new();
        store.read_range("bucket", key, ByteRange::new(offset, size)?, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_memory_store_ranges() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.insert("bucket", "object", b"Hello, Circular!".to_vec());
        assert_eq!(store.len(), 1);

        assert_eq!(read(&store, "object", 0, 5).unwrap(), b"Hello");
        assert_eq!(read(&store, "object", 7, 100).unwrap(), b"Circular!");
        assert!(matches!(
            read(&store, "object", 16, 1),
            Err(FetchError::RangeNotSatisfiable { len: 16, .. })
        ));
        assert!(matches!(
            read(&store, "missing", 0, 1),
            Err(FetchError::NotFound { .. })
        ));

        store.remove("bucket", "object");
        assert!(read(&store, "object", 0, 1).is_err());
    }

    #[test]
    fn test_read_appends_to_buffer() {
        let store = MemoryStore::new();
        store.insert("bucket", "object", b"abcdef".to_vec());

        let mut buf = b"xy".to_vec();
        store
            .read_range("bucket", "object", ByteRange::new(2, 2).unwrap(), &mut buf)
            .unwrap();
        assert_eq!(buf, b"xycd");
    }

    #[test]
    fn test_file_store_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let path = store.object_path("bucket", "nested/object.bin").unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(&path, &data).unwrap();

        // Offset tidak page-aligned
        assert_eq!(
            read(&store, "nested/object.bin", 4099, 300).unwrap(),
            &data[4099..4399]
        );
        // Dipotong di akhir file
        assert_eq!(
            read(&store, "nested/object.bin", 9_990, 100).unwrap(),
            &data[9_990..]
        );
        assert!(matches!(
            read(&store, "nested/object.bin", 10_000, 1),
            Err(FetchError::RangeNotSatisfiable { .. })
        ));
        assert!(matches!(
            read(&store, "nested/missing.bin", 0, 1),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_file_store_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let path = store.object_path("bucket", "empty").unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();

        assert!(matches!(
            read(&store, "empty", 0, 1),
            Err(FetchError::RangeNotSatisfiable { len: 0, .. })
        ));
    }

    #[test]
    fn test_file_store_rejects_escaping_keys() {
        let store = FileStore::new("/srv/objects");

        for key in ["", "../etc/passwd", "a//b", "./a", "a/..", "/abs", "a\\b"] {
            assert!(
                matches!(store.object_path("bucket", key), Err(FetchError::InvalidKey(_))),
                "key {:?} accepted",
                key
            );
        }
        assert!(store.object_path("..", "key").is_err());
        assert!(store.object_path("", "key").is_err());

        let path = store.object_path("bucket", "a/b.bin").unwrap();
        assert_eq!(path, Path::new("/srv/objects/bucket/a/b.bin"));
    }
}
