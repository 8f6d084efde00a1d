//! Byte range dengan format HTTP `Range: bytes=first-last`

use std::fmt;
use std::ops::Range;

use super::error::FetchError;

/// Range `[offset, offset + size)`, selalu non-empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    offset: u64,
    size: u64,
}

impl ByteRange {
    /// Validasi offset dan size. Size 0 ditolak.
    pub fn new(offset: u64, size: u64) -> Result<Self, FetchError> {
        if size == 0 || offset.checked_add(size).is_none() {
            return Err(FetchError::InvalidRange { offset, size });
        }
        Ok(Self { offset, size })
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Byte terakhir (inclusive), seperti di header `Range`
    #[inline]
    pub fn last(&self) -> u64 {
        self.offset + self.size - 1
    }

    /// Potong range ke panjang object
    ///
    /// Range yang melewati akhir object dipotong; range yang dimulai
    /// di atau setelah akhir object gagal dengan `RangeNotSatisfiable`.
    /// Hasil yang tidak muat di `usize` (target 32-bit) gagal dengan
    /// `InvalidRange`.
    pub fn clamp(&self, len: u64) -> Result<Range<usize>, FetchError> {
        if self.offset >= len {
            return Err(FetchError::RangeNotSatisfiable { range: *self, len });
        }
        let end = (self.offset + self.size).min(len);
        let invalid = || FetchError::InvalidRange {
            offset: self.offset,
            size: self.size,
        };
        let start = usize::try_from(self.offset).map_err(|_| invalid())?;
        let end = usize::try_from(end).map_err(|_| invalid())?;
        Ok(start..end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.offset, self.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_last() {
        let range = ByteRange::new(100, 50).unwrap();
        assert_eq!(range.last(), 149);
        assert_eq!(range.to_string(), "bytes=100-149");

        let single = ByteRange::new(0, 1).unwrap();
        assert_eq!(single.to_string(), "bytes=0-0");
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(
            ByteRange::new(10, 0),
            Err(FetchError::InvalidRange { offset: 10, size: 0 })
        ));
        assert!(ByteRange::new(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_clamp() {
        let range = ByteRange::new(4, 8).unwrap();
        assert_eq!(range.clamp(100).unwrap(), 4..12);
        // Melewati akhir object - dipotong
        assert_eq!(range.clamp(6).unwrap(), 4..6);
        // Dimulai di akhir object
        assert!(matches!(
            range.clamp(4),
            Err(FetchError::RangeNotSatisfiable { len: 4, .. })
        ));
        assert!(range.clamp(0).is_err());
    }

    #[test]
    fn test_clamp_near_u64_max() {
        let range = ByteRange::new(u64::MAX - 10, 5).unwrap();
        let clamped = range.clamp(u64::MAX);

        if usize::BITS >= 64 {
            let start = (u64::MAX - 10) as usize;
            assert_eq!(clamped.unwrap(), start..start + 5);
        } else {
            // Offset tidak muat di usize - ditolak, bukan dipotong diam-diam
            assert!(matches!(
                clamped,
                Err(FetchError::InvalidRange { size: 5, .. })
            ));
        }
    }
}
