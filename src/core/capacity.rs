//! Capacity queue: `0` adalah sentinel untuk unbounded
//!
//! Nilai dari luar (CLI, config file) biasanya signed atau string,
//! jadi validasi dilakukan di sini - nilai negatif ditolak, tidak di-clamp.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use super::error::CapacityError;

/// Kapasitas maksimum logical length dari queue
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// Tidak ada batas - push tidak pernah block
    #[default]
    Unbounded,
    /// Hard cap - push block saat length == n
    Bounded(NonZeroUsize),
}

impl Capacity {
    /// Batas atas capacity bounded yang diterima dari input luar
    ///
    /// Semua slot dialokasikan saat konstruksi, jadi nilai di atas ini
    /// ditolak dengan [`CapacityError::TooLarge`], bukan dicoba alokasi.
    pub const MAX_BOUNDED: usize = 1 << 24;

    /// `0` berarti unbounded
    #[inline]
    pub const fn new(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(n) => Capacity::Bounded(n),
            None => Capacity::Unbounded,
        }
    }

    /// Batas atas, `None` untuk unbounded
    #[inline]
    pub const fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(n.get()),
        }
    }

    #[inline]
    pub const fn is_unbounded(&self) -> bool {
        matches!(self, Capacity::Unbounded)
    }

    /// Nilai mentah, dengan `0` untuk unbounded
    #[inline]
    pub const fn get(&self) -> usize {
        match self {
            Capacity::Unbounded => 0,
            Capacity::Bounded(n) => n.get(),
        }
    }
}

impl From<usize> for Capacity {
    fn from(n: usize) -> Self {
        Capacity::new(n)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = CapacityError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        if n < 0 {
            return Err(CapacityError::Negative(n));
        }
        Capacity::try_from(n as u64)
    }
}

impl TryFrom<u64> for Capacity {
    type Error = CapacityError;

    fn try_from(n: u64) -> Result<Self, Self::Error> {
        match usize::try_from(n) {
            Ok(limit) if limit <= Capacity::MAX_BOUNDED => Ok(Capacity::new(limit)),
            _ => Err(CapacityError::TooLarge(n)),
        }
    }
}

impl FromStr for Capacity {
    type Err = CapacityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Capacity::try_from(n),
            // Angka positif di luar i64 tetap dilaporkan sebagai TooLarge
            Err(_) => match trimmed.parse::<u64>() {
                Ok(n) => Capacity::try_from(n),
                Err(_) => Err(CapacityError::Parse(s.to_string())),
            },
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unbounded => f.write_str("unbounded"),
            Capacity::Bounded(n) => write!(f, "{}", n),
        }
    }
}
