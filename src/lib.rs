//! Circular - Blocking Bounded Queue
//!
//! Arsitektur:
//! - core: Circular queue dengan blocking backpressure dan explicit close
//! - pool: Reuse pool untuk instance yang di-recycle
//! - chunk: Ranged read dari object storage dengan wait handle
//! - trace: Setup subscriber (feature `subscriber`, aktif secara default)

pub mod chunk;
pub mod core;
pub mod pool;
#[cfg(feature = "subscriber")]
pub mod trace;
