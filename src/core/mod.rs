//! Core module: Blocking Circular Queue
//!
//! Prinsip desain:
//! - Backpressure: Queue penuh = producer block, bukan error
//! - Reference handoff: Queue hanya memindahkan handle, tidak copy payload
//! - Explicit shutdown: Close membangunkan semua waiter

mod capacity;
mod circular;
mod error;

pub use capacity::Capacity;
pub use circular::Circular;
pub use error::{CapacityError, Closed, PushError};
