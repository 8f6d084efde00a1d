//! Tracing subscriber untuk binary.
//!
//! Library hanya emit event lewat `tracing`; subscriber dipasang oleh
//! binary (atau test) yang ingin melihat output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pasang subscriber global dengan filter dari `RUST_LOG`.
///
/// Tanpa `RUST_LOG`, default-nya `circular=info`, atau `circular=debug`
/// jika `verbose`. Panggilan kedua diabaikan.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "circular=debug"
    } else {
        "circular=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
