//! Console logging setup for applications embedding the driver.
//!
//! The crate itself only speaks through the `log` facade; this module is
//! the convenience bootstrap an application calls once at startup.

use ::{
    anyhow::Result,
    flexi_logger::{DeferredNow, Logger, LoggerHandle, Record},
};

/// Setup console logging for this application.
///
/// The log level is controlled through `RUST_LOG` and defaults to `info`.
/// Keep the returned handle alive for the lifetime of the application.
pub fn setup() -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str("info")?
        .format(compact_format)
        .start()?;
    log::info!("Adjust the log level by setting RUST_LOG. By default RUST_LOG=info");
    Ok(handle)
}

/// A single-line format carrying level, module path, and message.
pub fn compact_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{:<5} [{}] {}",
        record.level(),
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    )
}
