//! Logging shorthands shared by every crate.
//!
//! They are thin wrappers over `tracing` so narration always goes to the
//! subscriber (stderr) and never to the data channel.

/// Logs a success line. The CLI formatter renders it with a `[✓]` prefix.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sweepr::success", $($arg)*)
    };
}

/// Logs a progress/status line (`>` prefix in the CLI).
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sweepr::status", $($arg)*)
    };
}
