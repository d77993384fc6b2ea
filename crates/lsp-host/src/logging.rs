//! Logging setup: wires a global `tracing` subscriber once at startup from
//! the CLI flags (`-s/--stderr`, `--logfile`).

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the non-blocking file appender's worker thread alive for as long
/// as logging needs to happen; dropping it flushes and joins that thread.
pub enum LoggingGuard {
    None,
    File(WorkerGuard),
}

/// Initializes the global subscriber based on the CLI flags:
/// - `-s/--stderr`: stderr at `TRACE`.
/// - `--logfile <path>`: a non-rolling file appender at `TRACE`.
/// - neither, but replaying a journal: stderr at `DEBUG`, so match/timeout/
///   ignore lines are still visible during response matching.
/// - neither, live session: no subscriber installed (library-clean by
///   default; a downstream embedder installs its own).
pub fn init(stderr: bool, logfile: Option<&Path>, replaying: bool) -> LoggingGuard {
    if stderr {
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::TRACE)
            .try_init();
        return LoggingGuard::None;
    }

    if let Some(path) = logfile {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("vhdlstuff.log"));
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_max_level(Level::TRACE)
            .try_init();
        return LoggingGuard::File(guard);
    }

    if replaying {
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::DEBUG)
            .try_init();
    }

    LoggingGuard::None
}
