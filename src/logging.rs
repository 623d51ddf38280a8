use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming a log file. When unset, logs go to stderr.
pub const LOG_FILE_ENV: &str = "SERIAL_STREAM_LOG";

/// Filter directive for a `-v` count, used when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Set up the global subscriber.
///
/// `RUST_LOG` overrides `-v`. With `SERIAL_STREAM_LOG` set, each run writes
/// its own file (see [`run_log_path`]), so two invocations talking to
/// different devices keep separate logs. If that file cannot be created,
/// logging stays on stderr.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let log_file = std::env::var_os(LOG_FILE_ENV).and_then(|base| {
        let path = run_log_path(Path::new(&base), SystemTime::now(), std::process::id());
        match File::create(&path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!(
                    "serial-stream: logging to stderr, cannot create {}: {}",
                    path.display(),
                    err
                );
                None
            }
        }
    });

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(fmt::time::UtcTime::rfc_3339()),
            )
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .init(),
    }
}

/// `{base}.{unix seconds}.{pid}`
pub fn run_log_path(base: &Path, started: SystemTime, pid: u32) -> PathBuf {
    let secs = started
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}.{}", secs, pid));
    PathBuf::from(name)
}
