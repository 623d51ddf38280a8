use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the serial port and the stream adapter.
///
/// Configuration and lifecycle failures always come back as one of these.
/// Byte transfers do not: a failed or empty read/write on a live port is
/// reported as a zero count or an end-of-stream `None`.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("Serial port is not open")]
    NotOpen,

    #[error("Serial port is already open")]
    AlreadyOpen,

    #[error("Failed to open serial port '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serial port {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid baud rate")]
    InvalidBaudRate,

    /// Blocking mode could not be restored after an availability probe.
    /// The adapter no longer knows which mode the handle is in.
    #[error("Serial stream faulted: blocking mode could not be restored")]
    Faulted,
}

pub type Result<T> = std::result::Result<T, SerialError>;

impl SerialError {
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        SerialError::Io { op, source }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SerialError::InvalidArgument(message.into())
    }
}

impl From<SerialError> for io::Error {
    fn from(err: SerialError) -> io::Error {
        match err {
            SerialError::Io { source, .. } | SerialError::OpenFailed { source, .. } => source,
            SerialError::NotOpen => io::Error::new(io::ErrorKind::NotConnected, err),
            SerialError::InvalidArgument(_) | SerialError::InvalidBaudRate => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            SerialError::AlreadyOpen | SerialError::Faulted => io::Error::other(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_open_maps_to_not_connected() {
        let err: io::Error = SerialError::NotOpen.into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn io_error_keeps_os_source() {
        let source = io::Error::from_raw_os_error(libc::EBADF);
        let err: io::Error = SerialError::io("flush", source).into();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn open_failed_message_names_path() {
        let err = SerialError::OpenFailed {
            path: PathBuf::from("/dev/ttyNOPE"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/dev/ttyNOPE"));
    }
}
