use std::io;
use std::os::unix::io::RawFd;
use std::path::Path;

use crate::error::{Result, SerialError};
use crate::port::sys;
use crate::port::{LineSettings, OpenMode, SerialPort};
use crate::stream::putback::PutbackSlot;
use crate::stream::UnbufferedStream;

/// Unbuffered stream over a [`SerialPort`].
///
/// Every read and write is a single system call on the port's handle; the
/// only state kept between calls is one byte of putback, which is what
/// lets [`read_one`](UnbufferedStream::read_one) peek without consuming.
#[derive(Default)]
pub struct SerialStreamBuf {
    port: SerialPort,
    putback: PutbackSlot,
    faulted: bool,
    /// Port generation the putback and fault state belong to.
    generation: u64,
}

impl SerialStreamBuf {
    /// A closed stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` read-write and apply `line` in the usual order (see
    /// [`SerialPort::configure`]). Any failure closes the port again.
    pub fn open_with(path: impl AsRef<Path>, line: &LineSettings) -> Result<Self> {
        let mut stream = Self::new();
        stream.open(path, OpenMode::READ_WRITE)?;
        stream.port.configure(line)?;
        Ok(stream)
    }

    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        self.port.open(path, mode)?;
        self.reset_for_open();
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.port.close()?;
        self.putback.clear();
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    /// Set once an availability probe could not restore blocking mode.
    /// Cleared by reopening.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn port(&self) -> &SerialPort {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut SerialPort {
        &mut self.port
    }

    fn reset_for_open(&mut self) {
        self.putback.clear();
        self.faulted = false;
        self.generation = self.port.generation();
    }

    /// The live descriptor. A port reopened through [`port_mut`](Self::port_mut)
    /// starts with an empty putback slot and no fault, like [`open`](Self::open).
    fn device_fd(&mut self) -> Result<RawFd> {
        let fd = self.port.fd()?;
        if self.port.generation() != self.generation {
            self.reset_for_open();
        }
        if self.faulted {
            return Err(SerialError::Faulted);
        }
        Ok(fd)
    }
}

impl UnbufferedStream for SerialStreamBuf {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        let fd = self.device_fd()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let written = sys::write(fd, buf).unwrap_or(0);
        tracing::trace!(requested = buf.len(), written, "Serial write");
        Ok(written)
    }

    fn write_one(&mut self, byte: Option<u8>) -> Result<Option<u8>> {
        let fd = self.device_fd()?;
        let Some(byte) = byte else {
            return Ok(None);
        };
        match sys::write(fd, &[byte]) {
            Ok(1) => Ok(Some(byte)),
            _ => Ok(None),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let fd = self.device_fd()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let count = match self.putback.take() {
            Some(byte) => {
                buf[0] = byte;
                if buf.len() > 1 {
                    1 + sys::read(fd, &mut buf[1..]).unwrap_or(0)
                } else {
                    1
                }
            }
            None => sys::read(fd, buf).unwrap_or(0),
        };
        tracing::trace!(requested = buf.len(), count, "Serial read");
        Ok(count)
    }

    fn read_one(&mut self) -> Result<Option<u8>> {
        let fd = self.device_fd()?;
        if let Some(byte) = self.putback.peek() {
            return Ok(Some(byte));
        }
        let mut byte = [0u8; 1];
        match sys::read(fd, &mut byte) {
            Ok(1) => {
                // Keep it pending so the next peek sees the same byte.
                self.putback.store(byte[0]);
                Ok(Some(byte[0]))
            }
            _ => Ok(None),
        }
    }

    fn read_one_advance(&mut self) -> Result<Option<u8>> {
        let next = self.read_one()?;
        self.putback.clear();
        Ok(next)
    }

    fn pushback(&mut self, byte: Option<u8>) -> Result<Option<u8>> {
        self.device_fd()?;
        // A serial line cannot be rewound past what was read from it.
        let Some(byte) = byte else {
            return Ok(None);
        };
        if !self.putback.push(byte) {
            return Ok(None);
        }
        Ok(Some(byte))
    }

    fn bytes_ready(&mut self) -> Result<usize> {
        let fd = self.device_fd()?;
        if self.putback.is_pending() {
            return Ok(1);
        }

        let flags =
            sys::status_flags(fd).map_err(|source| SerialError::io("get status flags", source))?;
        sys::set_status_flags(fd, flags | libc::O_NONBLOCK)
            .map_err(|source| SerialError::io("set non-blocking", source))?;

        let mut byte = [0u8; 1];
        let ready = match sys::read(fd, &mut byte) {
            Ok(1) => {
                self.putback.store(byte[0]);
                1
            }
            _ => 0,
        };

        if let Err(err) = sys::set_status_flags(fd, flags) {
            self.faulted = true;
            tracing::error!("Failed to restore blocking mode after probe: {}", err);
            return Err(SerialError::Faulted);
        }
        tracing::trace!(ready, "Serial availability probe");
        Ok(ready)
    }
}

/// `read` returns `Ok(0)` when nothing is available, which `std::io`
/// callers treat as end of file. Use VMIN/VTIME to make reads wait.
impl io::Read for SerialStreamBuf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

/// Writes go straight to the device; `flush` has nothing to do.
impl io::Write for SerialStreamBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
