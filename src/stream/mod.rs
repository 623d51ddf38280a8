//! Unbuffered byte-stream access with one byte of putback.

pub mod buf;
pub mod putback;

pub use buf::SerialStreamBuf;
pub use putback::PutbackSlot;

use crate::error::Result;

/// The device-facing primitives of a byte stream with no read-ahead.
///
/// `None` stands for end-of-stream wherever a single byte is exchanged.
/// Transfer failures on a live device are not errors here: they come back
/// as a zero count or `None`, and the caller decides whether to retry.
/// Errors are reserved for misuse, such as a closed device.
pub trait UnbufferedStream {
    /// One write of up to `buf.len()` bytes. Returns the count written,
    /// which may be short; a failed write counts as 0.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize>;

    /// Write a single byte. `None` is a no-op that returns `None`; a failed
    /// write also returns `None`.
    fn write_one(&mut self, byte: Option<u8>) -> Result<Option<u8>>;

    /// Fill `buf` with a pending putback byte (if any) followed by one
    /// read from the device. Nothing available reads as 0.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Peek at the next byte. Repeated calls return the same byte.
    fn read_one(&mut self) -> Result<Option<u8>>;

    /// Return the next byte and move past it.
    fn read_one_advance(&mut self) -> Result<Option<u8>>;

    /// Put one byte back. Fails (returns `None`) if a byte is already
    /// pending or `byte` is `None`.
    fn pushback(&mut self, byte: Option<u8>) -> Result<Option<u8>>;

    /// 1 if a byte can be read without blocking, otherwise 0.
    fn bytes_ready(&mut self) -> Result<usize>;
}
