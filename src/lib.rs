//! Raw serial-port access for POSIX terminal devices.
//!
//! [`SerialPort`] owns the descriptor and its line discipline; every
//! parameter read or write goes straight to the kernel settings.
//! [`SerialStreamBuf`] layers the unbuffered byte primitives of
//! [`UnbufferedStream`] on top, with a one-byte putback slot.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod stream;

pub use error::{Result, SerialError};
pub use port::{
    BaudRate, CharacterSize, DeviceSettings, FlowControl, LineSettings, OpenMode, Parity,
    SerialPort, StopBits,
};
pub use stream::{SerialStreamBuf, UnbufferedStream};
