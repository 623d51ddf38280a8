//! Serial device lifecycle and termios configuration.

pub mod manager;
pub mod settings;
pub(crate) mod sys;
pub mod types;

pub use manager::SerialPort;
pub use settings::{DeviceSettings, XOFF, XON};
pub use types::{
    BaudRate, CharacterSize, FlowControl, LineSettings, OpenMode, Parity, StopBits, VMIN_DEFAULT,
    VTIME_DEFAULT,
};
