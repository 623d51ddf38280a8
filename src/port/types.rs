use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::SerialError;

/// Default minimum byte count for a non-canonical read.
pub const VMIN_DEFAULT: u8 = 0;
/// Default inter-byte timeout (deciseconds) for a non-canonical read.
pub const VTIME_DEFAULT: u8 = 0;

/// Standard line speeds.
///
/// `Invalid` is never reported by a port (mismatched input and output
/// speeds come back as [`SerialError::InvalidBaudRate`]) and is refused
/// by the setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    Baud50,
    Baud75,
    Baud110,
    Baud134,
    Baud150,
    Baud200,
    Baud300,
    Baud600,
    Baud1200,
    Baud1800,
    Baud2400,
    Baud4800,
    Baud9600,
    Baud19200,
    Baud38400,
    Baud57600,
    Baud115200,
    Baud230400,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud460800,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud576000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud921600,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1152000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud2000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud2500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud3000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud3500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud4000000,
    Invalid,
}

const STANDARD_RATES: &[BaudRate] = &[
    BaudRate::Baud50,
    BaudRate::Baud75,
    BaudRate::Baud110,
    BaudRate::Baud134,
    BaudRate::Baud150,
    BaudRate::Baud200,
    BaudRate::Baud300,
    BaudRate::Baud600,
    BaudRate::Baud1200,
    BaudRate::Baud1800,
    BaudRate::Baud2400,
    BaudRate::Baud4800,
    BaudRate::Baud9600,
    BaudRate::Baud19200,
    BaudRate::Baud38400,
    BaudRate::Baud57600,
    BaudRate::Baud115200,
    BaudRate::Baud230400,
];

#[cfg(any(target_os = "linux", target_os = "android"))]
const EXTENDED_RATES: &[BaudRate] = &[
    BaudRate::Baud460800,
    BaudRate::Baud500000,
    BaudRate::Baud576000,
    BaudRate::Baud921600,
    BaudRate::Baud1000000,
    BaudRate::Baud1152000,
    BaudRate::Baud1500000,
    BaudRate::Baud2000000,
    BaudRate::Baud2500000,
    BaudRate::Baud3000000,
    BaudRate::Baud3500000,
    BaudRate::Baud4000000,
];

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const EXTENDED_RATES: &[BaudRate] = &[];

impl BaudRate {
    pub const DEFAULT: BaudRate = BaudRate::Baud115200;

    /// Every rate this platform supports, slowest first.
    pub fn all() -> impl Iterator<Item = BaudRate> {
        STANDARD_RATES.iter().chain(EXTENDED_RATES).copied()
    }

    /// Line speed in bits per second, or 0 for `Invalid`.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::Baud50 => 50,
            BaudRate::Baud75 => 75,
            BaudRate::Baud110 => 110,
            BaudRate::Baud134 => 134,
            BaudRate::Baud150 => 150,
            BaudRate::Baud200 => 200,
            BaudRate::Baud300 => 300,
            BaudRate::Baud600 => 600,
            BaudRate::Baud1200 => 1200,
            BaudRate::Baud1800 => 1800,
            BaudRate::Baud2400 => 2400,
            BaudRate::Baud4800 => 4800,
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud19200 => 19200,
            BaudRate::Baud38400 => 38400,
            BaudRate::Baud57600 => 57600,
            BaudRate::Baud115200 => 115200,
            BaudRate::Baud230400 => 230400,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud460800 => 460800,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud500000 => 500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud576000 => 576000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud921600 => 921600,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1000000 => 1000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1152000 => 1152000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1500000 => 1500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2000000 => 2000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2500000 => 2500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3000000 => 3000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3500000 => 3500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud4000000 => 4000000,
            BaudRate::Invalid => 0,
        }
    }

    /// The termios speed code for this rate.
    pub(crate) fn speed(self) -> Option<libc::speed_t> {
        let speed = match self {
            BaudRate::Baud50 => libc::B50,
            BaudRate::Baud75 => libc::B75,
            BaudRate::Baud110 => libc::B110,
            BaudRate::Baud134 => libc::B134,
            BaudRate::Baud150 => libc::B150,
            BaudRate::Baud200 => libc::B200,
            BaudRate::Baud300 => libc::B300,
            BaudRate::Baud600 => libc::B600,
            BaudRate::Baud1200 => libc::B1200,
            BaudRate::Baud1800 => libc::B1800,
            BaudRate::Baud2400 => libc::B2400,
            BaudRate::Baud4800 => libc::B4800,
            BaudRate::Baud9600 => libc::B9600,
            BaudRate::Baud19200 => libc::B19200,
            BaudRate::Baud38400 => libc::B38400,
            BaudRate::Baud57600 => libc::B57600,
            BaudRate::Baud115200 => libc::B115200,
            BaudRate::Baud230400 => libc::B230400,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud460800 => libc::B460800,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud500000 => libc::B500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud576000 => libc::B576000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud921600 => libc::B921600,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1000000 => libc::B1000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1152000 => libc::B1152000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1500000 => libc::B1500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2000000 => libc::B2000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2500000 => libc::B2500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3000000 => libc::B3000000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3500000 => libc::B3500000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud4000000 => libc::B4000000,
            BaudRate::Invalid => return None,
        };
        Some(speed)
    }

    pub(crate) fn from_speed(speed: libc::speed_t) -> Option<BaudRate> {
        Self::all().find(|rate| rate.speed() == Some(speed))
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::DEFAULT
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = SerialError;

    fn try_from(bits_per_second: u32) -> Result<Self, Self::Error> {
        Self::all()
            .find(|rate| rate.bits_per_second() == bits_per_second)
            .ok_or_else(|| {
                SerialError::invalid(format!("unsupported baud rate {}", bits_per_second))
            })
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> u32 {
        rate.bits_per_second()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaudRate::Invalid => write!(f, "invalid"),
            rate => write!(f, "{}", rate.bits_per_second()),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CharacterSize {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl CharacterSize {
    pub const DEFAULT: CharacterSize = CharacterSize::Eight;

    pub fn bits(self) -> u8 {
        match self {
            CharacterSize::Five => 5,
            CharacterSize::Six => 6,
            CharacterSize::Seven => 7,
            CharacterSize::Eight => 8,
        }
    }
}

impl TryFrom<u8> for CharacterSize {
    type Error = SerialError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(CharacterSize::Five),
            6 => Ok(CharacterSize::Six),
            7 => Ok(CharacterSize::Seven),
            8 => Ok(CharacterSize::Eight),
            other => Err(SerialError::invalid(format!(
                "character size must be 5, 6, 7 or 8 (got {})",
                other
            ))),
        }
    }
}

impl From<CharacterSize> for u8 {
    fn from(size: CharacterSize) -> u8 {
        size.bits()
    }
}

impl fmt::Display for CharacterSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    /// Kept so every parity value has a representation; refused by setters.
    #[serde(skip)]
    Invalid,
}

impl Parity {
    pub const DEFAULT: Parity = Parity::None;
}

impl FromStr for Parity {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            other => Err(SerialError::invalid(format!("unknown parity '{}'", other))),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
            Parity::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    pub const DEFAULT: StopBits = StopBits::One;

    pub fn count(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = SerialError;

    fn try_from(count: u8) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(SerialError::invalid(format!(
                "stop bits must be 1 or 2 (got {})",
                other
            ))),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(stop_bits: StopBits) -> u8 {
        stop_bits.count()
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    /// XON/XOFF in-band control characters.
    Software,
    /// RTS/CTS signal lines.
    Hardware,
    /// The device is in a flow-control state this crate does not interpret.
    #[serde(skip)]
    Invalid,
}

impl FlowControl {
    pub const DEFAULT: FlowControl = FlowControl::None;
}

impl FromStr for FlowControl {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FlowControl::None),
            "software" | "xonxoff" => Ok(FlowControl::Software),
            "hardware" | "rtscts" => Ok(FlowControl::Hardware),
            other => Err(SerialError::invalid(format!(
                "unknown flow control '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowControl::None => "none",
            FlowControl::Software => "software",
            FlowControl::Hardware => "hardware",
            FlowControl::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Requested access direction for [`SerialPort::open`](crate::SerialPort::open).
///
/// Combine with `|`, e.g. `OpenMode::READ | OpenMode::WRITE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    read: bool,
    write: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode {
        read: true,
        write: false,
    };
    pub const WRITE: OpenMode = OpenMode {
        read: false,
        write: true,
    };
    pub const READ_WRITE: OpenMode = OpenMode {
        read: true,
        write: true,
    };

    pub fn is_read(self) -> bool {
        self.read
    }

    pub fn is_write(self) -> bool {
        self.write
    }

    /// A mode with neither direction cannot be opened.
    pub fn is_empty(self) -> bool {
        !self.read && !self.write
    }
}

impl BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode {
            read: self.read || rhs.read,
            write: self.write || rhs.write,
        }
    }
}

/// The parameter bundle applied by
/// [`SerialStreamBuf::open_with`](crate::SerialStreamBuf::open_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    #[serde(default)]
    pub baud_rate: BaudRate,
    #[serde(default)]
    pub character_size: CharacterSize,
    #[serde(default)]
    pub flow_control: FlowControl,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    #[serde(default)]
    pub vmin: u8,
    #[serde(default)]
    pub vtime: u8,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::DEFAULT,
            character_size: CharacterSize::DEFAULT,
            flow_control: FlowControl::DEFAULT,
            parity: Parity::DEFAULT,
            stop_bits: StopBits::DEFAULT,
            vmin: VMIN_DEFAULT,
            vtime: VTIME_DEFAULT,
        }
    }
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Invalid => '?',
        };
        write!(
            f,
            "{} {}{}{} flow={}",
            self.baud_rate, self.character_size, parity, self.stop_bits, self.flow_control
        )
    }
}
