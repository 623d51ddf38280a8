use std::fmt;
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;

use crate::error::{Result, SerialError};
use crate::port::types::{BaudRate, CharacterSize, FlowControl, Parity, StopBits};

/// XON, sent to resume transmission (^Q).
pub const XON: libc::cc_t = 0x11;
/// XOFF, sent to pause transmission (^S).
pub const XOFF: libc::cc_t = 0x13;

#[cfg(any(target_os = "linux", target_os = "android"))]
const VDISABLE: libc::cc_t = 0;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const VDISABLE: libc::cc_t = 0xff;

/// A copy of a device's termios structure.
///
/// The kernel holds the live settings; this is a value read from it,
/// edited in memory and written back with [`commit`](Self::commit). It is
/// never kept around between port operations, because other processes
/// (or the driver) may change the device in the meantime.
#[derive(Clone, Copy)]
pub struct DeviceSettings {
    raw: libc::termios,
}

impl DeviceSettings {
    /// All flags cleared, all control characters zero.
    pub fn zeroed() -> Self {
        Self {
            raw: unsafe { std::mem::zeroed() },
        }
    }

    /// Written right after open, before the defaults are applied: receiver
    /// on, modem lines ignored, reads return immediately.
    pub fn transitional_baseline() -> Self {
        let mut settings = Self::zeroed();
        settings.raw.c_cflag |= libc::CREAD | libc::CLOCAL;
        settings.raw.c_cc[libc::VMIN] = 0;
        settings.raw.c_cc[libc::VTIME] = 0;
        settings
    }

    pub(crate) fn read(fd: RawFd) -> io::Result<Self> {
        let mut raw = MaybeUninit::<libc::termios>::zeroed();
        if unsafe { libc::tcgetattr(fd, raw.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            raw: unsafe { raw.assume_init() },
        })
    }

    pub(crate) fn commit(&self, fd: RawFd) -> io::Result<()> {
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &self.raw) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Overwrite every mode flag with the raw 115200 8N1 baseline.
    ///
    /// This is the one place settings are replaced wholesale instead of
    /// edited field by field.
    pub fn reset_to_baseline(&mut self) -> Result<()> {
        self.raw.c_iflag = libc::IGNBRK;
        self.raw.c_oflag = 0;
        self.raw.c_cflag = libc::CS8 | libc::CLOCAL | libc::CREAD;
        self.raw.c_lflag = 0;
        // c_line only exists on Linux.
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            self.raw.c_line = 0;
        }
        self.raw.c_cc[libc::VMIN] = 0;
        self.raw.c_cc[libc::VTIME] = 0;
        self.set_baud_rate(BaudRate::DEFAULT)
    }

    pub fn baud_rate(&self) -> Result<BaudRate> {
        let input = unsafe { libc::cfgetispeed(&self.raw) };
        let output = unsafe { libc::cfgetospeed(&self.raw) };
        rate_from_speeds(input, output)
    }

    /// Set input and output speed together. If the second call fails the
    /// first may already have been applied to this copy.
    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<()> {
        let speed = rate.speed().ok_or(SerialError::InvalidBaudRate)?;
        if unsafe { libc::cfsetispeed(&mut self.raw, speed) } < 0
            || unsafe { libc::cfsetospeed(&mut self.raw, speed) } < 0
        {
            return Err(SerialError::InvalidBaudRate);
        }
        Ok(())
    }

    pub fn character_size(&self) -> CharacterSize {
        match self.raw.c_cflag & libc::CSIZE {
            libc::CS5 => CharacterSize::Five,
            libc::CS6 => CharacterSize::Six,
            libc::CS7 => CharacterSize::Seven,
            _ => CharacterSize::Eight,
        }
    }

    /// ISTRIP follows the size: anything narrower than 8 bits strips the
    /// high bit on input, otherwise those bits arrive undefined.
    pub fn set_character_size(&mut self, size: CharacterSize) {
        if size == CharacterSize::Eight {
            self.raw.c_iflag &= !libc::ISTRIP;
        } else {
            self.raw.c_iflag |= libc::ISTRIP;
        }
        let bits = match size {
            CharacterSize::Five => libc::CS5,
            CharacterSize::Six => libc::CS6,
            CharacterSize::Seven => libc::CS7,
            CharacterSize::Eight => libc::CS8,
        };
        self.raw.c_cflag &= !libc::CSIZE;
        self.raw.c_cflag |= bits;
    }

    /// Whether received bytes are masked to their low 7 bits.
    pub fn strips_high_bit(&self) -> bool {
        self.raw.c_iflag & libc::ISTRIP != 0
    }

    pub fn flow_control(&self) -> FlowControl {
        let ixon = self.raw.c_iflag & libc::IXON != 0;
        let ixoff = self.raw.c_iflag & libc::IXOFF != 0;
        let rtscts = self.raw.c_cflag & libc::CRTSCTS != 0;

        if ixon
            && ixoff
            && self.raw.c_cc[libc::VSTART] == XON
            && self.raw.c_cc[libc::VSTOP] == XOFF
        {
            return FlowControl::Software;
        }
        match (ixon || ixoff, rtscts) {
            (false, true) => FlowControl::Hardware,
            (false, false) => FlowControl::None,
            _ => FlowControl::Invalid,
        }
    }

    pub fn set_flow_control(&mut self, flow: FlowControl) -> Result<()> {
        match flow {
            FlowControl::Hardware => {
                self.raw.c_iflag &= !(libc::IXON | libc::IXOFF);
                self.raw.c_cflag |= libc::CRTSCTS;
                self.raw.c_cc[libc::VSTART] = VDISABLE;
                self.raw.c_cc[libc::VSTOP] = VDISABLE;
            }
            FlowControl::Software => {
                self.raw.c_iflag |= libc::IXON | libc::IXOFF;
                self.raw.c_cflag &= !libc::CRTSCTS;
                self.raw.c_cc[libc::VSTART] = XON;
                self.raw.c_cc[libc::VSTOP] = XOFF;
            }
            FlowControl::None => {
                self.raw.c_iflag &= !(libc::IXON | libc::IXOFF);
                self.raw.c_cflag &= !libc::CRTSCTS;
            }
            FlowControl::Invalid => return Err(invalid_flow_control()),
        }
        Ok(())
    }

    pub fn parity(&self) -> Parity {
        if self.raw.c_cflag & libc::PARENB == 0 {
            Parity::None
        } else if self.raw.c_cflag & libc::PARODD != 0 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        match parity {
            Parity::Even => {
                self.raw.c_cflag |= libc::PARENB;
                self.raw.c_cflag &= !libc::PARODD;
                self.raw.c_iflag |= libc::INPCK;
            }
            Parity::Odd => {
                self.raw.c_cflag |= libc::PARENB | libc::PARODD;
                self.raw.c_iflag |= libc::INPCK;
            }
            Parity::None => {
                self.raw.c_cflag &= !libc::PARENB;
                self.raw.c_iflag |= libc::IGNPAR;
            }
            Parity::Invalid => return Err(invalid_parity()),
        }
        Ok(())
    }

    pub fn stop_bits(&self) -> StopBits {
        if self.raw.c_cflag & libc::CSTOPB != 0 {
            StopBits::Two
        } else {
            StopBits::One
        }
    }

    pub fn set_stop_bits(&mut self, stop_bits: StopBits) {
        match stop_bits {
            StopBits::One => self.raw.c_cflag &= !libc::CSTOPB,
            StopBits::Two => self.raw.c_cflag |= libc::CSTOPB,
        }
    }

    pub fn vmin(&self) -> u8 {
        self.raw.c_cc[libc::VMIN]
    }

    pub fn set_vmin(&mut self, vmin: u8) {
        self.raw.c_cc[libc::VMIN] = vmin;
    }

    pub fn vtime(&self) -> u8 {
        self.raw.c_cc[libc::VTIME]
    }

    pub fn set_vtime(&mut self, vtime: u8) {
        self.raw.c_cc[libc::VTIME] = vtime;
    }
}

impl fmt::Debug for DeviceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSettings")
            .field("c_iflag", &format_args!("{:#x}", self.raw.c_iflag))
            .field("c_oflag", &format_args!("{:#x}", self.raw.c_oflag))
            .field("c_cflag", &format_args!("{:#x}", self.raw.c_cflag))
            .field("c_lflag", &format_args!("{:#x}", self.raw.c_lflag))
            .field("vmin", &self.vmin())
            .field("vtime", &self.vtime())
            .finish()
    }
}

pub(crate) fn invalid_flow_control() -> SerialError {
    SerialError::invalid("flow control must be none, software or hardware")
}

pub(crate) fn invalid_parity() -> SerialError {
    SerialError::invalid("parity must be none, odd or even")
}

/// Input and output speeds are always set together, so a mismatch means
/// something outside this crate changed one of them.
fn rate_from_speeds(input: libc::speed_t, output: libc::speed_t) -> Result<BaudRate> {
    if input != output {
        return Err(SerialError::InvalidBaudRate);
    }
    BaudRate::from_speed(input).ok_or(SerialError::InvalidBaudRate)
}
