use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use crate::error::{Result, SerialError};
use crate::port::settings::{invalid_flow_control, DeviceSettings};
use crate::port::sys::{self, Queue};
use crate::port::types::{
    BaudRate, CharacterSize, FlowControl, LineSettings, OpenMode, Parity, StopBits, VMIN_DEFAULT,
    VTIME_DEFAULT,
};

/// An open device and the settings it had before we touched it.
struct OpenDevice {
    fd: OwnedFd,
    path: PathBuf,
    original: DeviceSettings,
}

/// Lifecycle and line configuration for one serial device.
///
/// A port starts closed. [`open`](Self::open) takes the device, snapshots
/// its settings and configures it raw 115200 8N1 in blocking mode;
/// [`close`](Self::close) puts the snapshot back. Every other operation
/// needs an open port and fails with [`SerialError::NotOpen`] otherwise.
///
/// Getters read the settings from the kernel each time and setters do a
/// read-modify-write, so changes made by other processes are never
/// overwritten by a stale copy.
#[derive(Default)]
pub struct SerialPort {
    device: Option<OpenDevice>,
    /// Bumped on every successful open.
    generation: u64,
}

impl SerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Identifies the current open. Layers that cache per-open state compare
    /// it to notice a close and reopen they did not drive themselves.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Path the port was opened with.
    pub fn path(&self) -> Option<&Path> {
        self.device.as_ref().map(|device| device.path.as_path())
    }

    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        if self.is_open() {
            return Err(SerialError::AlreadyOpen);
        }
        if mode.is_empty() {
            return Err(SerialError::invalid(
                "open mode must include read, write or both",
            ));
        }

        let path = path.as_ref();
        let open_failed = |source| SerialError::OpenFailed {
            path: path.to_path_buf(),
            source,
        };

        // O_NONBLOCK keeps open(2) from waiting on carrier detect; the
        // handle is switched to blocking once initialised.
        let file = OpenOptions::new()
            .read(mode.is_read())
            .write(mode.is_write())
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(open_failed)?;
        let fd = OwnedFd::from(file);
        let raw = fd.as_raw_fd();

        let original = DeviceSettings::read(raw).map_err(open_failed)?;
        DeviceSettings::transitional_baseline()
            .commit(raw)
            .map_err(open_failed)?;

        self.device = Some(OpenDevice {
            fd,
            path: path.to_path_buf(),
            original,
        });

        let initialized = self
            .flush_io_buffers()
            .and_then(|()| self.initialize());
        if let Err(err) = initialized {
            self.abandon();
            return Err(err);
        }
        self.generation = self.generation.wrapping_add(1);

        tracing::debug!(path = %path.display(), ?mode, "Serial port opened");
        Ok(())
    }

    /// Restore the pre-open settings and release the device.
    pub fn close(&mut self) -> Result<()> {
        let device = self.device.take().ok_or(SerialError::NotOpen)?;

        if let Err(source) = device.original.commit(device.fd.as_raw_fd()) {
            self.device = Some(device);
            return Err(SerialError::io("restore settings", source));
        }

        // A failed close(2) must not be retried, so the handle is gone
        // either way.
        let path = device.path;
        sys::close(device.fd.into_raw_fd()).map_err(|source| SerialError::io("close", source))?;

        tracing::debug!(path = %path.display(), "Serial port closed");
        Ok(())
    }

    /// Best-effort rollback of a half-finished open.
    fn abandon(&mut self) {
        if let Some(device) = self.device.take() {
            if let Err(err) = device.original.commit(device.fd.as_raw_fd()) {
                tracing::warn!(
                    path = %device.path.display(),
                    "Failed to restore settings after aborted open: {}",
                    err
                );
            }
        }
    }

    /// Apply the default parameter set, discard anything queued and switch
    /// the handle to blocking mode.
    pub fn initialize(&mut self) -> Result<()> {
        self.set_parameters_to_default()?;
        self.flush_io_buffers()?;
        let fd = self.fd()?;
        sys::set_blocking(fd, true).map_err(|source| SerialError::io("set blocking", source))
    }

    pub fn file_descriptor(&self) -> Result<RawFd> {
        self.fd()
    }

    pub(crate) fn fd(&self) -> Result<RawFd> {
        self.device
            .as_ref()
            .map(|device| device.fd.as_raw_fd())
            .ok_or(SerialError::NotOpen)
    }

    pub fn flush_input_buffer(&self) -> Result<()> {
        self.flush(Queue::Input)
    }

    pub fn flush_output_buffer(&self) -> Result<()> {
        self.flush(Queue::Output)
    }

    pub fn flush_io_buffers(&self) -> Result<()> {
        self.flush(Queue::Both)
    }

    fn flush(&self, queue: Queue) -> Result<()> {
        let fd = self.fd()?;
        sys::flush(fd, queue).map_err(|source| SerialError::io("flush", source))
    }

    /// Whether the kernel reports unread input. A failed query reads as
    /// `false`.
    pub fn is_data_available(&self) -> Result<bool> {
        let fd = self.fd()?;
        Ok(matches!(sys::bytes_available(fd), Ok(count) if count > 0))
    }

    pub fn is_blocking(&self) -> Result<bool> {
        let fd = self.fd()?;
        sys::is_blocking(fd).map_err(|source| SerialError::io("get status flags", source))
    }

    /// Snapshot of the current kernel settings.
    pub fn settings(&self) -> Result<DeviceSettings> {
        let fd = self.fd()?;
        DeviceSettings::read(fd).map_err(|source| SerialError::io("read settings", source))
    }

    /// Read the settings, let `edit` change them, write them back. Nothing
    /// is written if `edit` fails.
    fn modify<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut DeviceSettings) -> Result<()>,
    {
        let fd = self.fd()?;
        let mut settings = self.settings()?;
        edit(&mut settings)?;
        settings
            .commit(fd)
            .map_err(|source| SerialError::io("apply settings", source))
    }

    /// Replace the mode flags with the raw 115200 8N1 baseline, then run
    /// every parameter through its setter at its default value.
    pub fn set_parameters_to_default(&mut self) -> Result<()> {
        self.modify(|settings| settings.reset_to_baseline())?;

        self.set_baud_rate(BaudRate::DEFAULT)?;
        self.set_character_size(CharacterSize::DEFAULT)?;
        self.set_flow_control(FlowControl::DEFAULT)?;
        self.set_parity(Parity::DEFAULT)?;
        self.set_stop_bits(StopBits::DEFAULT)?;
        self.set_vmin(i16::from(VMIN_DEFAULT))?;
        self.set_vtime(i16::from(VTIME_DEFAULT))
    }

    /// Apply a parameter bundle: baud rate, character size, flow control,
    /// parity, stop bits, then VMIN and VTIME. Stops at the first failure.
    pub fn configure(&mut self, line: &LineSettings) -> Result<()> {
        self.set_baud_rate(line.baud_rate)?;
        self.set_character_size(line.character_size)?;
        self.set_flow_control(line.flow_control)?;
        self.set_parity(line.parity)?;
        self.set_stop_bits(line.stop_bits)?;
        self.set_vmin(i16::from(line.vmin))?;
        self.set_vtime(i16::from(line.vtime))
    }

    /// Every line parameter, decoded from one settings read.
    pub fn line_settings(&self) -> Result<LineSettings> {
        let settings = self.settings()?;
        Ok(LineSettings {
            baud_rate: settings.baud_rate()?,
            character_size: settings.character_size(),
            flow_control: settings.flow_control(),
            parity: settings.parity(),
            stop_bits: settings.stop_bits(),
            vmin: settings.vmin(),
            vtime: settings.vtime(),
        })
    }

    pub fn baud_rate(&self) -> Result<BaudRate> {
        self.settings()?.baud_rate()
    }

    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<()> {
        self.modify(|settings| settings.set_baud_rate(rate))?;
        tracing::debug!(%rate, "Baud rate set");
        Ok(())
    }

    pub fn character_size(&self) -> Result<CharacterSize> {
        Ok(self.settings()?.character_size())
    }

    pub fn set_character_size(&mut self, size: CharacterSize) -> Result<()> {
        self.modify(|settings| {
            settings.set_character_size(size);
            Ok(())
        })?;
        tracing::debug!(%size, "Character size set");
        Ok(())
    }

    pub fn flow_control(&self) -> Result<FlowControl> {
        Ok(self.settings()?.flow_control())
    }

    /// Both queues are flushed first: drivers disagree on what happens to
    /// queued data when flow control changes under it.
    pub fn set_flow_control(&mut self, flow: FlowControl) -> Result<()> {
        if flow == FlowControl::Invalid {
            return Err(invalid_flow_control());
        }
        self.flush_io_buffers()?;
        self.modify(|settings| settings.set_flow_control(flow))?;
        tracing::debug!(%flow, "Flow control set");
        Ok(())
    }

    pub fn parity(&self) -> Result<Parity> {
        Ok(self.settings()?.parity())
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        self.modify(|settings| settings.set_parity(parity))?;
        tracing::debug!(%parity, "Parity set");
        Ok(())
    }

    pub fn stop_bits(&self) -> Result<StopBits> {
        Ok(self.settings()?.stop_bits())
    }

    pub fn set_stop_bits(&mut self, stop_bits: StopBits) -> Result<()> {
        self.modify(|settings| {
            settings.set_stop_bits(stop_bits);
            Ok(())
        })?;
        tracing::debug!(%stop_bits, "Stop bits set");
        Ok(())
    }

    pub fn vmin(&self) -> Result<u8> {
        Ok(self.settings()?.vmin())
    }

    /// Minimum byte count for a non-canonical read, 0..=255.
    pub fn set_vmin(&mut self, vmin: i16) -> Result<()> {
        self.fd()?;
        let vmin = control_char_value("VMIN", vmin)?;
        self.modify(|settings| {
            settings.set_vmin(vmin);
            Ok(())
        })?;
        tracing::debug!(vmin, "VMIN set");
        Ok(())
    }

    pub fn vtime(&self) -> Result<u8> {
        Ok(self.settings()?.vtime())
    }

    /// Inter-byte read timeout in deciseconds, 0..=255.
    pub fn set_vtime(&mut self, vtime: i16) -> Result<()> {
        self.fd()?;
        let vtime = control_char_value("VTIME", vtime)?;
        self.modify(|settings| {
            settings.set_vtime(vtime);
            Ok(())
        })?;
        tracing::debug!(vtime, "VTIME set");
        Ok(())
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.close() {
            tracing::warn!("Failed to close serial port on drop: {}", err);
        }
    }
}

fn control_char_value(name: &str, value: i16) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| SerialError::invalid(format!("{} must be in 0..=255 (got {})", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_char_value_bounds() {
        assert_eq!(control_char_value("VMIN", 0).unwrap(), 0);
        assert_eq!(control_char_value("VMIN", 255).unwrap(), 255);
        assert!(control_char_value("VMIN", -1).is_err());
        assert!(control_char_value("VTIME", 256).is_err());
    }

    #[test]
    fn closed_port_rejects_everything() {
        let mut port = SerialPort::new();
        assert!(!port.is_open());
        assert!(port.path().is_none());
        assert!(matches!(port.close(), Err(SerialError::NotOpen)));
        assert!(matches!(port.baud_rate(), Err(SerialError::NotOpen)));
        assert!(matches!(
            port.set_parity(Parity::Even),
            Err(SerialError::NotOpen)
        ));
        assert!(matches!(port.set_vmin(300), Err(SerialError::NotOpen)));
        assert!(matches!(port.is_data_available(), Err(SerialError::NotOpen)));
        assert!(matches!(port.file_descriptor(), Err(SerialError::NotOpen)));
        assert!(matches!(port.flush_io_buffers(), Err(SerialError::NotOpen)));
        assert!(matches!(port.initialize(), Err(SerialError::NotOpen)));
    }

    #[test]
    fn empty_open_mode_is_rejected() {
        let mut port = SerialPort::new();
        assert!(matches!(
            port.open("/dev/null", OpenMode::default()),
            Err(SerialError::InvalidArgument(_))
        ));
        assert!(!port.is_open());
    }

    #[test]
    fn missing_device_fails_to_open() {
        let mut port = SerialPort::new();
        let err = port
            .open("/nonexistent/serial-device", OpenMode::READ_WRITE)
            .unwrap_err();
        assert!(matches!(err, SerialError::OpenFailed { .. }));
        assert!(!port.is_open());
    }

    #[test]
    fn non_terminal_fails_to_open_and_stays_closed() {
        let mut port = SerialPort::new();
        let err = port.open("/dev/null", OpenMode::READ).unwrap_err();
        assert!(matches!(err, SerialError::OpenFailed { .. }));
        assert!(!port.is_open());
    }
}
