//! Shared test utilities: a pseudo-terminal standing in for a serial line.

#![allow(dead_code, unused_imports)]

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serial_stream::{LineSettings, SerialStreamBuf, UnbufferedStream};

/// How long helpers wait for bytes to cross the pty.
pub const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// A pty pair. Tests open the slave path as the "serial device" and play
/// the remote end through the master.
///
/// One slave descriptor is held open for the fixture's lifetime so the
/// terminal (and its settings) outlives the port under test.
pub struct PtyPair {
    master: File,
    slave: File,
    slave_path: PathBuf,
}

impl PtyPair {
    pub fn open() -> Self {
        let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        assert!(
            fd >= 0,
            "posix_openpt failed: {}",
            io::Error::last_os_error()
        );
        let master = unsafe { File::from_raw_fd(fd) };

        assert_eq!(unsafe { libc::grantpt(fd) }, 0, "grantpt failed");
        assert_eq!(unsafe { libc::unlockpt(fd) }, 0, "unlockpt failed");

        let slave_path = slave_name(fd);
        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&slave_path)
            .expect("Failed to open pty slave");

        // Master reads poll with a deadline instead of blocking.
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            assert!(flags >= 0);
            assert_eq!(libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK), 0);
        }

        Self {
            master,
            slave,
            slave_path,
        }
    }

    /// Path to pass to `SerialPort::open`.
    pub fn path(&self) -> &Path {
        &self.slave_path
    }

    /// Current terminal settings, read through the fixture's own slave
    /// descriptor.
    pub fn slave_termios(&self) -> libc::termios {
        let mut raw: libc::termios = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::tcgetattr(self.slave.as_raw_fd(), &mut raw) };
        assert_eq!(rc, 0, "tcgetattr failed: {}", io::Error::last_os_error());
        raw
    }

    /// Send bytes to the port under test.
    pub fn send(&mut self, data: &[u8]) {
        self.master.write_all(data).expect("Failed to write to pty master");
    }

    /// Collect up to `want` bytes written by the port under test, giving up
    /// after `IO_TIMEOUT`.
    pub fn receive(&mut self, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + IO_TIMEOUT;
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        while out.len() < want && Instant::now() < deadline {
            match self.master.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("pty master read failed: {}", e),
            }
        }
        out
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn slave_name(fd: libc::c_int) -> PathBuf {
    let mut buf = [0 as libc::c_char; 128];
    let rc = unsafe { libc::ptsname_r(fd, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(rc, 0, "ptsname_r failed");
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    PathBuf::from(name.to_string_lossy().into_owned())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn slave_name(fd: libc::c_int) -> PathBuf {
    let ptr = unsafe { libc::ptsname(fd) };
    assert!(!ptr.is_null(), "ptsname failed");
    let name = unsafe { CStr::from_ptr(ptr) };
    PathBuf::from(name.to_string_lossy().into_owned())
}

/// A stream on `pty` at 9600 8N1 whose reads wait up to one second.
pub fn open_stream(pty: &PtyPair) -> SerialStreamBuf {
    let line = LineSettings {
        baud_rate: serial_stream::BaudRate::Baud9600,
        vtime: 10,
        ..LineSettings::default()
    };
    SerialStreamBuf::open_with(pty.path(), &line).expect("Failed to open stream on pty")
}

/// Read until `want` bytes arrived or the deadline passed.
pub fn read_exact_within(stream: &mut SerialStreamBuf, want: usize) -> Vec<u8> {
    let deadline = Instant::now() + IO_TIMEOUT;
    let mut out = vec![0u8; want];
    let mut filled = 0;
    while filled < want && Instant::now() < deadline {
        filled += stream
            .read_bytes(&mut out[filled..])
            .expect("read on open stream");
    }
    out.truncate(filled);
    out
}

/// Probe until the stream reports input or the deadline passed.
pub fn wait_until_ready(stream: &mut SerialStreamBuf) -> usize {
    let deadline = Instant::now() + IO_TIMEOUT;
    loop {
        let ready = stream.bytes_ready().expect("probe on open stream");
        if ready > 0 || Instant::now() >= deadline {
            return ready;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
