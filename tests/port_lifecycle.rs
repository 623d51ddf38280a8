//! Open/close lifecycle of `SerialPort` against a pseudo-terminal.

mod common;

use common::PtyPair;
use serial_stream::{
    BaudRate, CharacterSize, FlowControl, LineSettings, OpenMode, Parity, SerialError, SerialPort,
    StopBits,
};

#[test]
fn test_open_applies_defaults_and_blocking_mode() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();

    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();

    assert!(port.is_open());
    assert_eq!(port.path(), Some(pty.path()));
    assert!(port.file_descriptor().unwrap() >= 0);
    assert!(port.is_blocking().unwrap());
    assert_eq!(port.line_settings().unwrap(), LineSettings::default());
    assert_eq!(port.baud_rate().unwrap(), BaudRate::Baud115200);
    assert_eq!(port.character_size().unwrap(), CharacterSize::Eight);
    assert_eq!(port.parity().unwrap(), Parity::None);
    assert_eq!(port.stop_bits().unwrap(), StopBits::One);
    assert_eq!(port.flow_control().unwrap(), FlowControl::None);
    assert_eq!(port.vmin().unwrap(), 0);
    assert_eq!(port.vtime().unwrap(), 0);
}

#[test]
fn test_open_puts_terminal_in_raw_mode() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();

    let raw = pty.slave_termios();
    assert_eq!(raw.c_lflag & (libc::ICANON | libc::ECHO | libc::ISIG), 0);
    assert_eq!(raw.c_oflag & libc::OPOST, 0);
    assert_ne!(raw.c_cflag & libc::CLOCAL, 0);
    assert_ne!(raw.c_cflag & libc::CREAD, 0);
}

#[test]
fn test_open_twice_is_rejected() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();
    let fd = port.file_descriptor().unwrap();

    let err = port.open(pty.path(), OpenMode::READ).unwrap_err();
    assert!(matches!(err, SerialError::AlreadyOpen));

    // The first handle is untouched.
    assert!(port.is_open());
    assert_eq!(port.file_descriptor().unwrap(), fd);
}

#[test]
fn test_close_restores_original_settings() {
    let pty = PtyPair::open();
    let before = pty.slave_termios();
    assert_ne!(before.c_lflag & libc::ICANON, 0, "fresh pty is canonical");

    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();
    port.set_baud_rate(BaudRate::Baud9600).unwrap();
    port.set_stop_bits(StopBits::Two).unwrap();
    port.close().unwrap();

    let after = pty.slave_termios();
    assert_eq!(after.c_iflag, before.c_iflag);
    assert_eq!(after.c_oflag, before.c_oflag);
    assert_eq!(after.c_cflag, before.c_cflag);
    assert_eq!(after.c_lflag, before.c_lflag);
    assert_eq!(after.c_cc, before.c_cc);
}

#[test]
fn test_operations_after_close_report_not_open() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();
    port.close().unwrap();

    assert!(!port.is_open());
    assert!(port.path().is_none());
    assert!(matches!(port.file_descriptor(), Err(SerialError::NotOpen)));
    assert!(matches!(port.baud_rate(), Err(SerialError::NotOpen)));
    assert!(matches!(port.is_blocking(), Err(SerialError::NotOpen)));
    assert!(matches!(port.close(), Err(SerialError::NotOpen)));
}

#[test]
fn test_port_can_be_reopened_after_close() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ).unwrap();
    port.close().unwrap();
    port.open(pty.path(), OpenMode::WRITE).unwrap();
    assert!(port.is_open());
}

#[test]
fn test_drop_restores_settings() {
    let pty = PtyPair::open();
    let before = pty.slave_termios();
    {
        let mut port = SerialPort::new();
        port.open(pty.path(), OpenMode::READ_WRITE).unwrap();
    }
    let after = pty.slave_termios();
    assert_eq!(after.c_lflag, before.c_lflag);
    assert_eq!(after.c_cflag, before.c_cflag);
}

#[test]
fn test_initialize_resets_changed_parameters() {
    let pty = PtyPair::open();
    let mut port = SerialPort::new();
    port.open(pty.path(), OpenMode::READ_WRITE).unwrap();
    port.set_baud_rate(BaudRate::Baud4800).unwrap();
    port.set_vtime(20).unwrap();

    port.initialize().unwrap();

    assert_eq!(port.line_settings().unwrap(), LineSettings::default());
    assert!(port.is_blocking().unwrap());
}
