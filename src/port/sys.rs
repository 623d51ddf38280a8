//! Thin wrappers over the libc calls the port and stream adapter make.

use std::io;
use std::os::unix::io::RawFd;

/// Which kernel queue a flush discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Input,
    Output,
    Both,
}

pub fn flush(fd: RawFd, queue: Queue) -> io::Result<()> {
    let selector = match queue {
        Queue::Input => libc::TCIFLUSH,
        Queue::Output => libc::TCOFLUSH,
        Queue::Both => libc::TCIOFLUSH,
    };
    if unsafe { libc::tcflush(fd, selector) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Number of bytes waiting in the input queue.
pub fn bytes_available(fd: RawFd) -> io::Result<usize> {
    let mut count: libc::c_int = 0;
    if unsafe { libc::ioctl(fd, libc::FIONREAD as _, &mut count) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(count.max(0) as usize)
}

pub fn status_flags(fd: RawFd) -> io::Result<libc::c_int> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags)
}

pub fn set_status_flags(fd: RawFd, flags: libc::c_int) -> io::Result<()> {
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn set_blocking(fd: RawFd, blocking: bool) -> io::Result<()> {
    let flags = status_flags(fd)?;
    let flags = if blocking {
        flags & !libc::O_NONBLOCK
    } else {
        flags | libc::O_NONBLOCK
    };
    set_status_flags(fd, flags)
}

pub fn is_blocking(fd: RawFd) -> io::Result<bool> {
    Ok(status_flags(fd)? & libc::O_NONBLOCK == 0)
}

/// One `read(2)`; no retry on `EINTR` or short reads.
pub fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// One `write(2)`; no retry on `EINTR` or short writes.
pub fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let ret = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret as usize)
}

/// Close a descriptor the caller has already released from its owner.
pub fn close(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::close(fd) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
