//! Non-blocking pipe endpoints for would-block conformance.
//!
//! A [`PipeFixture`] owns both ends of an `O_NONBLOCK` POSIX pipe. The read
//! end reports `WouldBlock` while the pipe is empty and `Eof` once the write
//! end is gone; the write end reports `WouldBlock` when the kernel buffer is
//! full. This is the smallest honest source of the retry outcomes the
//! buffered layer must survive.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use stratio_core::error::{StreamError, StreamResult};
use stratio_core::raw::{RawRead, RawStream, RawWrite};

/// Read end of a non-blocking pipe.
pub struct PipeReader {
    fd: Option<OwnedFd>,
}

/// Write end of a non-blocking pipe.
pub struct PipeWriter {
    fd: Option<OwnedFd>,
}

/// Both ends of one non-blocking pipe.
pub struct PipeFixture {
    pub reader: PipeReader,
    pub writer: PipeWriter,
}

impl PipeFixture {
    /// Create a pipe with both ends set to `O_NONBLOCK`.
    pub fn nonblocking() -> io::Result<Self> {
        let mut fds = [0i32; 2];
        // SAFETY: fds points at two writable ints; pipe fills both on success.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: both descriptors were just created and nothing else owns them.
        let read_fd = unsafe { OwnedFd::from_raw_fd(fds[0]) };
        let write_fd = unsafe { OwnedFd::from_raw_fd(fds[1]) };
        set_nonblocking(&read_fd)?;
        set_nonblocking(&write_fd)?;
        Ok(Self {
            reader: PipeReader { fd: Some(read_fd) },
            writer: PipeWriter { fd: Some(write_fd) },
        })
    }
}

fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: fd is a valid open descriptor for the duration of the call.
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same descriptor, adding O_NONBLOCK to its current flags.
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl RawStream for PipeReader {
    fn read(&mut self, max: usize) -> StreamResult<RawRead> {
        let Some(fd) = &self.fd else {
            return Err(StreamError::Closed);
        };
        if max == 0 {
            return Ok(RawRead::Data(Vec::new()));
        }
        let mut buf = vec![0u8; max];
        loop {
            // SAFETY: buf is writable for buf.len() bytes and outlives the call.
            let n = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
            if n > 0 {
                buf.truncate(n as usize);
                return Ok(RawRead::Data(buf));
            }
            if n == 0 {
                return Ok(RawRead::Eof);
            }
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => return Ok(RawRead::WouldBlock),
                _ => return Err(err.into()),
            }
        }
    }

    fn close(&mut self) -> StreamResult<()> {
        self.fd = None;
        Ok(())
    }

    fn fileno(&self) -> Option<i32> {
        self.fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        false
    }

    fn seekable(&self) -> bool {
        false
    }
}

impl RawStream for PipeWriter {
    fn write(&mut self, data: &[u8]) -> StreamResult<RawWrite> {
        let Some(fd) = &self.fd else {
            return Err(StreamError::Closed);
        };
        if data.is_empty() {
            return Ok(RawWrite::Accepted(0));
        }
        loop {
            // SAFETY: data is readable for data.len() bytes for the call.
            let n = unsafe { libc::write(fd.as_raw_fd(), data.as_ptr().cast(), data.len()) };
            if n > 0 {
                return Ok(RawWrite::Accepted(n as usize));
            }
            if n == 0 {
                // No progress on a non-empty slice is a stall, not an accept.
                return Ok(RawWrite::WouldBlock);
            }
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => return Ok(RawWrite::WouldBlock),
                _ => return Err(err.into()),
            }
        }
    }

    fn close(&mut self) -> StreamResult<()> {
        self.fd = None;
        Ok(())
    }

    fn fileno(&self) -> Option<i32> {
        self.fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        true
    }

    fn seekable(&self) -> bool {
        false
    }
}
