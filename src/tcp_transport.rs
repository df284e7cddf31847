use crate::error::{Error, Operation, Result, TransportError};
use crate::transport::{ReadOutcome, Transport};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::io::AsRawFd;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self { stream: None }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected.into())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyConnected.into());
        }

        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&addr).map_err(|e| {
            warn!(%addr, error = %e, "connect failed");
            Error::io(Operation::Connect, e)
        })?;

        stream
            .set_nodelay(true)
            .map_err(|e| Error::io(Operation::Connect, e))?;

        debug!(%addr, "connected");
        self.stream = Some(stream);
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        stream
            .write_all(buf)
            .map_err(|e| Error::io(Operation::Write, e))?;
        trace!(bytes = buf.len(), "wrote");
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let stream = self.stream()?;
        loop {
            match stream.read(buf) {
                Ok(0) if !buf.is_empty() => return Ok(ReadOutcome::Closed),
                Ok(n) => {
                    trace!(bytes = n, "read");
                    return Ok(ReadOutcome::Data(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(Operation::Read, e)),
            }
        }
    }

    fn try_read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let fd = self.stream()?.as_raw_fd();
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }
        loop {
            // MSG_DONTWAIT makes this one call non-blocking; the socket
            // itself stays in blocking mode.
            let rc = unsafe {
                libc::recv(
                    fd,
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    buf.len(),
                    libc::MSG_DONTWAIT,
                )
            };
            if rc > 0 {
                trace!(bytes = rc, "read without waiting");
                return Ok(ReadOutcome::Data(rc as usize));
            }
            if rc == 0 {
                return Ok(ReadOutcome::Closed);
            }
            let err = std::io::Error::last_os_error();
            match err.kind() {
                ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
                ErrorKind::Interrupted => continue,
                _ => return Err(Error::io(Operation::Read, err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                // Peer already tore the connection down.
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => {
                    warn!(error = %e, "shutdown failed");
                    return Err(Error::io(Operation::Close, e));
                }
            }
            debug!("connection closed");
        }
        Ok(())
    }
}
