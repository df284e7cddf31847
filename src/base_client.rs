//! Text command client on top of a [`Transport`].
//!
//! There is no framing: whatever a single read returns is one message.
//! A reply may therefore arrive split, merged with another, or cut off at
//! the read buffer size.

use crate::config::{ClientConfig, READ_BUFFER_SIZE};
use crate::error::Result;
use crate::tcp_transport::TcpTransport;
use crate::transport::{ReadOutcome, Transport};
use tracing::debug;

/// Owns one connection for its whole lifetime. Not meant to be shared
/// between threads; callers serialize access.
pub struct BaseClient<T: Transport = TcpTransport> {
    transport: T,
    buffer: Vec<u8>,
}

impl BaseClient<TcpTransport> {
    /// Opens a TCP connection to `host:port`, blocking for as long as the
    /// platform connect does.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::with_config(&ClientConfig::new(host, port))
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let mut transport = TcpTransport::new();
        transport.connect(&config.host, config.port)?;
        Ok(Self::with_buffer_size(transport, config.read_buffer_size))
    }
}

impl<T: Transport> BaseClient<T> {
    /// Wraps a transport that is already connected.
    pub fn from_transport(transport: T) -> Self {
        Self::with_buffer_size(transport, READ_BUFFER_SIZE)
    }

    fn with_buffer_size(transport: T, size: usize) -> Self {
        Self {
            transport,
            buffer: vec![0; size],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Waits for the next chunk from the server. `None` once the server has
    /// closed the connection.
    pub fn get_message(&mut self) -> Result<Option<String>> {
        let outcome = self.transport.read(&mut self.buffer)?;
        self.decode(outcome)
    }

    /// Returns whatever is already buffered, or `None` if nothing is.
    pub fn get_message_non_blocking(&mut self) -> Result<Option<String>> {
        let outcome = self.transport.try_read(&mut self.buffer)?;
        self.decode(outcome)
    }

    /// Discards unread input, sends `command` and, if `expect_output`,
    /// waits for the reply.
    pub fn perform_command(
        &mut self,
        command: &str,
        expect_output: bool,
    ) -> Result<Option<String>> {
        self.perform_command_with(command, expect_output, |stale| {
            debug!(bytes = stale.len(), "discarded unread message");
        })
    }

    /// Like [`perform_command`](Self::perform_command), but hands every
    /// drained chunk to `on_stale` before it is dropped.
    pub fn perform_command_with<F>(
        &mut self,
        command: &str,
        expect_output: bool,
        mut on_stale: F,
    ) -> Result<Option<String>>
    where
        F: FnMut(&str),
    {
        while let Some(stale) = self.get_message_non_blocking()? {
            on_stale(&stale);
        }

        self.transport.write_all(command.as_bytes())?;
        debug!(command, expect_output, "sent command");

        if expect_output {
            self.get_message()
        } else {
            Ok(None)
        }
    }

    pub fn request(&mut self, command: &str) -> Result<Option<String>> {
        self.perform_command(command, true)
    }

    pub fn send(&mut self, command: &str) -> Result<()> {
        self.perform_command(command, false).map(|_| ())
    }

    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }

    fn decode(&self, outcome: ReadOutcome) -> Result<Option<String>> {
        match outcome {
            ReadOutcome::Data(0) | ReadOutcome::WouldBlock | ReadOutcome::Closed => Ok(None),
            ReadOutcome::Data(n) => Ok(Some(std::str::from_utf8(&self.buffer[..n])?.to_owned())),
        }
    }
}
