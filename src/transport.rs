use crate::error::Result;

/// Result of a single read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes placed at the front of the buffer.
    Data(usize),
    /// Nothing is buffered right now. Only `try_read` reports this.
    WouldBlock,
    /// The peer closed its side of the connection.
    Closed,
}

pub trait Transport {
    fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Blocks until data arrives or the peer closes.
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Single read attempt that never waits and never changes the
    /// blocking mode of the underlying socket.
    fn try_read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    fn close(&mut self) -> Result<()>;
}
