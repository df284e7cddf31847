use std::io::ErrorKind;
use std::str::Utf8Error;

use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TransportError {
    #[error("could not resolve host")]
    DnsFailure,
    #[error("could not connect to server")]
    SocketConnectFailure,
    #[error("could not write to socket")]
    SocketWriteFailure,
    #[error("could not read from socket")]
    SocketReadFailure,
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("could not close socket")]
    SocketCloseFailure,
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("host must not be empty")]
    EmptyHost,
    #[error("read buffer size must be non-zero")]
    ZeroBufferSize,
}

/// Socket call an io error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Write,
    Read,
    Close,
}

#[derive(Debug, Error)]
pub enum Error {
    /// `source` is the untouched OS error when the failure came from a
    /// socket call.
    #[error("transport error: {kind}")]
    Transport {
        kind: TransportError,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("message is not valid UTF-8: {0}")]
    Decode(#[from] Utf8Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn io(operation: Operation, err: std::io::Error) -> Self {
        let kind = classify(operation, &err);
        debug!(?operation, error = %err, ?kind, "socket call failed");
        Error::Transport {
            kind,
            source: Some(err),
        }
    }

    pub fn transport_kind(&self) -> Option<TransportError> {
        match self {
            Error::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(kind: TransportError) -> Self {
        Error::Transport { kind, source: None }
    }
}

/// Bare `?` on an io error is only used on the read path.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(Operation::Read, err)
    }
}

fn is_lookup_failure(err: &std::io::Error) -> bool {
    let message = err.to_string();
    err.kind() == ErrorKind::NotFound
        || message.contains("Name or service not known")
        || message.contains("failed to lookup address")
}

fn classify(operation: Operation, err: &std::io::Error) -> TransportError {
    match (operation, err.kind()) {
        (Operation::Connect, _) if is_lookup_failure(err) => TransportError::DnsFailure,
        (Operation::Connect, _) => TransportError::SocketConnectFailure,
        (Operation::Close, _) => TransportError::SocketCloseFailure,
        (_, ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted) => {
            TransportError::ConnectionClosed
        }
        (_, ErrorKind::NotConnected) => TransportError::NotConnected,
        (Operation::Write, _) => TransportError::SocketWriteFailure,
        (Operation::Read, _) => TransportError::SocketReadFailure,
    }
}
