pub mod base_client;
pub mod config;
pub mod error;
pub mod tcp_transport;
pub mod transport;

pub use base_client::BaseClient;
pub use config::{ClientConfig, READ_BUFFER_SIZE};
pub use error::{ConfigError, Error, Operation, Result, TransportError};
pub use tcp_transport::TcpTransport;
pub use transport::{ReadOutcome, Transport};
