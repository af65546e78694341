//! Error taxonomy for the session connector.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixConnectorError {
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("checksum mismatch: expected {expected:03}, got {actual:03}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("logon rejected: {0}")]
    LogonRejected(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("private key is invalid or not Ed25519: {0}")]
    InvalidKey(String),

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for FixConnectorError {
    fn from(err: std::io::Error) -> Self {
        FixConnectorError::TransportFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FixConnectorError>;
