use std::io;

use thiserror::Error;

use crate::socks5::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Timed out!")]
    Timeout,

    #[error("Receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("Send failed: {0}")]
    Send(#[source] io::Error),

    #[error("Unexpected {protocol} version: {version}")]
    UnexpectedVersion { protocol: &'static str, version: u8 },

    #[error("Invalid {field} length: {len}")]
    InvalidLength { field: &'static str, len: usize },

    #[error("Unknown address type: {0:#04x}")]
    UnknownAddressType(u8),

    #[error("Unsupported request command: {0}")]
    UnsupportedCommand(Command),

    #[error("Authentication failed!")]
    AuthenticationFailed,

    #[error("No acceptable authentication method!")]
    NoAcceptableMethod,

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Rejections the client was told about before the connection closed.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedCommand(_) | Self::AuthenticationFailed | Self::NoAcceptableMethod
        )
    }
}
