use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Conditions that abort the controller before the main loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The safety interlock line is not grounded.
    #[error("safety interlock not asserted")]
    InterlockNotAsserted,
    /// No usable network address could be obtained.
    #[error("network association failed: {0}")]
    Association(String),
    /// The relay listener could not be bound.
    #[error("failed to bind relay listener on {addr}")]
    Bind {
        /// Address the bind was attempted on.
        addr: std::net::SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while writing to a relay client.
///
/// Any of them means the peer is gone; the caller drops the connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The frame layer reported the connection closed or broken.
    #[error("connection closed: {0}")]
    Closed(#[from] tungstenite::Error),
    /// The write did not complete within the configured bound.
    #[error("write timed out")]
    WriteTimeout,
}

/// Errors raised while reading and validating an incoming request head.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Socket read failed.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    /// The peer closed before a complete head arrived.
    #[error("peer closed during request head")]
    Closed,
    /// The head was not read within the handshake bound.
    #[error("request head timed out")]
    Timeout,
    /// A response could not be written within the write bound.
    #[error("response write timed out")]
    WriteTimeout,
    /// A single line exceeded the size limit.
    #[error("request line too long")]
    LineTooLong,
    /// The head carried more headers than allowed.
    #[error("too many headers")]
    TooManyHeaders,
    /// The request line is not `METHOD PATH VERSION`.
    #[error("malformed request line")]
    MalformedRequestLine,
    /// A line is not valid UTF-8.
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,
    /// An upgrade was requested without a `Sec-WebSocket-Key`.
    #[error("upgrade request without key")]
    MissingKey,
    /// The `Sec-WebSocket-Key` is not base64 of 16 bytes.
    #[error("malformed upgrade key")]
    InvalidKey,
}
