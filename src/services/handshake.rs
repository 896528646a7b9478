use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::HandshakeError;

/// Fixed GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const MAX_LINE_LEN: u64 = 4096;
const MAX_HEADERS: usize = 64;
const WEBSOCKET_KEY_LEN: usize = 16;

/// Parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method (`GET`).
    pub method: String,
    /// Request target as sent by the client.
    pub path: String,
    /// Header map keyed by lower-cased name; values are trimmed but keep their case.
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the client asked to switch to the WebSocket protocol.
    pub fn wants_upgrade(&self) -> bool {
        self.header("upgrade")
            .is_some_and(|value| value.to_ascii_lowercase().contains("websocket"))
    }

    /// Validated `Sec-WebSocket-Key` of an upgrade request.
    pub fn websocket_key(&self) -> Result<&str, HandshakeError> {
        let key = self
            .header("sec-websocket-key")
            .filter(|key| !key.is_empty())
            .ok_or(HandshakeError::MissingKey)?;
        match STANDARD.decode(key) {
            Ok(raw) if raw.len() == WEBSOCKET_KEY_LEN => Ok(key),
            _ => Err(HandshakeError::InvalidKey),
        }
    }
}

/// Compute the `Sec-WebSocket-Accept` token for a client key.
pub fn accept_token(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Read a request line and headers up to the blank terminator.
///
/// The caller bounds the whole read with a timeout; this function only bounds
/// line length and header count.
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = read_line(reader).await?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Err(HandshakeError::MalformedRequestLine);
    };
    let (method, path) = (method.to_string(), path.to_string());

    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(HandshakeError::TooManyHeaders);
        }
        // Lines without a colon carry nothing we use.
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(RequestHead {
        method,
        path,
        headers,
    })
}

/// Read one line, stripping the `\r\n` (or bare `\n`) terminator.
async fn read_line<R>(reader: &mut R) -> Result<String, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return Err(HandshakeError::Closed);
    }
    if buf.last() != Some(&b'\n') {
        return Err(if read as u64 >= MAX_LINE_LEN {
            HandshakeError::LineTooLong
        } else {
            HandshakeError::Closed
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| HandshakeError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    async fn parse(raw: &str) -> Result<RequestHead, HandshakeError> {
        let mut reader = BufReader::new(raw.as_bytes());
        read_request_head(&mut reader).await
    }

    #[test]
    fn accept_token_matches_reference_vector() {
        assert_eq!(
            accept_token("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn accept_token_agrees_with_frame_layer() {
        let key = "x3JJHMbDL1EzLkh9GBhXDw==";
        assert_eq!(
            accept_token(key),
            tokio_tungstenite::tungstenite::handshake::derive_accept_key(key.as_bytes())
        );
    }

    #[tokio::test]
    async fn parses_upgrade_request() {
        let head = parse(
            "GET /chat HTTP/1.1\r\n\
             Host: 192.168.4.1\r\n\
             Upgrade: WebSocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n",
        )
        .await
        .unwrap();

        assert_eq!(head.method, "GET");
        assert_eq!(head.path, "/chat");
        assert!(head.wants_upgrade());
        // The key keeps its case: lower-casing it would change the accept token.
        assert_eq!(head.websocket_key().unwrap(), "dGhlIHNhbXBsZSBub25jZQ==");
    }

    #[tokio::test]
    async fn plain_request_is_not_upgrade() {
        let head = parse("GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();
        assert!(!head.wants_upgrade());
        assert_eq!(head.header("HOST"), Some("x"));
    }

    #[tokio::test]
    async fn bare_newlines_are_accepted() {
        let head = parse("GET / HTTP/1.1\nUpgrade: websocket\n\n").await.unwrap();
        assert!(head.wants_upgrade());
        assert!(matches!(
            head.websocket_key(),
            Err(HandshakeError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn malformed_key_is_rejected() {
        let head = parse(
            "GET / HTTP/1.1\r\nUpgrade: websocket\r\nSec-WebSocket-Key: not-base64!\r\n\r\n",
        )
        .await
        .unwrap();
        assert!(matches!(
            head.websocket_key(),
            Err(HandshakeError::InvalidKey)
        ));

        let short = parse("GET / HTTP/1.1\r\nUpgrade: websocket\r\nSec-WebSocket-Key: AAAA\r\n\r\n")
            .await
            .unwrap();
        assert!(matches!(
            short.websocket_key(),
            Err(HandshakeError::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn truncated_head_is_closed() {
        assert!(matches!(
            parse("GET / HTTP/1.1\r\nHost: x\r\n").await,
            Err(HandshakeError::Closed)
        ));
        assert!(matches!(parse("").await, Err(HandshakeError::Closed)));
    }

    #[tokio::test]
    async fn garbage_request_line_is_rejected() {
        assert!(matches!(
            parse("HELLO\r\n\r\n").await,
            Err(HandshakeError::MalformedRequestLine)
        ));
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(5000));
        assert!(matches!(
            parse(&raw).await,
            Err(HandshakeError::LineTooLong)
        ));
    }
}
