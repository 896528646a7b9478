//! Raw HTTP response heads written by the relay listener.

/// Value of the `Server` header on plain HTTP responses.
pub const SERVER_NAME: &str = "buzzer-relay";

/// Written to a client that arrives while the registry is full.
pub const TOO_MANY_CONNECTIONS: &[u8] = b"HTTP/1.1 503 Too many connections\n\n";

/// Body sent with a 404.
pub const NOT_FOUND_BODY: &str =
    "<html><body><h1>404 Not Found</h1><p>The requested file was not found.</p></body></html>";

/// Successful upgrade response carrying the computed accept token.
pub fn switching_protocols(accept_token: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept_token}\r\n\r\n"
    )
}

/// Head of a `200 OK` response for a static asset.
pub fn ok_head(content_type: &str, content_length: usize) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Connection: close\r\n\
         Server: {SERVER_NAME}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {content_length}\r\n\r\n"
    )
}

/// Head of a `404 Not Found` response; the body is [`NOT_FOUND_BODY`].
pub fn not_found_head() -> String {
    format!(
        "HTTP/1.1 404 Not Found\r\n\
         Connection: close\r\n\
         Server: {SERVER_NAME}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\r\n",
        NOT_FOUND_BODY.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_protocols_is_byte_exact() {
        assert_eq!(
            switching_protocols("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="),
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n"
        );
    }

    #[test]
    fn ok_head_carries_length_and_type() {
        let head = ok_head("text/css", 42);
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/css\r\n"));
        assert!(head.contains("Content-Length: 42\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }
}
