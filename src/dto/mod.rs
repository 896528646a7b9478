/// Raw HTTP/1.1 response heads written by the relay listener.
pub mod http;
/// Relay payloads pushed over WebSocket.
pub mod ws;
