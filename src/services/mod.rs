/// Classification of accepted sockets: reject, serve, or upgrade.
pub mod admission;
/// Static file responder for the spectator UI.
pub mod assets;
/// Upgraded relay client connections.
pub mod connection;
/// Request head parsing and WebSocket accept-token computation.
pub mod handshake;
/// Cooperative scheduler driving relay, LED sweep and networking.
pub mod main_loop;
/// Bounded registry of relay clients and broadcasting.
pub mod registry;
