//! Library crate for buzzer-relay, exposing the controller modules to the binary and tests.

pub mod config;
/// Wire payloads: raw HTTP heads and relay messages.
pub mod dto;
/// Error types shared across the controller.
pub mod error;
pub mod hw;
/// Network side: admission, handshake, registry and the main loop.
pub mod services;
pub mod state;
