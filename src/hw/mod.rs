//! Host-side stand-ins for the controller's hardware: input edges, LED lines,
//! the safety interlock and network association.

/// Stdin-driven edge source.
pub mod console;
/// Indicator lines that log their transitions.
pub mod indicator;
/// Startup checks performed before the relay listener is bound.
pub mod platform;
