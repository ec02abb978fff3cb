//! The networking modules handle framing, per-connection state and the
//! readiness loop that serves all clients from a single thread.

pub mod buffer;
pub mod channel;
pub mod endpoint;
pub mod frame;
pub mod support;
