//! CEX WebSocket client.
//!
//! Responsibilities:
//! • Subscribe to a centralized exchange public ticker channel.
//! • Return the first `last` trade price for one instrument.
//! • Release the connection on every exit path.

pub mod okx;

pub use okx::OkxTicker;
