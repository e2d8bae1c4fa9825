//! Websocket relay for collaborating GrML instances.
//!
//! Every text frame a client sends is re-sent verbatim to all other
//! connected clients. The relay keeps no model state of its own.

pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod state;
