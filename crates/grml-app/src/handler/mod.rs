//! Bus handlers.
//!
//! - [`CoreHandler`] turns view requests into application operations
//! - [`HostHandler`] talks to the editor host and runs the kernel queue
//! - [`PeerHandler`] mirrors model changes to and from collaborating peers

pub mod command;
pub mod host;
pub mod peer;

pub use self::command::CoreHandler;
pub use self::host::{HostHandler, HostInbound, HostMessage};
pub use self::peer::PeerHandler;
