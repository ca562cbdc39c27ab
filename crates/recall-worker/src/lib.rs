//! recall-worker — Recognition session and the worker that hosts it.
//!
//! A host posts tagged events (frames, gallery administration) to the worker;
//! the worker runs each through one [`Session`] and posts one reply back.
//! [`run_bridge`] carries those events as JSON lines over a byte stream.

pub mod bridge;
pub mod config;
pub mod protocol;
pub mod session;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{run_bridge, BridgeError};
pub use config::Config;
pub use protocol::{InboundEvent, OutboundEvent, ProtocolError};
pub use session::{Session, SessionConfig, GALLERY_FILE_NAME, UNKNOWN_NAME};
pub use worker::{spawn_worker, WorkerError, WorkerHandle};
