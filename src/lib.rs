//! message-lookup: serve numbered text messages over a fixed-frame TCP protocol
//!
//! A server loads an ordered catalog of messages at startup. Clients ask for a
//! message by its 1-based number, or for a random one with number 0, and get a
//! 128-byte response frame back. A connection stays open across requests until
//! a request carries the close flag.
//!
//! Modules, leaf first:
//! - `protocol`: request and response frames
//! - `storage`: the immutable message catalog
//! - `session`: per-connection state machine on the server
//! - `server`: accept loop, one task per connection
//! - `client`: request driver and console loop

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod storage;

pub use client::Client;
pub use error::{LoadError, ProtocolError};
pub use protocol::{Request, Response, Status};
pub use server::Server;
pub use session::{Session, SessionState, SessionSummary};
pub use storage::MessageStore;
