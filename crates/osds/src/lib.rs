//! Minimal user-space Ceph OSD core: wire codec, hobject-keyed block store,
//! WRITE/READ/STAT op handlers, and the connection/lifecycle glue that ties
//! them to a msgr2 listener and a monitor client.
//!
//! Out of scope, by design: durability, replication, peering, placement-group
//! state machines, scrub, backfill, and snapshot semantics. Snaps are parsed
//! off the wire and carried through but never acted on.

pub mod connection;
pub mod error;
pub mod monitor;
pub mod ops;
pub mod server;
pub mod store;
pub mod wire;

pub use error::{OsdsError, Result};
pub use ops::ConnectionOptions;
pub use server::{OsdServer, OsdServerConfig};
pub use store::Store;
