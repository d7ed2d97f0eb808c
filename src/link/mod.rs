//! # BLE Link Layer
//!
//! The transport collaborator boundary. The crate never talks to a BLE
//! stack directly: anything that can scan, connect, enable notifications
//! and push notification traffic implements [`BleLink`], and the session
//! engine drives it. A scriptable in-memory implementation lives in
//! [`mock`] for tests and the simulation CLI.

pub mod mock;
pub mod transport;

pub use mock::{MockLink, MockLinkHandle};
pub use transport::{BleLink, LinkEvent};
