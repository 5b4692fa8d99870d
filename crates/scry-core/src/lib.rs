//! Scry Core Library
//!
//! The record filter engine, the host capability traits it is fed from, and
//! the listing operations that tie the two together. Everything here is
//! pure and synchronous; live process access is a capability injected by
//! the agent crate.

pub mod filter;
pub mod host;
pub mod listing;
pub mod memory;

pub use host::{MemoryAccess, ProcessInspector, RuntimeInspector};
pub use scry_common::{Error, Result};
