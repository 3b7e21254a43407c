//! sgsync Core
//!
//! Keeps a security group's inbound rule pointed at the caller's current
//! public IP. Rules are owned by a `{user}-{location}` identity stored in the
//! rule description; each run revokes the identity's stale rules and
//! authorizes a fresh one.

pub mod differ;
pub mod effect;
pub mod error;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod rule;
pub mod synchronizer;

#[cfg(test)]
mod testing;

pub use error::{SyncError, SyncResult};
pub use synchronizer::{GroupReport, SyncObserver, SyncReport, SyncRequest, Synchronizer};
