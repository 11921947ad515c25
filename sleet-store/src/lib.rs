//! Fleet datastore for the sleet delivery network.
//!
//! A [`Datastore`] tracks a set of (region, program) pairs, keeps every
//! parse artifact (configs, encoding mappers, archive indices, filename
//! trees) cached by hash, and serves read-consistent [`Resolver`]
//! snapshots. Artifacts unreachable from any tracked pair's current
//! version are evicted at the end of each update cycle; snapshots issued
//! earlier stay valid because they hold reference-counted handles.
//!
//! [`Resolver`]: sleet_client::Resolver

pub mod error;
pub mod store;

pub use error::{Error, Result};
pub use store::{Datastore, StoreStats, Tracked};
