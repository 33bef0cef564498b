//! Redis pub/sub transport for Sluice.
//!
//! Each topic maps to a Redis channel of the same name. Publishing goes
//! through a shared multiplexed connection; subscribing holds one dedicated
//! pub/sub connection for all topics so a single producer's messages arrive
//! in the order they were sent.

mod bus;

pub mod error;

pub use bus::RedisBus;
pub use error::{Error, Result};
