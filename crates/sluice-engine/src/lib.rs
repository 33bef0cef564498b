//! The Sluice pipeline engine and its real-time broadcast fabric.
//!
//! [`Hub`] is the single owned context: it holds the ledger (metrics, item
//! store, activity log), the fabric that fans events out to observers and
//! peer instances, the auto-generator, and the durable snapshot sync. HTTP
//! layers hold an `Arc<Hub<S>>` and nothing else.

pub mod bus;
pub mod config;
pub mod error;
pub mod fabric;
pub mod generator;
pub mod hub;
pub mod ledger;
pub mod pipeline;
pub mod snapshot;
pub mod templates;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use fabric::{Fabric, Observer};
pub use hub::{Health, Hub};
