//! Core types and trait definitions for Sluice.
//!
//! This crate is deliberately free of HTTP, database, and message-bus
//! dependencies. Every other crate depends on it.

pub mod activity;
pub mod error;
pub mod event;
pub mod item;
pub mod metrics;
pub mod store;
pub mod transport;

pub use error::{Error, Result};
