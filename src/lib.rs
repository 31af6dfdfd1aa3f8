//! gearstream: a streaming product-recommendation sample backend and its
//! incremental consumer.
//!
//! The backend draws a random search sample (products, categories and the
//! products associated with each category) from a fixed catalog and streams
//! it over HTTP one line at a time. The consumer triggers a new sample,
//! reads the three streams in order and turns every line into an event for
//! a renderer.

pub mod catalog;
pub mod config;
pub mod error;
pub mod render;
pub mod sample;
pub mod server;
pub mod streaming;

pub use error::{Error, Result};
