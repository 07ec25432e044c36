//! Courier - a small tool-calling agent with read-only Gmail access
//!
//! This library provides the agent loop, its tools, the Gmail OAuth
//! credential store and an HTTP endpoint for running tasks.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod gmail;
pub mod server;
pub mod tools;

pub use error::{Error, Result};
