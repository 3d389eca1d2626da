//! Common utilities module
//!
//! This module contains shared utilities used across the light probe engines.

pub mod error;

pub use error::{ProbeError, Result};
