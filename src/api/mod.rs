//! API client module for the ONEKEY platform.
//!
//! This module provides the `Client` that drives the login protocol,
//! tenant selection and authenticated GraphQL dispatch, and the error
//! taxonomy every operation reports through.

pub mod client;
pub mod error;

pub use client::Client;
pub use error::{Error, Result};
