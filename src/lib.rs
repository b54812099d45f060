//! Rust SDK for the ONEKEY IoT security platform.
//!
//! The platform uses a two-step login protocol:
//!
//! 1. `Client::login` authenticates with email/password and receives a
//!    signed identity token carrying the list of tenants you may use.
//! 2. `Client::select_tenant` exchanges the identity token for a
//!    tenant-scoped token, which authenticates every later API call.
//!
//! Both tokens are JWTs verified against public keys pinned per API
//! host; each exchange carries a fresh single-use nonce that must be
//! echoed back in the signed claims, so captured responses cannot be
//! replayed.
//!
//! ```no_run
//! use onekey_client::{Client, ClientConfig};
//!
//! # async fn run() -> onekey_client::Result<()> {
//! let mut client = Client::new(ClientConfig::new("https://app.eu.onekey.com/api"))?;
//! client.login("me@example.com", "secret").await?;
//! let tenant = client.get_tenant("Acme")?.clone();
//! client.select_tenant(&tenant).await?;
//! let data = client.query("{ allProductGroups { id name } }", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod queries;

pub use api::{Client, Error, Result};
pub use config::ClientConfig;
pub use models::{FirmwareMetadata, Tenant};
