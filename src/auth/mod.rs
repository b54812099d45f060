//! Authentication state and token verification.
//!
//! This module provides:
//! - `LoginState`: the mutable session aggregate owned by the client
//! - `verify_token`: JWT verification against a pinned public key,
//!   including nonce replay protection
//!
//! Nothing here performs network I/O; the client drives the protocol.

pub mod session;
pub mod verifier;

pub use session::LoginState;
pub use verifier::{verify_token, TokenClaims};
