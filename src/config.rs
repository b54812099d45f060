//! Client configuration and pinned key material.
//!
//! Public keys for identity and tenant token verification, as well as
//! the CA bundle used to pin the platform's TLS certificate, are
//! resolved either from explicit paths supplied by the caller or from
//! resources bundled with the crate, keyed by API host.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::{Error, Result};

/// Audience claim expected in every token issued to this SDK.
pub const CLIENT_ID: &str = "ONEKEY Rust SDK";

/// Issuer namespace; also prefixes the custom claims in identity tokens.
pub const TOKEN_NAMESPACE: &str = "https://www.onekey.com/";

/// Default platform API endpoint.
pub const DEFAULT_API_URL: &str = "https://app.eu.onekey.com/api";

/// Default request timeout in seconds.
/// Firmware analysis queries can be slow; 60s matches the platform's
/// own gateway timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Pinned resources for one platform deployment.
struct BundledKeys {
    id_token_public_key: &'static [u8],
    tenant_token_public_key: &'static [u8],
    ca_bundle: &'static [u8],
}

static DEMO_KEYS: BundledKeys = BundledKeys {
    id_token_public_key: include_bytes!("../keys/demo_id_token_public_key.pem"),
    tenant_token_public_key: include_bytes!("../keys/demo_tenant_token_public_key.pem"),
    ca_bundle: include_bytes!("../keys/ca.pem"),
};

static PLATFORM_KEYS: BundledKeys = BundledKeys {
    id_token_public_key: include_bytes!("../keys/platform_id_token_public_key.pem"),
    tenant_token_public_key: include_bytes!("../keys/platform_tenant_token_public_key.pem"),
    ca_bundle: include_bytes!("../keys/ca.pem"),
};

/// The demo deployment signs with its own key pair; every other host
/// falls through to the production platform keys.
fn bundled_keys(host: &str) -> &'static BundledKeys {
    match host {
        "demo.onekey.com" => &DEMO_KEYS,
        _ => &PLATFORM_KEYS,
    }
}

/// Configuration for a [`Client`](crate::Client).
///
/// All fields besides the API URL are optional; the defaults verify
/// tokens and TLS against material bundled for the configured host.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub id_token_public_key: Option<PathBuf>,
    pub tenant_token_public_key: Option<PathBuf>,
    pub ca_bundle: Option<PathBuf>,
    pub disable_tls_verify: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            id_token_public_key: None,
            tenant_token_public_key: None,
            ca_bundle: None,
            disable_tls_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the identity token verification key.
    pub fn with_id_token_public_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.id_token_public_key = Some(path.into());
        self
    }

    /// Override the tenant token verification key.
    pub fn with_tenant_token_public_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.tenant_token_public_key = Some(path.into());
        self
    }

    /// Pin TLS to the given CA bundle instead of the bundled one.
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Skip server certificate verification. Test deployments only.
    pub fn with_tls_verify_disabled(mut self) -> Self {
        self.disable_tls_verify = true;
        self
    }

    /// Default request timeout applied to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn host(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| Error::InvalidApiUrl(format!("{}: {e}", self.api_url)))?;
        url.host_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::InvalidApiUrl(self.api_url.clone()))
    }

    pub(crate) fn resolve_id_token_key(&self) -> Result<Vec<u8>> {
        match &self.id_token_public_key {
            Some(path) => Ok(std::fs::read(path)?),
            None => Ok(bundled_keys(&self.host()?).id_token_public_key.to_vec()),
        }
    }

    pub(crate) fn resolve_tenant_token_key(&self) -> Result<Vec<u8>> {
        match &self.tenant_token_public_key {
            Some(path) => Ok(std::fs::read(path)?),
            None => Ok(bundled_keys(&self.host()?).tenant_token_public_key.to_vec()),
        }
    }

    /// CA bundle used to pin the server certificate. `None` only when
    /// TLS verification is explicitly disabled.
    pub(crate) fn resolve_ca_bundle(&self) -> Result<Option<Vec<u8>>> {
        if self.disable_tls_verify {
            return Ok(None);
        }
        match &self.ca_bundle {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::InvalidCaBundle);
                }
                std::fs::read(path).map(Some).map_err(|_| Error::InvalidCaBundle)
            }
            None => Ok(Some(bundled_keys(&self.host()?).ca_bundle.to_vec())),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
