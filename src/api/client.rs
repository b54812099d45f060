//! Session manager for the ONEKEY platform API.
//!
//! `Client` owns the session state and drives the two-step login
//! protocol: password authentication yields a signed identity token
//! listing the account's tenants, and selecting a tenant exchanges
//! that identity token for a tenant-scoped token which authenticates
//! every later call. Both exchanges carry a fresh nonce that must be
//! echoed in the returned token's claims.
//!
//! State machine: Anonymous -> Authenticated -> TenantSelected, with
//! `refresh_tenant_token` looping on TenantSelected and `logout`
//! returning to Anonymous from anywhere. `login_with_token` is an
//! alternate initial transition straight to TenantSelected.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{verify_token, LoginState};
use crate::config::{ClientConfig, CLIENT_ID, TOKEN_NAMESPACE};
use crate::models::{FirmwareMetadata, Tenant};
use crate::queries::load_query;

use super::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Password authentication endpoint; yields the identity token.
const AUTHORIZE_PATH: &str = "/authorize";

/// Tenant token exchange endpoint.
const TOKEN_PATH: &str = "/token";

/// Single GraphQL endpoint for all authenticated queries.
const GRAPHQL_PATH: &str = "/graphql";

/// Length of the per-exchange nonce.
/// 32 alphanumeric characters is ~190 bits, plenty for single use.
const NONCE_LENGTH: usize = 32;

/// Multipart field name the upload endpoint expects the image under.
const FIRMWARE_FIELD: &str = "firmware";

/// Client for the ONEKEY platform API.
///
/// One `Client` holds one logical session. State-changing operations
/// take `&mut self`; the type is not internally synchronized, so wrap
/// it in a `Mutex` if you need to share it across tasks. At most one
/// login/selection operation should be in flight at a time.
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    id_token_public_key: Vec<u8>,
    tenant_token_public_key: Vec<u8>,
    default_timeout: Duration,
    state: LoginState,
}

impl Client {
    /// Build a client from the given configuration.
    ///
    /// Resolves the pinned verification keys and CA bundle (explicit
    /// paths win over the resources bundled for the API host) and
    /// constructs the underlying HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let id_token_public_key = config.resolve_id_token_key()?;
        let tenant_token_public_key = config.resolve_tenant_token_key()?;

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        match config.resolve_ca_bundle()? {
            Some(ca) => {
                // A user-supplied bundle may chain several certificates.
                let certs = reqwest::Certificate::from_pem_bundle(&ca)
                    .map_err(|_| Error::InvalidCaBundle)?;
                if certs.is_empty() {
                    return Err(Error::InvalidCaBundle);
                }
                builder = builder.tls_built_in_root_certs(false);
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }
            None => {
                warn!("TLS certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(Self {
            http: builder.build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            id_token_public_key,
            tenant_token_public_key,
            default_timeout: config.timeout,
            state: LoginState::new(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Whether a password login established an identity.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Whether a tenant token is held and authenticated calls work.
    pub fn is_tenant_selected(&self) -> bool {
        self.state.is_tenant_selected()
    }

    // ========================================================================
    // Login protocol
    // ========================================================================

    /// Authenticate with email and password.
    ///
    /// Sends the credentials with a fresh nonce, verifies the returned
    /// identity token against the pinned key and indexes the tenants
    /// from its namespaced custom claim. On success the session is
    /// `Authenticated`; call [`select_tenant`](Self::select_tenant)
    /// next.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let nonce = generate_nonce();
        let payload = json!({
            "email": email,
            "password": password,
            "client_id": CLIENT_ID,
            "nonce": nonce,
        });

        debug!(email = %email, "logging in");
        let response = self
            .post(AUTHORIZE_PATH, HeaderMap::new(), &payload, self.default_timeout)
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::AuthenticationFailed);
        }
        let body: Value = Self::check_response(response).await?.json().await?;

        let raw_id_token = body
            .get("id_token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("missing id_token".into()))?;
        let claims = verify_token(
            &nonce,
            email,
            raw_id_token,
            &self.id_token_public_key,
            TOKEN_NAMESPACE,
            CLIENT_ID,
        )?;

        let listed = claims
            .tenants
            .ok_or_else(|| Error::TokenInvalid("missing tenants claim".into()))?;
        let mut tenants = HashMap::with_capacity(listed.len());
        for tenant in listed {
            if tenants.contains_key(&tenant.name) {
                return Err(Error::DuplicateTenantName(tenant.name));
            }
            tenants.insert(tenant.name.clone(), tenant);
        }

        debug!(tenants = tenants.len(), "login verified");
        self.state.set_identity(email, raw_id_token, tenants);
        Ok(())
    }

    /// Log in with a pre-issued API token of the form
    /// `"<tenant-id>/<secret>"`, skipping the password step.
    ///
    /// The token is stored as the tenant token directly and the
    /// session identity (email, tenant name) is fetched through an
    /// authenticated self-describing query. Tokens obtained this way
    /// cannot be refreshed, as no identity token is held.
    pub async fn login_with_token(&mut self, token: &str) -> Result<()> {
        let tenant_id = parse_api_token(token)?;
        self.state.adopt_api_token(token);

        // Roll back to Anonymous if the identity fetch fails, so a bad
        // token never leaves a half-open session behind.
        match self.fetch_self_identity(tenant_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.reset();
                Err(e)
            }
        }
    }

    async fn fetch_self_identity(&mut self, tenant_id: Uuid) -> Result<()> {
        let data = self.query(load_query("get_self")?, None).await?;
        let email = data
            .pointer("/user/email")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("missing user.email".into()))?;
        let name = data
            .pointer("/tenant/name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("missing tenant.name".into()))?;
        debug!(email = %email, tenant = %name, "token login verified");
        self.state.complete_token_login(
            email,
            Tenant {
                id: tenant_id,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    /// Select the tenant (environment) to work with.
    ///
    /// Exchanges the held identity token for a tenant-scoped token,
    /// verifies it against the pinned tenant key and stores it. The
    /// identity token is retained so the tenant token can be
    /// refreshed later.
    pub async fn select_tenant(&mut self, tenant: &Tenant) -> Result<()> {
        if !self.state.is_authenticated() {
            return Err(Error::NotLoggedIn);
        }
        let email = self
            .state
            .email()
            .ok_or(Error::NotLoggedIn)?
            .to_string();
        let raw_id_token = self
            .state
            .raw_id_token()
            .ok_or(Error::NotLoggedIn)?
            .to_string();

        let nonce = generate_nonce();
        let payload = json!({
            "id_token": raw_id_token,
            "client_id": CLIENT_ID,
            "tenant_id": tenant.id.to_string(),
            "nonce": nonce,
        });

        debug!(tenant = %tenant.name, "selecting tenant");
        let body = self
            .post_json(TOKEN_PATH, HeaderMap::new(), &payload, self.default_timeout)
            .await?;
        let raw_tenant_token = body
            .get("tenant_token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("missing tenant_token".into()))?;
        verify_token(
            &nonce,
            &email,
            raw_tenant_token,
            &self.tenant_token_public_key,
            TOKEN_NAMESPACE,
            CLIENT_ID,
        )?;

        self.state.select_tenant(tenant.clone(), raw_tenant_token);
        Ok(())
    }

    /// Obtain a fresh tenant token for the currently selected tenant.
    ///
    /// Fails with [`Error::RefreshUnavailable`] when the session was
    /// opened with [`login_with_token`](Self::login_with_token), which
    /// never holds an identity token.
    pub async fn refresh_tenant_token(&mut self) -> Result<()> {
        if !self.state.is_tenant_selected() {
            return Err(Error::TenantNotSelected);
        }
        if self.state.raw_id_token().is_none() {
            return Err(Error::RefreshUnavailable);
        }
        let tenant = self
            .state
            .tenant()
            .cloned()
            .ok_or(Error::TenantNotSelected)?;
        self.select_tenant(&tenant).await
    }

    /// Drop the session, discarding all tokens. Safe from any state.
    pub fn logout(&mut self) {
        self.state.reset();
        debug!("logged out");
    }

    // ========================================================================
    // Tenant accessors
    // ========================================================================

    /// Get a tenant by name.
    pub fn get_tenant(&self, name: &str) -> Result<&Tenant> {
        if !self.state.is_authenticated() {
            return Err(Error::NotLoggedIn);
        }
        self.state
            .tenants()
            .get(name)
            .ok_or_else(|| Error::TenantNotFound(name.to_string()))
    }

    /// Get the list of tenants this account may use.
    pub fn get_all_tenants(&self) -> Result<Vec<Tenant>> {
        if !self.state.is_authenticated() {
            return Err(Error::NotLoggedIn);
        }
        Ok(self.state.tenants().values().cloned().collect())
    }

    /// Currently selected tenant, if any.
    pub fn selected_tenant(&self) -> Option<&Tenant> {
        self.state.tenant()
    }

    // ========================================================================
    // Authenticated dispatch
    // ========================================================================

    /// Bearer headers for authenticated calls.
    pub fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .state
            .raw_tenant_token()
            .ok_or(Error::TenantNotSelected)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::TokenInvalid("token is not a valid header value".into()))?,
        );
        Ok(headers)
    }

    /// Issue a GraphQL query and return the `data` field.
    ///
    /// A server-reported `errors` envelope is surfaced verbatim as
    /// [`Error::Query`].
    pub async fn query(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        self.query_with_timeout(query, variables, self.default_timeout)
            .await
    }

    /// [`query`](Self::query) with a per-call timeout.
    pub async fn query_with_timeout(
        &self,
        query: &str,
        variables: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let response = self.post_with_token(GRAPHQL_PATH, &body, timeout).await?;

        if let Some(errors) = response.get("errors") {
            return Err(Error::Query(as_error_list(errors)));
        }
        response
            .get("data")
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("missing data field".into()))
    }

    /// Upload a firmware image for analysis.
    ///
    /// Runs the `create_firmware_upload` mutation, then streams the
    /// file to the returned upload URL as an authenticated multipart
    /// request.
    pub async fn upload_firmware(
        &self,
        metadata: &FirmwareMetadata,
        path: &Path,
        enable_monitoring: bool,
    ) -> Result<Value> {
        let variables = json!({
            "firmware": {
                "name": metadata.name,
                "version": metadata.version,
                "releaseDate": metadata.release_date.map(|d| d.to_rfc3339()),
                "notes": metadata.notes,
                "enableMonitoring": enable_monitoring,
                "analysisConfigurationId": metadata.analysis_configuration_id.to_string(),
            },
            "vendorName": metadata.vendor_name,
            "productName": metadata.product_name,
            "productCategory": metadata.product_category,
            "productGroupID": metadata.product_group_id.to_string(),
        });

        let data = self
            .query(load_query("create_firmware_upload")?, Some(variables))
            .await?;
        let upload = data
            .get("createFirmwareUpload")
            .ok_or_else(|| Error::UnexpectedResponse("missing createFirmwareUpload".into()))?;
        match upload.get("errors") {
            Some(errors) if !errors.is_null() => {
                let errors = as_error_list(errors);
                if !errors.is_empty() {
                    return Err(Error::Query(errors));
                }
            }
            _ => {}
        }
        let upload_url = upload
            .get("uploadUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("missing uploadUrl".into()))?;

        debug!(url = %upload_url, file = %path.display(), "uploading firmware");
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "firmware.bin".to_string());
        let form = multipart::Form::new()
            .part(FIRMWARE_FIELD, multipart::Part::bytes(bytes).file_name(file_name));

        let headers = self.auth_headers()?;
        let response = self
            .http
            .post(self.absolute_url(upload_url))
            .headers(headers)
            .multipart(form)
            .timeout(self.default_timeout)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Map of product group name to id.
    pub async fn get_product_groups(&self) -> Result<HashMap<String, String>> {
        let data = self.query(load_query("get_product_groups")?, None).await?;
        collect_name_id_map(&data, "allProductGroups")
    }

    /// Map of analysis configuration name to id.
    pub async fn get_analysis_configurations(&self) -> Result<HashMap<String, String>> {
        let data = self
            .query(load_query("get_analysis_configurations")?, None)
            .await?;
        collect_name_id_map(&data, "allAnalysisConfigurations")
    }

    // ========================================================================
    // HTTP plumbing
    // ========================================================================

    fn absolute_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.api_url, path_or_url)
        }
    }

    async fn post(
        &self,
        path_or_url: &str,
        headers: HeaderMap,
        body: &Value,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        let url = self.absolute_url(path_or_url);
        debug!(url = %url, "POST");
        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        Ok(response)
    }

    async fn post_json(
        &self,
        path_or_url: &str,
        headers: HeaderMap,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value> {
        let response = self.post(path_or_url, headers, body, timeout).await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn post_with_token(
        &self,
        path_or_url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value> {
        // Precondition check happens before anything touches the wire.
        let headers = self.auth_headers()?;
        self.post_json(path_or_url, headers, body, timeout).await
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Error::from_status(status, &body))
        }
    }
}

/// Fresh single-use nonce bound into a signed exchange.
fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Extract the tenant id prefix from an API token
/// (`"<tenant-id>/<secret>"`).
fn parse_api_token(token: &str) -> Result<Uuid> {
    let (tenant_id, _secret) = token.split_once('/').ok_or(Error::InvalidApiToken)?;
    tenant_id.parse().map_err(|_| Error::InvalidApiToken)
}

fn as_error_list(errors: &Value) -> Vec<Value> {
    match errors.as_array() {
        Some(list) => list.clone(),
        None => vec![errors.clone()],
    }
}

fn collect_name_id_map(data: &Value, field: &str) -> Result<HashMap<String, String>> {
    let entries = data
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::UnexpectedResponse(format!("missing {field}")))?;
    let mut map = HashMap::with_capacity(entries.len());
    for entry in entries {
        let name = entry.get("name").and_then(Value::as_str);
        let id = entry.get("id").and_then(Value::as_str);
        if let (Some(name), Some(id)) = (name, id) {
            map.insert(name.to_string(), id.to_string());
        }
    }
    Ok(map)
}
