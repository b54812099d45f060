use std::collections::HashMap;

use zeroize::Zeroize;

use crate::models::Tenant;

/// Authentication artifacts held between calls.
///
/// Lifecycle: `set_identity` after password login, `select_tenant`
/// after the tenant token exchange, `reset` on logout. Tokens are
/// zeroized on reset rather than left to drop timing.
///
/// Invariants:
/// - `tenants` is non-empty only after a successful login.
/// - `raw_tenant_token` is set only after a tenant token was obtained.
/// - At most one tenant is selected at a time.
#[derive(Debug, Default)]
pub struct LoginState {
    email: Option<String>,
    tenants: HashMap<String, Tenant>,
    raw_id_token: Option<String>,
    raw_tenant_token: Option<String>,
    tenant: Option<Tenant>,
}

impl LoginState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field back to the unauthenticated default.
    /// Token material is overwritten before being dropped.
    pub fn reset(&mut self) {
        if let Some(token) = self.raw_id_token.as_mut() {
            token.zeroize();
        }
        if let Some(token) = self.raw_tenant_token.as_mut() {
            token.zeroize();
        }
        *self = Self::default();
    }

    /// Record a successful password authentication.
    pub fn set_identity(
        &mut self,
        email: impl Into<String>,
        raw_id_token: impl Into<String>,
        tenants: HashMap<String, Tenant>,
    ) {
        self.email = Some(email.into());
        self.raw_id_token = Some(raw_id_token.into());
        self.tenants = tenants;
    }

    /// Record a successful tenant token exchange.
    pub fn select_tenant(&mut self, tenant: Tenant, raw_tenant_token: impl Into<String>) {
        self.raw_tenant_token = Some(raw_tenant_token.into());
        self.tenant = Some(tenant);
    }

    /// Store a pre-issued API token before the owning identity is known.
    /// `complete_token_login` fills in the rest once the self query ran.
    pub fn adopt_api_token(&mut self, raw_tenant_token: impl Into<String>) {
        self.raw_tenant_token = Some(raw_tenant_token.into());
    }

    /// Finish a token login with the identity fetched from the server.
    pub fn complete_token_login(&mut self, email: impl Into<String>, tenant: Tenant) {
        self.email = Some(email.into());
        self.tenants = HashMap::from([(tenant.name.clone(), tenant.clone())]);
        self.tenant = Some(tenant);
    }

    /// Whether a password login established an identity.
    pub fn is_authenticated(&self) -> bool {
        !self.tenants.is_empty()
    }

    /// Whether a tenant token is held (authenticated calls possible).
    pub fn is_tenant_selected(&self) -> bool {
        self.raw_tenant_token.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn tenants(&self) -> &HashMap<String, Tenant> {
        &self.tenants
    }

    pub fn raw_id_token(&self) -> Option<&str> {
        self.raw_id_token.as_deref()
    }

    pub fn raw_tenant_token(&self) -> Option<&str> {
        self.raw_tenant_token.as_deref()
    }

    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }
}
