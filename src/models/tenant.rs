use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An isolated customer environment within the ONEKEY platform.
///
/// Tenants are produced by server responses (the identity token carries
/// the list of tenants the account may use) and are looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
}
