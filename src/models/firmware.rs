use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata describing a firmware image to be uploaded for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareMetadata {
    pub name: String,
    pub version: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub vendor_name: String,
    pub product_name: String,
    pub product_category: Option<String>,
    pub product_group_id: Uuid,
    pub analysis_configuration_id: Uuid,
}
