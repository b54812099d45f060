//! Predefined GraphQL query documents bundled with the crate.

use crate::api::{Error, Result};

const GET_SELF: &str = include_str!("get_self.graphql");
const CREATE_FIRMWARE_UPLOAD: &str = include_str!("create_firmware_upload.graphql");
const GET_PRODUCT_GROUPS: &str = include_str!("get_product_groups.graphql");
const GET_ANALYSIS_CONFIGURATIONS: &str = include_str!("get_analysis_configurations.graphql");

/// Look up a bundled GraphQL query by name.
pub fn load_query(name: &str) -> Result<&'static str> {
    match name.strip_suffix(".graphql").unwrap_or(name) {
        "get_self" => Ok(GET_SELF),
        "create_firmware_upload" => Ok(CREATE_FIRMWARE_UPLOAD),
        "get_product_groups" => Ok(GET_PRODUCT_GROUPS),
        "get_analysis_configurations" => Ok(GET_ANALYSIS_CONFIGURATIONS),
        other => Err(Error::UnknownQuery(other.to_string())),
    }
}
