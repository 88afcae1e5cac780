//! Configuration decoder
//!
//! Parses the configuration blobs into [`ServiceSpec`] and [`PlanSpec`] values.
//! No cross-validation happens here; the registry owns every invariant.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{null_as_default, PlanMetadata, PlanSpec, ServiceSpec};
use crate::config::CatalogSource;
use crate::error::DecodeError;

/// Flat plan shape used by the custom-plan blob
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CustomPlanSpec {
    #[serde(deserialize_with = "null_as_default")]
    guid: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "null_as_default")]
    service: String,
    #[serde(deserialize_with = "null_as_default")]
    host: String,
    #[serde(deserialize_with = "null_as_default")]
    port: i64,
    #[serde(deserialize_with = "null_as_default")]
    ssl_mode: String,
    #[serde(deserialize_with = "null_as_default")]
    ssl_client_cert: String,
    #[serde(deserialize_with = "null_as_default")]
    ssl_client_key: String,
    #[serde(deserialize_with = "null_as_default")]
    ssl_ca_cert: String,
}

impl From<CustomPlanSpec> for PlanSpec {
    fn from(custom: CustomPlanSpec) -> Self {
        PlanSpec {
            id: custom.guid,
            name: custom.name,
            description: custom.description,
            metadata: Some(PlanMetadata {
                display_name: custom.display_name,
                ..Default::default()
            }),
            service_id: custom.service,
            host: custom.host,
            port: custom.port.to_string(),
            ssl_mode: custom.ssl_mode,
            ssl_client_cert: custom.ssl_client_cert,
            ssl_client_key: custom.ssl_client_key,
            ssl_ca_cert: custom.ssl_ca_cert,
            ..Default::default()
        }
    }
}

fn decode<T: DeserializeOwned>(source: CatalogSource, json: &str) -> Result<T, DecodeError> {
    serde_json::from_str(json).map_err(|error| DecodeError::Malformed {
        source_name: source,
        error,
    })
}

/// Decode the services blob, which must be present
pub fn decode_services(json: Option<&str>) -> Result<Vec<ServiceSpec>, DecodeError> {
    let json = json.ok_or(DecodeError::MissingServices)?;
    decode(CatalogSource::Services, json)
}

/// Decode the preconfigured-plans blob. An absent blob yields no plans.
pub fn decode_preconfigured_plans(json: Option<&str>) -> Result<Vec<PlanSpec>, DecodeError> {
    match json {
        Some(json) => decode(CatalogSource::PreconfiguredPlans, json),
        None => Ok(Vec::new()),
    }
}

/// Decode the custom-plans blob, ordered by ascending key.
///
/// The keys only fix the order; they are not plan ids.
pub fn decode_custom_plans(json: Option<&str>) -> Result<Vec<PlanSpec>, DecodeError> {
    let Some(json) = json else {
        return Ok(Vec::new());
    };

    let plans: BTreeMap<String, CustomPlanSpec> = decode(CatalogSource::CustomPlans, json)?;
    Ok(plans.into_values().map(PlanSpec::from).collect())
}
