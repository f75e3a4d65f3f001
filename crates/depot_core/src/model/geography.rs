//! Geography entities, boundary request and aggregate response.
//!
//! # Responsibility
//! - Define Country, Province and Locality records as persisted.
//! - Validate decoded request input once, before it reaches the service.
//!
//! # Invariants
//! - `NewLocality` only exists with four present, non-blank fields.
//! - Name matching for Country/Province goes through [`name_key`].

use crate::error::{AppError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a country.
pub type CountryId = i64;
/// Store-assigned identifier of a province.
pub type ProvinceId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub id: CountryId,
    /// Name as given on first creation.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Province {
    pub id: ProvinceId,
    pub name: String,
    pub country_id: CountryId,
}

/// Leaf of the hierarchy, addressed by a caller-controlled code (for
/// example a postal code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locality {
    pub id: String,
    pub name: String,
    pub province_id: ProvinceId,
}

/// Locality creation request as decoded from an inbound body.
///
/// Every field is optional at this stage; call [`RequestGeography::validate`]
/// to obtain the plain values the service accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestGeography {
    pub id: Option<String>,
    pub country_name: Option<String>,
    pub province_name: Option<String>,
    pub locality_name: Option<String>,
}

impl RequestGeography {
    /// Checks presence of all four fields.
    ///
    /// Names are trimmed; the locality id is stored verbatim and only
    /// rejected when blank.
    ///
    /// # Errors
    /// - `UnprocessableEntity` listing every missing or blank field.
    pub fn validate(self) -> Result<NewLocality, AppError> {
        let mut missing = Vec::new();
        let locality_id = required(self.id, "id", &mut missing);
        let country_name = required_name(self.country_name, "country_name", &mut missing);
        let province_name = required_name(self.province_name, "province_name", &mut missing);
        let locality_name = required_name(self.locality_name, "locality_name", &mut missing);

        match (locality_id, country_name, province_name, locality_name) {
            (Some(locality_id), Some(country_name), Some(province_name), Some(locality_name)) => {
                Ok(NewLocality {
                    locality_id,
                    country_name,
                    province_name,
                    locality_name,
                })
            }
            _ => Err(AppError::new(
                ErrorKind::UnprocessableEntity,
                "missing required geography fields",
            )
            .with_detail(missing.join(","))),
        }
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => {
            missing.push(field);
            None
        }
    }
}

fn required_name(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    required(value, field, missing).map(|name| name.trim().to_string())
}

/// Validated input of a locality creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocality {
    pub locality_id: String,
    pub country_name: String,
    pub province_name: String,
    pub locality_name: String,
}

/// Flat view of one locality and its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseGeography {
    pub locality_id: String,
    pub locality_name: String,
    pub province_name: String,
    pub country_name: String,
}

/// Normalized key used for case-insensitive name matching.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}
