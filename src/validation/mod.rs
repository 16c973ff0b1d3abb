//! Request validation for inbound clinical feature vectors.
//!
//! Presence of the eleven required fields is always checked. Type and
//! domain checks run only when strict validation is enabled; otherwise
//! values reach the engine untouched.

use crate::error::{FieldViolation, PipelineError};
use crate::models::ClinicalFeatureVector;
use serde_json::{Map, Value};
use tracing::debug;

/// Required fields, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 11] = [
    "Age",
    "Sex",
    "ChestPainType",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "RestingECG",
    "MaxHR",
    "ExerciseAngina",
    "Oldpeak",
    "ST_Slope",
];

/// Field the engine no longer accepts; stripped before forwarding.
pub const LEGACY_FIELD: &str = "NumMajorVessels";

/// Accepted domain of a required field.
#[derive(Debug, Clone, Copy)]
enum Domain {
    Range(f64, f64),
    OneOf(&'static [&'static str]),
    /// 0 or 1, given either as a number or a string.
    Flag,
}

fn domain_of(field: &str) -> Option<Domain> {
    let domain = match field {
        "Age" => Domain::Range(0.0, 120.0),
        "Sex" => Domain::OneOf(&["M", "F"]),
        "ChestPainType" => Domain::OneOf(&["ATA", "NAP", "ASY", "TA"]),
        "RestingBP" => Domain::Range(0.0, 300.0),
        "Cholesterol" => Domain::Range(0.0, 1000.0),
        "FastingBS" => Domain::Flag,
        "RestingECG" => Domain::OneOf(&["Normal", "ST", "LVH"]),
        "MaxHR" => Domain::Range(0.0, 300.0),
        "ExerciseAngina" => Domain::OneOf(&["Y", "N"]),
        "Oldpeak" => Domain::Range(-10.0, 10.0),
        "ST_Slope" => Domain::OneOf(&["Up", "Flat", "Down"]),
        _ => return None,
    };
    Some(domain)
}

/// Validator settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Also reject required fields with the wrong type or out-of-range values.
    pub strict: bool,
}

impl From<&crate::config::ValidationConfig> for ValidationOptions {
    fn from(config: &crate::config::ValidationConfig) -> Self {
        Self {
            strict: config.strict,
        }
    }
}

/// Validate a raw request body into a feature vector.
///
/// Reports every missing field at once. A body that is not a JSON object
/// is treated as missing all required fields.
pub fn validate(
    raw: Value,
    options: ValidationOptions,
) -> Result<ClinicalFeatureVector, PipelineError> {
    let mut fields = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let missing = missing_fields(&fields);
    if !missing.is_empty() {
        debug!("Rejecting request, missing fields: {:?}", missing);
        return Err(PipelineError::MissingFields(missing));
    }

    if options.strict {
        let violations = domain_violations(&fields);
        if !violations.is_empty() {
            debug!("Rejecting request, {} invalid fields", violations.len());
            return Err(PipelineError::InvalidFields(violations));
        }
    }

    if fields.remove(LEGACY_FIELD).is_some() {
        debug!("Dropped legacy field {}", LEGACY_FIELD);
    }

    Ok(ClinicalFeatureVector::new(fields))
}

/// Names of required fields that are absent or null.
pub fn missing_fields(fields: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|name| fields.get(**name).map_or(true, Value::is_null))
        .map(|name| name.to_string())
        .collect()
}

fn domain_violations(fields: &Map<String, Value>) -> Vec<FieldViolation> {
    REQUIRED_FIELDS
        .iter()
        .filter_map(|name| {
            let value = fields.get(*name)?;
            let domain = domain_of(name)?;
            check_domain(value, domain).map(|reason| FieldViolation {
                field: name.to_string(),
                reason,
            })
        })
        .collect()
}

fn check_domain(value: &Value, domain: Domain) -> Option<String> {
    match domain {
        Domain::Range(min, max) => match value.as_f64() {
            Some(n) if (min..=max).contains(&n) => None,
            Some(n) => Some(format!("{} is outside {}..={}", n, min, max)),
            None => Some("expected a number".to_string()),
        },
        Domain::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| *a == s) => None,
            _ => Some(format!("expected one of {}", allowed.join(", "))),
        },
        Domain::Flag => {
            let ok = match value {
                Value::Number(n) => n.as_f64().map_or(false, |n| n == 0.0 || n == 1.0),
                Value::String(s) => s == "0" || s == "1",
                _ => false,
            };
            if ok {
                None
            } else {
                Some("expected 0 or 1".to_string())
            }
        }
    }
}
