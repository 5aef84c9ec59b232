// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drop-file validation and Lead construction.
//!
//! A drop file is a JSON object carrying at minimum `name`, `contact`,
//! `problem`, and a strictly boolean `recovery` flag (legacy producers spell
//! it `rec` or `Rec`, and may upper-case the field names). Everything else
//! in the object is preserved verbatim as the lead's opaque payload; the
//! engine stores and forwards it but never parses it.

use chrono::{DateTime, Utc};
use leadflow_core::{Lead, LeadId, LeadStatus, LeadflowError};
use serde_json::{Map, Value};

/// Parse and validate one drop file into a Lead.
///
/// Returns `LeadflowError::Validation` for anything malformed; the caller
/// logs and skips the file without disturbing the ingestion loop.
pub fn parse_lead(
    raw: &str,
    source_file: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Lead, LeadflowError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LeadflowError::Validation(format!("invalid JSON: {e}")))?;
    let Some(object) = value.as_object() else {
        return Err(LeadflowError::Validation(
            "top-level JSON value must be an object".to_string(),
        ));
    };

    let name = required_string(object, "name")?;
    let contact = required_string(object, "contact")?;
    let problem = required_string(object, "problem")?;
    let recovery = recovery_flag(object)?;
    let address = optional_string(object, "address");

    Ok(Lead {
        id: LeadId::new(),
        name,
        contact,
        problem,
        address,
        recovery,
        payload: Some(value.clone()),
        source_file: source_file.map(|s| s.to_string()),
        status: LeadStatus::Available,
        assigned_agent: None,
        created_at: now,
        assigned_at: None,
        updated_at: now,
    })
}

/// Fetch a field by its canonical name or its upper-case spelling.
fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object
        .get(key)
        .or_else(|| object.get(key.to_uppercase().as_str()))
}

fn required_string(object: &Map<String, Value>, key: &str) -> Result<String, LeadflowError> {
    match field(object, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(LeadflowError::Validation(format!(
            "required field `{key}` is empty"
        ))),
        Some(_) => Err(LeadflowError::Validation(format!(
            "required field `{key}` must be a string"
        ))),
        None => Err(LeadflowError::Validation(format!(
            "required field `{key}` is missing"
        ))),
    }
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    match field(object, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// The category flag must be present and strictly boolean; a string "true"
/// is a producer bug we refuse to guess about.
fn recovery_flag(object: &Map<String, Value>) -> Result<bool, LeadflowError> {
    let value = object
        .get("recovery")
        .or_else(|| object.get("rec"))
        .or_else(|| object.get("Rec"));
    match value {
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(LeadflowError::Validation(
            "field `recovery` must be a boolean".to_string(),
        )),
        None => Err(LeadflowError::Validation(
            "field `recovery` is missing".to_string(),
        )),
    }
}
