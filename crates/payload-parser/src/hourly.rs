//! Hour-Entry Array Shape
//!
//! `[{"DateTime": "...", "Temperature": {"Value": ..}, "Link": "..."}, ..]`
//! Each entry yields one sample. The temperature value may arrive as a
//! JSON number or a numeric string.

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use readings::{Sample, SourceKind};
use serde_json::Value;
use tracing::debug;

/// Parse a JSON array of hour entries into samples.
///
/// The whole batch parses or the call fails; no partial emission.
pub fn parse_hour_entries(source: SourceKind, payload: &[u8]) -> Result<Vec<Sample>, ParseError> {
    let root: Value = serde_json::from_slice(payload)
        .map_err(|e| ParseError::MalformedSyntax(e.to_string()))?;

    let entries = root
        .as_array()
        .ok_or_else(|| ParseError::MalformedSyntax("expected a JSON array of hour entries".into()))?;

    let mut samples = Vec::with_capacity(entries.len());
    for entry in entries {
        samples.push(parse_entry(source, entry)?);
    }

    debug!("Parsed {} hour entries for {}", samples.len(), source);
    Ok(samples)
}

fn parse_entry(source: SourceKind, entry: &Value) -> Result<Sample, ParseError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| ParseError::MalformedSyntax("hour entry is not an object".into()))?;

    let time_raw = obj
        .get("DateTime")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::missing("DateTime"))?;
    let time = DateTime::parse_from_rfc3339(time_raw)
        .map_err(|e| ParseError::invalid("DateTime", e.to_string()))?
        .with_timezone(&Utc);

    let temperature = obj
        .get("Temperature")
        .ok_or_else(|| ParseError::missing("Temperature"))?;
    let celsius = temperature_value(temperature)?;

    let link = obj
        .get("Link")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::missing("Link"))?;

    Ok(Sample::new(source, time, Some(celsius)).with_reference(link))
}

/// Extract the nested `Temperature.Value` field, accepting either a
/// number or a numeric string.
fn temperature_value(temperature: &Value) -> Result<f64, ParseError> {
    let value = temperature
        .get("Value")
        .ok_or_else(|| ParseError::missing("Temperature.Value"))?;

    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ParseError::invalid("Temperature.Value", "not representable as f64")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| ParseError::invalid("Temperature.Value", e.to_string())),
        other => Err(ParseError::invalid(
            "Temperature.Value",
            format!("unexpected type: {}", other),
        )),
    }
}
