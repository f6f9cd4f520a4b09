//! Delimited Sensor Line Shape
//!
//! The LAN sensors publish lines like `"V12.4;T19.5|"`: key-prefixed
//! fields separated by semicolons, terminated by a pipe. `T` carries the
//! temperature; other keys are tolerated and ignored. Sensors report no
//! timestamp, so the arrival time is used.

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use readings::{Sample, SourceKind};

/// Parse one delimited sensor line into a sample.
pub fn parse_sensor_line(
    source: SourceKind,
    payload: &[u8],
    arrival: DateTime<Utc>,
) -> Result<Sample, ParseError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| ParseError::MalformedSyntax("sensor line is not valid UTF-8".into()))?
        .trim();

    let body = text
        .strip_suffix('|')
        .ok_or_else(|| ParseError::MalformedSyntax("sensor line missing '|' terminator".into()))?;

    if body.is_empty() {
        return Err(ParseError::MalformedSyntax("empty sensor line".into()));
    }

    let mut celsius = None;
    for field in body.split(';') {
        let mut chars = field.chars();
        let key = chars
            .next()
            .ok_or_else(|| ParseError::MalformedSyntax("empty field in sensor line".into()))?;
        let raw = chars.as_str();

        if !key.is_ascii_alphabetic() {
            return Err(ParseError::MalformedSyntax(format!(
                "field key {:?} is not alphabetic",
                key
            )));
        }

        if key == 'T' {
            let value = raw
                .parse::<f64>()
                .map_err(|e| ParseError::invalid("T", e.to_string()))?;
            celsius = Some(value);
        }
    }

    let celsius = celsius.ok_or_else(|| ParseError::missing("T"))?;
    Ok(Sample::new(source, arrival, Some(celsius)))
}
