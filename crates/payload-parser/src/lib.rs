//! Payload Parsing
//!
//! Converts heterogeneous raw payloads into typed records. Three shapes
//! are understood: a JSON array of hour entries, a JSON geoposition
//! object, and the sensors' delimited line format `"V<v>;T<v>|"`.
//! Parsing is all-or-nothing: a batch either fully parses or the call
//! fails and nothing is emitted.

mod error;
mod hourly;
mod position;
mod sensor;

pub use error::ParseError;
pub use hourly::parse_hour_entries;
pub use position::parse_geoposition;
pub use sensor::parse_sensor_line;

use chrono::Utc;
use readings::{Sample, SourceKind};

/// Parse a raw sample payload for the given source.
///
/// Remote weather sources always carry the JSON hour-entry shape. The
/// sensor sources publish either JSON or the delimited line form, so
/// both are tolerated there.
pub fn parse_samples(source: SourceKind, payload: &[u8]) -> Result<Vec<Sample>, ParseError> {
    if source.is_remote_weather() {
        return parse_hour_entries(source, payload);
    }

    // Sensor feeds: JSON when the payload looks like JSON, otherwise the
    // delimited line format.
    match payload.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') | Some(b'{') => parse_hour_entries(source, payload),
        _ => parse_sensor_line(source, payload, Utc::now()).map(|s| vec![s]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sensor_payload_tolerates_json() {
        let payload = br#"[{"DateTime":"2024-01-01T00:00:00Z","Temperature":{"Value":21.5},"Link":"http://x"}]"#;
        let samples = parse_samples(SourceKind::LocalSensorHourly, payload).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].celsius, Some(21.5));
    }

    #[test]
    fn test_sensor_payload_tolerates_delimited_line() {
        let samples = parse_samples(SourceKind::LocalSensorInstant, b"V12.0;T19.5|").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].celsius, Some(19.5));
    }

    proptest! {
        // Arbitrary bytes must be rejected or parsed, never panic.
        #[test]
        fn test_parse_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            for source in SourceKind::ALL {
                let _ = parse_samples(source, &payload);
            }
            let _ = parse_geoposition(&payload);
        }
    }
}
