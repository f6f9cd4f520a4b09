//! Geoposition Object Shape
//!
//! `{"Key": "...", "LocalizedName": "...",
//!   "GeoPosition": {"Latitude": .., "Longitude": ..}}`

use crate::error::ParseError;
use readings::{Location, LocationKind};
use serde_json::Value;

/// Parse a geoposition lookup response into a location record.
pub fn parse_geoposition(payload: &[u8]) -> Result<Location, ParseError> {
    let root: Value = serde_json::from_slice(payload)
        .map_err(|e| ParseError::MalformedSyntax(e.to_string()))?;

    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::MalformedSyntax("expected a geoposition object".into()))?;

    let code = obj
        .get("Key")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::missing("Key"))?;

    let display_name = obj
        .get("LocalizedName")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::missing("LocalizedName"))?;

    let position = obj
        .get("GeoPosition")
        .and_then(Value::as_object)
        .ok_or_else(|| ParseError::missing("GeoPosition"))?;

    let latitude = position
        .get("Latitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| ParseError::missing("GeoPosition.Latitude"))?;
    let longitude = position
        .get("Longitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| ParseError::missing("GeoPosition.Longitude"))?;

    Ok(Location {
        code: Some(code.to_string()),
        display_name: display_name.to_string(),
        latitude,
        longitude,
        is_from_live_gps: false,
        kind: LocationKind::Home,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geoposition() {
        let payload = br#"{
            "Key": "318251",
            "LocalizedName": "Kadikoy",
            "GeoPosition": {"Latitude": 40.989, "Longitude": 29.025}
        }"#;
        let loc = parse_geoposition(payload).unwrap();
        assert_eq!(loc.code.as_deref(), Some("318251"));
        assert_eq!(loc.display_name, "Kadikoy");
        assert_eq!(loc.kind, LocationKind::Home);
        assert!((loc.latitude - 40.989).abs() < 1e-9);
    }

    #[test]
    fn test_missing_key() {
        let payload = br#"{"LocalizedName":"X","GeoPosition":{"Latitude":1.0,"Longitude":2.0}}"#;
        let err = parse_geoposition(payload).unwrap_err();
        assert_eq!(err, ParseError::MissingField("Key".to_string()));
    }

    #[test]
    fn test_missing_nested_latitude() {
        let payload = br#"{"Key":"1","LocalizedName":"X","GeoPosition":{"Longitude":2.0}}"#;
        let err = parse_geoposition(payload).unwrap_err();
        assert_eq!(err, ParseError::MissingField("GeoPosition.Latitude".to_string()));
    }

    #[test]
    fn test_array_is_malformed() {
        let err = parse_geoposition(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, ParseError::MalformedSyntax(_)));
    }
}
