use serde_json::{Map, Value};

use super::{bounded_array, parse_root, MAX_FINGERPRINTS, MAX_RELATED_APPLICATIONS};
use crate::errors::ParseError;
use crate::fingerprint::Fingerprint;

/// Fingerprint type accepted in `fingerprints` entries.
const SHA256_CERT: &str = "sha256_cert";

/// One store entry of a Web App Manifest's `related_applications`.
///
/// The same package may appear in several sections, e.g. once per signing key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebAppManifestSection {
    /// Package identifier (`id`).
    pub package_name: String,
    /// Lowest app version the section vouches for.
    pub min_version: i64,
    /// Accepted signing-certificate fingerprints.
    pub fingerprints: Vec<Fingerprint>,
}

pub(super) fn parse(bytes: &[u8], store_platform: &str) -> Result<Vec<WebAppManifestSection>, ParseError> {
    const FIELD: &str = "related_applications";
    let root = parse_root(bytes)?;
    let related = root
        .get(FIELD)
        .ok_or_else(|| ParseError::MissingField(FIELD.to_string()))?;
    let items = bounded_array(related, FIELD, MAX_RELATED_APPLICATIONS)?;

    let mut sections = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let field = format!("{FIELD}[{index}]");
        let entry = item
            .as_object()
            .ok_or_else(|| ParseError::invalid(&field, "expected an object"))?;

        // Entries for other platforms are not ours to validate.
        if entry.get("platform").and_then(Value::as_str) != Some(store_platform) {
            continue;
        }

        sections.push(parse_section(entry, &field)?);
    }
    Ok(sections)
}

fn parse_section(entry: &Map<String, Value>, field: &str) -> Result<WebAppManifestSection, ParseError> {
    let package_name = match entry.get("id") {
        Some(Value::String(id)) if is_valid_package_name(id) => id.clone(),
        Some(_) => return Err(ParseError::invalid(format!("{field}.id"), "invalid package name")),
        None => return Err(ParseError::MissingField(format!("{field}.id"))),
    };

    let min_version = match entry.get("min_version") {
        Some(value) => parse_version(value)
            .ok_or_else(|| ParseError::invalid(format!("{field}.min_version"), "expected an integer"))?,
        None => return Err(ParseError::MissingField(format!("{field}.min_version"))),
    };

    let fingerprints_field = format!("{field}.fingerprints");
    let raw_fingerprints = entry
        .get("fingerprints")
        .ok_or_else(|| ParseError::MissingField(fingerprints_field.clone()))?;
    let raw_fingerprints = bounded_array(raw_fingerprints, &fingerprints_field, MAX_FINGERPRINTS)?;
    if raw_fingerprints.is_empty() {
        return Err(ParseError::invalid(&fingerprints_field, "must not be empty"));
    }

    let fingerprints = raw_fingerprints
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_fingerprint(raw, &format!("{fingerprints_field}[{index}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WebAppManifestSection {
        package_name,
        min_version,
        fingerprints,
    })
}

fn parse_fingerprint(raw: &Value, field: &str) -> Result<Fingerprint, ParseError> {
    let entry = raw
        .as_object()
        .ok_or_else(|| ParseError::invalid(field, "expected an object"))?;

    match entry.get("type").and_then(Value::as_str) {
        Some(SHA256_CERT) => {}
        Some(other) => {
            return Err(ParseError::invalid(
                format!("{field}.type"),
                format!("unsupported fingerprint type \"{other}\""),
            ))
        }
        None => return Err(ParseError::MissingField(format!("{field}.type"))),
    }

    let value = entry
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField(format!("{field}.value")))?;
    Fingerprint::parse(value).map_err(|reason| ParseError::invalid(format!("{field}.value"), reason))
}

/// `min_version` is published as a decimal string, but plain integers are tolerated.
fn parse_version(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        Value::Number(n) => n.as_i64().filter(|v| *v >= 0),
        _ => None,
    }
}

fn is_valid_package_name(id: &str) -> bool {
    !id.is_empty()
        && id
            .split('.')
            .all(|segment| {
                !segment.is_empty()
                    && segment
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
            })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP_A: &str = "79:5C:8E:4D:57:7B:76:49:3A:0A:0B:93:B9:BE:06:50:CE:E4:75:80:62:65:02:FB:FF:2E:25:8B:61:6C:85:17";
    const FP_B: &str = "AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99";

    fn parse_str(json: &str) -> Result<Vec<WebAppManifestSection>, ParseError> {
        parse(json.as_bytes(), "play")
    }

    fn play_entry(id: &str, version: &str, fingerprint: &str) -> String {
        format!(
            r#"{{"platform": "play", "id": "{id}", "min_version": "{version}",
                "fingerprints": [{{"type": "sha256_cert", "value": "{fingerprint}"}}]}}"#
        )
    }

    #[test]
    fn test_single_section() {
        let json = format!(r#"{{"related_applications": [{}]}}"#, play_entry("com.bobpay", "1", FP_A));
        let sections = parse_str(&json).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].package_name, "com.bobpay");
        assert_eq!(sections[0].min_version, 1);
        assert_eq!(sections[0].fingerprints, vec![Fingerprint::parse(FP_A).unwrap()]);
    }

    #[test]
    fn test_same_package_in_two_sections() {
        let json = format!(
            r#"{{"related_applications": [{}, {}]}}"#,
            play_entry("com.bobpay", "1", FP_A),
            play_entry("com.bobpay", "2", FP_B)
        );
        let sections = parse_str(&json).unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.package_name == "com.bobpay"));
    }

    #[test]
    fn test_other_platforms_are_skipped() {
        let json = format!(
            r#"{{"related_applications": [
                {{"platform": "itunes", "url": "https://itunes.apple.com/app/bobpay"}},
                {{"platform": "webapp"}},
                {}
            ]}}"#,
            play_entry("com.bobpay", "3", FP_A)
        );
        let sections = parse_str(&json).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].min_version, 3);
    }

    #[test]
    fn test_zero_sections_is_valid() {
        assert!(parse_str(r#"{"related_applications": []}"#).unwrap().is_empty());
        assert!(parse_str(r#"{"related_applications": [{"platform": "itunes"}]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_related_applications() {
        assert_eq!(
            parse_str(r#"{"name": "BobPay"}"#).unwrap_err(),
            ParseError::MissingField("related_applications".to_string())
        );
    }

    #[test]
    fn test_malformed_store_entry_rejects_document() {
        let good = play_entry("com.bobpay", "1", FP_A);
        let cases = [
            play_entry("", "1", FP_A),
            play_entry("com..bobpay", "1", FP_A),
            play_entry("com.bobpay", "one", FP_A),
            play_entry("com.bobpay", "-1", FP_A),
            play_entry("com.bobpay", "1", &FP_A.to_lowercase()),
            play_entry("com.bobpay", "1", "AA:BB"),
            r#"{"platform": "play", "id": "com.bobpay", "min_version": "1", "fingerprints": []}"#.to_string(),
            r#"{"platform": "play", "id": "com.bobpay", "fingerprints": []}"#.to_string(),
            format!(
                r#"{{"platform": "play", "id": "com.bobpay", "min_version": "1",
                    "fingerprints": [{{"type": "sha1_cert", "value": "{FP_A}"}}]}}"#
            ),
        ];
        for bad in cases {
            let json = format!(r#"{{"related_applications": [{good}, {bad}]}}"#);
            assert!(parse_str(&json).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn test_numeric_min_version_is_tolerated() {
        let json = format!(
            r#"{{"related_applications": [{{"platform": "play", "id": "com.bobpay", "min_version": 7,
                "fingerprints": [{{"type": "sha256_cert", "value": "{FP_A}"}}]}}]}}"#
        );
        assert_eq!(parse_str(&json).unwrap()[0].min_version, 7);
    }

    #[test]
    fn test_custom_store_platform() {
        let json = format!(
            r#"{{"related_applications": [{}]}}"#,
            play_entry("com.bobpay", "1", FP_A).replace("\"play\"", "\"appgallery\"")
        );
        assert!(parse(json.as_bytes(), "play").unwrap().is_empty());
        assert_eq!(parse(json.as_bytes(), "appgallery").unwrap().len(), 1);
    }
}
