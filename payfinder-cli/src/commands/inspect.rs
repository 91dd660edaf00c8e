//! Inspect commands - run the manifest parsers on local files

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use payfinder_lib::{ManifestParser, OriginSet, PaymentMethodManifest, WebAppManifestSection};
use url::Url;

use super::CliConfig;
use crate::ui;

/// Parse a Payment Method Manifest file as if it had been served for `url`.
pub fn parse_method_manifest_file(
    path: &Path,
    url: &str,
    parser: &ManifestParser,
) -> Result<PaymentMethodManifest> {
    let url = Url::parse(url).with_context(|| format!("Invalid method URL \"{url}\""))?;
    let bytes = read(path)?;
    parser
        .parse_payment_method_manifest(&url, &bytes)
        .map_err(|e| anyhow!("{}: {e}", path.display()))
}

/// Parse a Web App Manifest file.
pub fn parse_web_app_manifest_file(
    path: &Path,
    parser: &ManifestParser,
) -> Result<Vec<WebAppManifestSection>> {
    let bytes = read(path)?;
    parser
        .parse_web_app_manifest(&bytes)
        .map_err(|e| anyhow!("{}: {e}", path.display()))
}

pub fn method_manifest(path: &Path, url: &str, config: &CliConfig) -> Result<()> {
    ui::header("Payment Method Manifest");
    let manifest = parse_method_manifest_file(path, url, &config.finder.parser())?;

    ui::success(&format!("Valid manifest for {}", manifest.url));
    ui::key_value("default_applications", &manifest.default_applications.len().to_string());
    for app in &manifest.default_applications {
        println!("    {}", app);
    }

    match &manifest.supported_origins {
        OriginSet::None if manifest.wildcard_origins => {
            ui::key_value("supported_origins", "\"*\" (ignored)");
        }
        OriginSet::None => ui::key_value("supported_origins", "none"),
        OriginSet::Explicit(origins) => {
            ui::key_value("supported_origins", &origins.len().to_string());
            for origin in origins {
                println!("    {}", origin);
            }
        }
    }
    Ok(())
}

pub fn web_app_manifest(path: &Path, config: &CliConfig) -> Result<()> {
    ui::header("Web App Manifest");
    let parser = config.finder.parser();
    let sections = parse_web_app_manifest_file(path, &parser)?;

    if sections.is_empty() {
        ui::warning(&format!("No \"{}\" applications listed", parser.store_platform));
        return Ok(());
    }

    ui::success(&format!("Found {} application section(s)", sections.len()));
    for section in &sections {
        ui::separator();
        ui::key_value("id", &section.package_name);
        ui::key_value("min_version", &section.min_version.to_string());
        for fingerprint in &section.fingerprints {
            ui::key_value("sha256_cert", &fingerprint.to_string());
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use payfinder_lib::{Fingerprint, UrlPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_method_manifest_file() {
        let file = file_with(
            r#"{
                "default_applications": ["https://bobpay.com/app.json"],
                "supported_origins": ["https://alicepay.com"]
            }"#,
        );
        let parser = ManifestParser::new(UrlPolicy::strict());
        let manifest =
            parse_method_manifest_file(file.path(), "https://bobpay.com/webpay", &parser).unwrap();

        assert_eq!(manifest.default_applications.len(), 1);
        assert_eq!(manifest.supported_origins.len(), 1);
    }

    #[test]
    fn test_method_manifest_file_rejects_bad_url() {
        let file = file_with("{}");
        let parser = ManifestParser::new(UrlPolicy::strict());
        assert!(parse_method_manifest_file(file.path(), "not a url", &parser).is_err());
    }

    #[test]
    fn test_web_app_manifest_file() {
        let cert = Fingerprint::of_certificate(b"bobpay");
        let file = file_with(&format!(
            r#"{{
                "related_applications": [{{
                    "platform": "play",
                    "id": "com.bobpay",
                    "min_version": "2",
                    "fingerprints": [{{ "type": "sha256_cert", "value": "{cert}" }}]
                }}]
            }}"#
        ));
        let sections =
            parse_web_app_manifest_file(file.path(), &ManifestParser::new(UrlPolicy::strict()))
                .unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].package_name, "com.bobpay");
        assert_eq!(sections[0].min_version, 2);
        assert_eq!(sections[0].fingerprints, vec![cert]);
    }

    #[test]
    fn test_malformed_web_app_manifest_names_the_file() {
        let file = file_with("{\"related_applications\": 5}");
        let err = parse_web_app_manifest_file(file.path(), &ManifestParser::new(UrlPolicy::strict()))
            .unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
