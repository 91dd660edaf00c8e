//! Fingerprint command - hash a signing certificate

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use payfinder_lib::Fingerprint;

use crate::ui;

/// SHA-256 fingerprint of the DER certificate stored at `path`.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let certificate =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if certificate.is_empty() {
        return Err(anyhow!("{} is empty", path.display()));
    }
    Ok(Fingerprint::of_certificate(&certificate))
}

pub fn run(path: &Path, expected: Option<&str>, verbose: bool) -> Result<()> {
    let fingerprint = fingerprint_file(path)?;
    tracing::debug!(path = %path.display(), %fingerprint, "computed fingerprint");

    if verbose {
        ui::key_value("certificate", &path.display().to_string());
    }
    println!("{}", fingerprint);

    if let Some(expected) = expected {
        let expected = Fingerprint::parse(expected)
            .map_err(|reason| anyhow!("Invalid expected fingerprint: {reason}"))?;
        if expected != fingerprint {
            return Err(anyhow!("Fingerprint mismatch: expected {expected}"));
        }
        ui::success("Fingerprint matches");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fingerprint_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"certificate bytes").unwrap();

        assert_eq!(
            fingerprint_file(file.path()).unwrap(),
            Fingerprint::of_certificate(b"certificate bytes")
        );
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(fingerprint_file(file.path()).is_err());
    }

    #[test]
    fn test_expected_fingerprint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"certificate bytes").unwrap();
        let actual = Fingerprint::of_certificate(b"certificate bytes").to_string();
        let other = Fingerprint::of_certificate(b"other").to_string();

        assert!(run(file.path(), Some(&actual), false).is_ok());
        assert!(run(file.path(), Some(&other), false).is_err());
        assert!(run(file.path(), Some("zz"), false).is_err());
    }
}
