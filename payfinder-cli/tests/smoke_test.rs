//! Smoke tests for payfinder-cli
//!
//! These tests run the binary against local files only; no manifest is ever
//! downloaded.

mod common;

use common::{payfinder, stdout, TestContext};
use payfinder_lib::{CandidateApp, Fingerprint};

#[test]
fn test_cli_help() {
    let output = payfinder(&["--help"]);
    assert!(output.status.success());

    let help = stdout(&output);
    for command in [
        "resolve",
        "inspect-method-manifest",
        "inspect-web-app-manifest",
        "fingerprint",
    ] {
        assert!(help.contains(command), "help should mention {command}");
    }
}

#[test]
fn test_cli_version() {
    let output = payfinder(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("payfinder"));
}

#[test]
fn test_fingerprint_command() {
    let ctx = TestContext::new();
    let cert = ctx.write("cert.der", b"release certificate");

    let output = payfinder(&["fingerprint", cert.to_str().unwrap()]);
    assert!(output.status.success());

    let expected = Fingerprint::of_certificate(b"release certificate").to_string();
    assert_eq!(stdout(&output).trim(), expected);

    let mismatch = Fingerprint::of_certificate(b"other").to_string();
    let output = payfinder(&["fingerprint", cert.to_str().unwrap(), "--expect", &mismatch]);
    assert!(!output.status.success());
}

#[test]
fn test_inspect_method_manifest() {
    let ctx = TestContext::new();
    let manifest = ctx.write(
        "pmm.json",
        r#"{
            "default_applications": ["https://bobpay.com/app.json"],
            "supported_origins": ["https://alicepay.com"]
        }"#,
    );

    let output = payfinder(&[
        "inspect-method-manifest",
        manifest.to_str().unwrap(),
        "--url",
        "https://bobpay.com/webpay",
    ]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("https://bobpay.com/app.json"));
    assert!(out.contains("https://alicepay.com"));
}

#[test]
fn test_inspect_rejects_http_default_application() {
    let ctx = TestContext::new();
    let manifest = ctx.write(
        "pmm.json",
        r#"{ "default_applications": ["http://bobpay.com/app.json"] }"#,
    );

    let output = payfinder(&[
        "inspect-method-manifest",
        manifest.to_str().unwrap(),
        "--url",
        "https://bobpay.com/webpay",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_inspect_web_app_manifest() {
    let ctx = TestContext::new();
    let cert = Fingerprint::of_certificate(b"bobpay");
    let manifest = ctx.write(
        "app.json",
        serde_json::json!({
            "related_applications": [{
                "platform": "play",
                "id": "com.bobpay",
                "min_version": "1",
                "fingerprints": [{ "type": "sha256_cert", "value": cert.to_string() }],
            }],
        })
        .to_string(),
    );

    let output = payfinder(&["inspect-web-app-manifest", manifest.to_str().unwrap()]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("com.bobpay"));
    assert!(out.contains(&cert.to_string()));
}

#[test]
fn test_resolve_locally_granted_methods() {
    let ctx = TestContext::new();
    let cert = Fingerprint::of_certificate(b"bobpay");
    let registry = ctx.write_registry(&[
        CandidateApp::new("com.bobpay", 1)
            .with_label("BobPay")
            .with_default_method("https://bobpay.com/webpay")
            .with_supported_method("basic-card")
            .with_declared_fingerprint(cert)
            .with_signing_fingerprint(cert),
        CandidateApp::new("com.unrelated", 1).with_supported_method("interledger"),
    ]);

    let output = payfinder(&[
        "resolve",
        "--registry",
        registry.to_str().unwrap(),
        "--merchant",
        "https://shop.example",
        "--method",
        "basic-card",
        "--method",
        "https://bobpay.com/webpay",
        "--json",
    ]);
    assert!(output.status.success());

    let outcome: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(outcome["status"], "completed");

    let apps = outcome["apps"].as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["app"]["package_name"], "com.bobpay");
    assert_eq!(apps[0]["methods"]["basic-card"]["kind"], "self_declared");
    assert_eq!(
        apps[0]["methods"]["https://bobpay.com/webpay"]["kind"],
        "self_declared"
    );
    assert_eq!(outcome["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn test_resolve_rejects_insecure_merchant() {
    let ctx = TestContext::new();
    let registry = ctx.write_registry(&[]);

    let output = payfinder(&[
        "resolve",
        "--registry",
        registry.to_str().unwrap(),
        "--merchant",
        "http://shop.example",
        "--method",
        "basic-card",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_config_file_is_loaded() {
    let ctx = TestContext::new();
    let config = ctx.write("config.json", "not json");
    let cert = ctx.write("cert.der", b"certificate");

    let output = payfinder(&[
        "--config",
        config.to_str().unwrap(),
        "fingerprint",
        cert.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
}
