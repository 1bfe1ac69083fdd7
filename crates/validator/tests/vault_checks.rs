//! Vault transit checks against a mock Vault server.

mod common;

use base64::{engine::general_purpose, Engine as _};
use common::{check_context, find_check, ContextOptions};
use grill_validator::checks::execute;
use grill_validator::checks::security::{TRANSIT_KEY, TRANSIT_PROBE};
use harness::{CheckStatus, Suite};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn transit_roundtrip_passes_when_decrypt_matches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/encrypt/{TRANSIT_KEY}")))
        .and(header("X-Vault-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "ciphertext": "vault:v1:ZmFrZQ==" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/decrypt/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "plaintext": general_purpose::STANDARD.encode(TRANSIT_PROBE) }
        })))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-transit").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Pass, "{}", result.details);
    assert!(result.details.contains(TRANSIT_KEY));
}

#[tokio::test]
async fn transit_mismatch_is_a_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/encrypt/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "ciphertext": "vault:v1:ZmFrZQ==" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/decrypt/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "plaintext": general_purpose::STANDARD.encode(b"something else") }
        })))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-transit").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Fail);
    assert!(result.details.contains("does not match"), "{}", result.details);
}

#[tokio::test]
async fn vault_checks_skip_without_credentials() {
    let ctx = check_context(ContextOptions::default()).await;
    assert!(ctx.vault.is_none());

    for name in ["vault-transit", "vault-key-rotation"] {
        let result = execute(find_check(Suite::Security, name).as_ref(), &ctx).await;
        assert_eq!(result.status, CheckStatus::Skip, "{name}");
        assert!(result.details.contains("not set"));
    }
}

#[tokio::test]
async fn rotation_enabled_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "latest_version": 4, "auto_rotate_period": 7_776_000 }
        })))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-key-rotation").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Pass, "{}", result.details);
    assert!(result.details.contains("v4"));
}

#[tokio::test]
async fn rotation_disabled_rotates_by_hand_and_stays_conditional() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "latest_version": 1, "auto_rotate_period": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}/rotate")))
        .and(header("X-Vault-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "latest_version": 2, "auto_rotate_period": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-key-rotation").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Conditional, "{}", result.details);
    assert!(result.details.contains("auto-rotation disabled"));
    assert!(result.details.contains("v2"), "{}", result.details);
}

#[tokio::test]
async fn rotation_without_a_body_is_still_conditional() {
    // Older Vault servers answer the rotate with 204 and no key data.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "latest_version": 1, "auto_rotate_period": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}/rotate")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-key-rotation").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Conditional, "{}", result.details);
    assert!(result.details.contains("manual rotation accepted"));
}

#[tokio::test]
async fn denied_manual_rotation_is_a_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "latest_version": 1, "auto_rotate_period": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}/rotate")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-key-rotation").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Fail);
    assert!(result.details.contains("rotating"), "{}", result.details);
}

#[tokio::test]
async fn unreadable_key_is_a_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/transit/keys/{TRANSIT_KEY}")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ctx = check_context(ContextOptions {
        vault_url: Some(&server.uri()),
        ..ContextOptions::default()
    })
    .await;

    let result = execute(find_check(Suite::Security, "vault-key-rotation").as_ref(), &ctx).await;
    assert_eq!(result.status, CheckStatus::Fail);
}
