//! End-to-end auth flows against a mock FoodShare service.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials_file(home: &Path) -> std::path::PathBuf {
    home.join("credentials.json")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_whoami_logout_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-reg",
            "token_type": "bearer",
            "user": { "name": "Ann", "email": "ann@x.com", "role": "donor" },
        })))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .args([
            "register",
            "--name",
            "Ann",
            "--email",
            "ann@x.com",
            "--phone",
            "555-0100",
            "--password",
            "secret",
            "--role",
            "donor",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Account created."))
        .stdout(predicate::str::contains("Signed in as Ann"));

    // Both entries landed in the credentials file.
    let stored = fs::read_to_string(credentials_file(home.path())).unwrap();
    assert!(stored.contains("tok-reg"));
    assert!(stored.contains("ann@x.com"));

    // A separate invocation restores the session from disk.
    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ann"))
        .stdout(predicate::str::contains("role:  donor"));

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));

    // Logging out twice is fine.
    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .arg("logout")
        .assert()
        .success();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_rejected_keeps_user_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let home = tempdir().unwrap();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .args(["login", "--email", "ann@x.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_validation_happens_before_dispatch() {
    let home = tempdir().unwrap();

    // No server at all: a malformed email must fail before any request.
    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", "http://127.0.0.1:9")
        .args(["login", "--email", "not-an-email", "--password", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valid email"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_session_clears_credentials_and_says_so() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/nearby"))
        .and(header("authorization", "Bearer tok-stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    fs::write(
        credentials_file(home.path()),
        serde_json::to_string_pretty(&json!({
            "access_token": "tok-stale",
            "user": r#"{"name":"Ann","email":"ann@x.com","role":"donor"}"#,
        }))
        .unwrap(),
    )
    .unwrap();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .args(["listings", "nearby"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session has ended"))
        .stderr(predicate::str::contains("foodshare login"));

    // The cascade removed both stored entries.
    let stored = fs::read_to_string(credentials_file(home.path())).unwrap();
    assert!(!stored.contains("tok-stale"));
    assert!(!stored.contains("Ann"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_credentials_read_as_signed_out() {
    let home = tempdir().unwrap();
    fs::write(credentials_file(home.path()), "{definitely not json").unwrap();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_nearby_listings_render_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/nearby"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "1",
                "title": "Fresh Homemade Pasta",
                "category": "meals",
                "quantity": "4 servings",
            }
        ])))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();

    cargo_bin_cmd!("foodshare")
        .env("FOODSHARE_HOME", home.path())
        .env("FOODSHARE_API_URL", server.uri())
        .args(["listings", "nearby"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fresh Homemade Pasta"));
}
