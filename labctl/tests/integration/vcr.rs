use labctl::args::{
    CreateRepoArgs, CreditAddArgs, CreditCommand, RegistryArgs, UpdateRepoArgs, VcrCommand,
    VcrUtilCommand,
};
use labctl::error::UsageError;
use labctl::Command;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{labctl_command, write_session, SESSION_AUTH};

fn create_repo(name: &str) -> Command {
    Command::Vcr(VcrCommand::CreateRepo(CreateRepoArgs {
        namespace: None,
        name: Some(name.to_string()),
    }))
}

#[tokio::test]
async fn malformed_repo_names_never_reach_the_service() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = labctl_command(create_repo("web"), home.path(), &server.uri())
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<UsageError>(),
        Some(&UsageError::InvalidRepoName)
    );
}

#[tokio::test]
async fn create_repo_posts_to_the_repo_path() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    Mock::given(method("POST"))
        .and(path("/vcr/v1/repo/acme/web"))
        .and(header("authorization", SESSION_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    labctl_command(create_repo("acme/web"), home.path(), &server.uri())
        .await
        .unwrap();
}

#[tokio::test]
async fn update_repo_sends_the_visibility() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    Mock::given(method("PUT"))
        .and(path("/vcr/v1/repo/acme/web/update-settings"))
        .and(header("authorization", SESSION_AUTH))
        .and(body_json(json!({"public": false})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    labctl_command(
        Command::Vcr(VcrCommand::UpdateRepo(UpdateRepoArgs {
            public: false,
            private: true,
            name: Some("acme/web".to_string()),
        })),
        home.path(),
        &server.uri(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn update_repo_rejects_both_visibilities() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    let err = labctl_command(
        Command::Vcr(VcrCommand::UpdateRepo(UpdateRepoArgs {
            public: true,
            private: true,
            name: Some("acme/web".to_string()),
        })),
        home.path(),
        &server.uri(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<UsageError>(),
        Some(&UsageError::ConflictingVisibility)
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn kubernetes_secret_needs_a_login() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let err = labctl_command(
        Command::Vcr(VcrCommand::KubernetesSecret),
        home.path(),
        &server.uri(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<UsageError>(),
        Some(&UsageError::NotLoggedIn)
    );
}

#[tokio::test]
async fn kubernetes_secret_prints_with_a_login() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    labctl_command(
        Command::Vcr(VcrCommand::KubernetesSecret),
        home.path(),
        &server.uri(),
    )
    .await
    .unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn credit_add_needs_an_amount() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_session(home.path());

    let err = labctl_command(
        Command::Credit(CreditCommand::Add(CreditAddArgs {
            namespace: Some("acme".to_string()),
            dollars: 0,
        })),
        home.path(),
        &server.uri(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<UsageError>(),
        Some(&UsageError::MissingCredit)
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn sha256(body: &[u8]) -> String {
    let hex: String = ring::digest::digest(&ring::digest::SHA256, body)
        .as_ref()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("sha256:{hex}")
}

fn util(command: fn(RegistryArgs) -> VcrUtilCommand, reference: String) -> Command {
    Command::Vcr(VcrCommand::Util(command(RegistryArgs {
        username: None,
        password: None,
        reference,
    })))
}

/// A registry serving `acme/web:latest` that expects one manifest pull
async fn local_registry() -> MockServer {
    let server = MockServer::start().await;
    let config = br#"{"architecture": "arm64", "os": "linux"}"#;
    let manifest = serde_json::to_vec(&json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "size": config.len(),
            "digest": sha256(config),
        },
        "layers": [],
    }))
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/acme/web/manifests/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Docker-Content-Digest", sha256(&manifest).as_str())
                .set_body_raw(manifest, "application/vnd.oci.image.manifest.v1+json"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/acme/web/blobs/{}", sha256(config))))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(config.to_vec(), "application/vnd.oci.image.config.v1+json"),
        )
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn read_manifest_pulls_from_a_local_registry() {
    let registry = local_registry().await;
    let home = TempDir::new().unwrap();
    let reference = format!("{}/acme/web:latest", registry.address());

    labctl_command(
        util(VcrUtilCommand::ReadManifest, reference),
        home.path(),
        "http://127.0.0.1:9",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn read_config_pulls_from_a_local_registry() {
    let registry = local_registry().await;
    let home = TempDir::new().unwrap();
    let reference = format!("{}/acme/web:latest", registry.address());

    labctl_command(
        util(VcrUtilCommand::ReadConfig, reference),
        home.path(),
        "http://127.0.0.1:9",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn missing_manifest_is_reported() {
    let registry = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&registry)
        .await;
    let home = TempDir::new().unwrap();
    let reference = format!("{}/acme/web:missing", registry.address());

    let err = labctl_command(
        util(VcrUtilCommand::ReadManifest, reference),
        home.path(),
        "http://127.0.0.1:9",
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "error reading manifest");
}
