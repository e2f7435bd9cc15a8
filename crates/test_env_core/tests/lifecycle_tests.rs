//! End-to-end lifecycle tests against mocked Revizor and container endpoints.
//!
//! A single mock server plays both services. Container hostnames under the
//! `te.test` domain are resolved to the mock server by the health-check client.

use std::net::SocketAddr;
use std::time::Duration;

use revizor_client::{
    CreateContainerPayload, HealthCheckClient, HealthCheckConfig, RevizorClient,
};
use secrecy::SecretString;
use test_env_core::{
    GithubOutputFile, LifecycleController, LifecycleError, LifecyclePolicy, RetryBudget,
};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTAINER_ID: &str = "abc123";
const PING_PATH: &str = "/api/iacp/v3/ping";

fn revizor(server: &MockServer) -> RevizorClient {
    RevizorClient::new(
        Url::parse(&server.uri()).unwrap(),
        SecretString::from("revizor-token".to_string()),
    )
    .unwrap()
}

fn health(addr: SocketAddr) -> HealthCheckClient {
    let mut config = HealthCheckConfig::new(SecretString::from("scalr-token".to_string()));
    config.scheme = "http".to_string();
    config.platform_domain = format!("te.test:{}", addr.port());

    let client = reqwest::Client::builder()
        .no_proxy()
        .resolve(&format!("{CONTAINER_ID}.te.test"), addr)
        .build()
        .unwrap();
    HealthCheckClient::with_http_client(config, client)
}

fn controller(
    server: &MockServer,
    max_attempts: u32,
) -> LifecycleController<RevizorClient, HealthCheckClient> {
    LifecycleController::new(
        revizor(server),
        health(*server.address()),
        LifecyclePolicy::new(RetryBudget::new(max_attempts, Duration::ZERO), true),
    )
}

async fn mount_creation(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/containers/"))
        .and(header("Authorization", "Token revizor-token"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "container_id": CONTAINER_ID })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_deletion(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("/api/containers/{CONTAINER_ID}/")))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_reports_ready_container() {
    let server = MockServer::start().await;
    mount_creation(&server, 1).await;
    mount_deletion(&server, 202, 0).await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .and(header("Authorization", "Bearer scalr-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("github_output");
    let sink = GithubOutputFile::new(&output_path);

    let outcome = controller(&server, 3)
        .create(&CreateContainerPayload::new(true), &sink)
        .await
        .unwrap();

    let hostname = format!("{CONTAINER_ID}.te.test:{}", server.address().port());
    assert_eq!(outcome.container.id, CONTAINER_ID);
    assert_eq!(outcome.hostname, hostname);
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap(),
        format!("container_id={CONTAINER_ID}\nhostname={hostname}\n")
    );
}

#[tokio::test]
async fn test_create_becomes_ready_after_bad_gateway() {
    let server = MockServer::start().await;
    mount_creation(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = GithubOutputFile::new(dir.path().join("github_output"));

    let outcome = controller(&server, 5)
        .create(&CreateContainerPayload::new(true), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.health_checks, 3);
}

#[tokio::test]
async fn test_create_exhausted_deletes_container() {
    let server = MockServer::start().await;
    mount_creation(&server, 1).await;
    mount_deletion(&server, 202, 1).await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = GithubOutputFile::new(dir.path().join("github_output"));

    let result = controller(&server, 3)
        .create(&CreateContainerPayload::new(true), &sink)
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::PollingExhausted {
            attempts: 3,
            last_status: Some(503),
            ..
        })
    ));
}

#[tokio::test]
async fn test_create_not_found_recreates_once() {
    let server = MockServer::start().await;
    mount_creation(&server, 2).await;
    mount_deletion(&server, 202, 2).await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = GithubOutputFile::new(dir.path().join("github_output"));

    let result = controller(&server, 2)
        .create(&CreateContainerPayload::new(true), &sink)
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::PollingExhausted {
            last_status: Some(404),
            ..
        })
    ));
}

#[tokio::test]
async fn test_create_rollback_rejected() {
    let server = MockServer::start().await;
    mount_creation(&server, 1).await;
    mount_deletion(&server, 500, 1).await;
    Mock::given(method("GET"))
        .and(path(PING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = GithubOutputFile::new(dir.path().join("github_output"));

    let result = controller(&server, 1)
        .create(&CreateContainerPayload::new(true), &sink)
        .await;

    match result {
        Err(error @ LifecycleError::RollbackFailed { .. }) => {
            assert_eq!(error.container_id(), Some(CONTAINER_ID));
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_accepted() {
    let server = MockServer::start().await;
    mount_deletion(&server, 202, 1).await;

    controller(&server, 1).delete(CONTAINER_ID).await.unwrap();
}
