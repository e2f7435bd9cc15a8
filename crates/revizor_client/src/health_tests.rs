use super::*;
use std::net::SocketAddr;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLATFORM_TOKEN: &str = "platform-test-token";
const CONTAINER_HOST: &str = "abc123.te.test";

/// Builds a health client whose container hostname resolves to `addr`.
fn create_client(
    addr: SocketAddr,
    configure: impl FnOnce(&mut HealthCheckConfig),
) -> HealthCheckClient {
    let mut config = HealthCheckConfig::new(platform_token());
    config.scheme = "http".to_string();
    config.platform_domain = format!("te.test:{}", addr.port());
    configure(&mut config);

    let client = reqwest::Client::builder()
        .no_proxy()
        .resolve(CONTAINER_HOST, addr)
        .build()
        .unwrap();
    HealthCheckClient::with_http_client(config, client)
}

fn platform_token() -> SecretString {
    SecretString::from(PLATFORM_TOKEN.to_string())
}

fn container() -> Container {
    Container::new("abc123").unwrap()
}

#[test]
fn test_default_config() {
    let config = HealthCheckConfig::new(platform_token());

    assert_eq!(config.platform_domain, "test-env.scalr.com");
    assert_eq!(config.ping_path, "/api/iacp/v3/ping");
    assert_eq!(config.healthy_statuses, vec![200, 204]);
    assert!(config.profile.is_none());
}

#[test]
fn test_ping_url_uses_container_hostname() {
    let client = HealthCheckClient::new(HealthCheckConfig::new(platform_token())).unwrap();

    assert_eq!(client.hostname(&container()), "abc123.test-env.scalr.com");
    assert_eq!(
        client.ping_url(&container()).unwrap().as_str(),
        "https://abc123.test-env.scalr.com/api/iacp/v3/ping"
    );
}

#[tokio::test]
async fn test_check_ready_on_no_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/iacp/v3/ping"))
        .and(header("Authorization", format!("Bearer {PLATFORM_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |_| {});

    let outcome = client.check(&container()).await;

    assert!(outcome.ready);
    assert_eq!(outcome.status_code, Some(204));
    assert!(outcome.cause.is_none());
}

#[tokio::test]
async fn test_check_honours_configured_statuses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/iacp/v3/ping"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |config| {
        config.healthy_statuses = vec![200];
    });

    let outcome = client.check(&container()).await;

    assert!(!outcome.ready);
    assert_eq!(outcome.status_code, Some(204));
}

#[tokio::test]
async fn test_check_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/iacp/v3/ping"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |_| {});

    let outcome = client.check(&container()).await;

    assert!(!outcome.ready);
    assert!(outcome.is_not_found());
    assert!(matches!(
        outcome.cause,
        Some(Error::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_check_sends_profile_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/iacp/v3/ping"))
        .and(header("Prefer", "profile=internal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |config| {
        config.profile = Some("internal".to_string());
    });

    let outcome = client.check(&container()).await;

    assert!(outcome.ready);
}

#[tokio::test]
async fn test_check_transport_error_is_not_ready() {
    let closed: SocketAddr = ([127, 0, 0, 1], 9).into();
    let client = create_client(closed, |_| {});

    let outcome = client.check(&container()).await;

    assert!(!outcome.ready);
    assert_eq!(outcome.status_code, None);
    assert!(matches!(outcome.cause, Some(Error::Transport { .. })));
}

#[tokio::test]
async fn test_check_applies_configured_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/iacp/v3/ping"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |config| {
        config.timeout = Duration::from_millis(100);
    });

    let outcome = client.check(&container()).await;

    assert!(!outcome.ready);
    assert_eq!(outcome.status_code, None);
    assert!(matches!(outcome.cause, Some(Error::Transport { .. })));
}

#[test]
fn test_ping_url_rejects_id_leaving_platform_domain() {
    let client = HealthCheckClient::new(HealthCheckConfig::new(platform_token())).unwrap();

    for id in ["attacker.example/x#", "evil.com", "user@host", "a?b"] {
        let container = Container { id: id.to_string() };

        assert!(
            matches!(
                client.ping_url(&container),
                Err(Error::InvalidContainerId(_))
            ),
            "{id}"
        );
    }
}

#[tokio::test]
async fn test_check_with_invalid_id_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_client(*mock_server.address(), |_| {});
    let container = Container {
        id: "abc123.te.test/x#".to_string(),
    };

    let outcome = client.check(&container).await;

    assert!(!outcome.ready);
    assert!(matches!(outcome.cause, Some(Error::InvalidContainerId(_))));
}
