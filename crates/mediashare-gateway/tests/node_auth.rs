//! Node authentication protocol against mocked storage nodes

use chrono::{Duration as ChronoDuration, Utc};
use mediashare_core::{MemoryMetadataStore, MetadataStore, Node};
use mediashare_gateway::{
    ErrorCode, GatewaySession, Identity, NodeAuthenticator, NodeRegistry, NodeState,
    SessionStore, SkipReason,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    registry: NodeRegistry,
    sessions: SessionStore,
    store: Arc<MemoryMetadataStore>,
    auth: NodeAuthenticator,
}

fn fixture(timeout: Duration) -> Fixture {
    let registry = NodeRegistry::new();
    let sessions = SessionStore::new();
    let store = Arc::new(MemoryMetadataStore::new());
    let auth = NodeAuthenticator::new(registry.clone(), sessions.clone(), store.clone(), timeout);
    Fixture {
        registry,
        sessions,
        store,
        auth,
    }
}

fn alice(sessions: &SessionStore) -> GatewaySession {
    let identity = Identity {
        username: "alice".into(),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    };
    sessions.insert(GatewaySession::new(
        identity,
        "bearer-alice",
        BTreeSet::from(["family".to_string()]),
    ))
}

fn family_node(id: &str, api_url: &str, secret: &str) -> Node {
    Node::new(id, id, "carol", api_url, "http://data")
        .with_secret(secret)
        .with_group("family")
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn test_register_node_with_matching_secret() {
    let f = fixture(Duration::from_secs(1));
    f.store
        .insert_node(family_node("n1", "http://n1", "s1"))
        .await
        .unwrap();

    f.auth.register_node("n1", "s1").await.unwrap();
    assert_eq!(f.registry.state("n1"), NodeState::Authenticated);
}

#[tokio::test]
async fn test_register_node_rejections_are_generic() {
    let f = fixture(Duration::from_secs(1));
    f.store
        .insert_node(family_node("n1", "http://n1", "s1"))
        .await
        .unwrap();

    let wrong_secret = f.auth.register_node("n1", "nope").await.unwrap_err();
    let unknown_id = f.auth.register_node("ghost", "s1").await.unwrap_err();

    assert_eq!(wrong_secret.error_code(), ErrorCode::AuthenticationFailed);
    assert_eq!(wrong_secret.to_string(), unknown_id.to_string());
    assert_eq!(f.registry.state("n1"), NodeState::Unknown);
    assert_eq!(f.registry.state("ghost"), NodeState::Unknown);
}

#[tokio::test]
async fn test_register_node_compares_secret_exactly() {
    let f = fixture(Duration::from_secs(1));
    f.store
        .insert_node(family_node("n1", "http://n1", "s1"))
        .await
        .unwrap();

    for padded in [" s1", "s1\n", " s1\n"] {
        assert!(f.auth.register_node("n1", padded).await.is_err(), "{padded:?} accepted");
    }
    assert_eq!(f.registry.state("n1"), NodeState::Unknown);
}

#[tokio::test]
async fn test_mismatched_secret_drops_authenticated_node() {
    let f = fixture(Duration::from_secs(1));
    f.store
        .insert_node(family_node("n1", "http://n1", "s1"))
        .await
        .unwrap();
    f.auth.register_node("n1", "s1").await.unwrap();

    assert!(f.auth.register_node("n1", "stale").await.is_err());
    assert_eq!(f.registry.state("n1"), NodeState::Unknown);
}

#[tokio::test]
async fn test_authenticate_user_records_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/alice/authenticate"))
        .and(header("authorization", "Bearer s1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let f = fixture(Duration::from_secs(1));
    f.registry.confirm(family_node("n1", &server.uri(), "s1"));
    let session = alice(&f.sessions);

    let report = f.auth.authenticate_user_to_all(&session).await.unwrap();

    assert_eq!(report.authenticated, vec!["n1".to_string()]);
    assert!(report.skipped.is_empty());
    let token = f.sessions.get_by_username("alice").node_tokens["n1"].clone();
    assert_eq!(token.len(), 64);

    let received = server.received_requests().await.unwrap();
    let body: String = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body, token);
}

#[tokio::test]
async fn test_not_found_node_is_skipped() {
    let ok = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&ok)
        .await;
    let missing = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&missing)
        .await;

    let f = fixture(Duration::from_secs(1));
    f.registry.confirm(family_node("n1", &ok.uri(), "s1"));
    f.registry.confirm(family_node("n2", &missing.uri(), "s2"));
    let session = alice(&f.sessions);

    let report = f.auth.authenticate_user_to_all(&session).await.unwrap();

    assert_eq!(report.authenticated, vec!["n1".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].node_id, "n2");
    assert_eq!(report.skipped[0].reason, SkipReason::Unreachable);
    assert!(f.sessions.get_by_username("alice").node_token("n2").is_none());
}

#[tokio::test]
async fn test_timed_out_node_is_skipped() {
    let slow = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&slow)
        .await;

    let f = fixture(Duration::from_millis(200));
    f.registry.confirm(family_node("n1", &slow.uri(), "s1"));
    let session = alice(&f.sessions);

    let report = f.auth.authenticate_user_to_all(&session).await.unwrap();

    assert!(report.authenticated.is_empty());
    assert_eq!(report.skipped[0].reason, SkipReason::TimedOut);
}

#[tokio::test]
async fn test_transport_failure_aborts_batch() {
    let ok = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&ok)
        .await;

    let f = fixture(Duration::from_secs(1));
    f.registry.confirm(family_node("n1", &ok.uri(), "s1"));
    f.registry.confirm(family_node("n2", &closed_port_url(), "s2"));
    let session = alice(&f.sessions);

    let error = f.auth.authenticate_user_to_all(&session).await.unwrap_err();
    assert_eq!(error.error_code(), ErrorCode::NodeUnavailable);
}

#[tokio::test]
async fn test_inaccessible_nodes_are_not_contacted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let f = fixture(Duration::from_secs(1));
    f.registry.confirm(
        Node::new("work", "Work", "carol", server.uri(), "http://data")
            .with_secret("s1")
            .with_group("work"),
    );
    f.registry
        .confirm(family_node("blank", &server.uri(), "s1").with_secret(""));
    let session = alice(&f.sessions);

    let report = f.auth.authenticate_user_to_all(&session).await.unwrap();

    let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![SkipReason::MissingSecret, SkipReason::NotPermitted]
    );
}

#[tokio::test]
async fn test_unauthenticate_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/alice/authenticate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/alice/unauthenticate"))
        .and(header("authorization", "Bearer s1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let f = fixture(Duration::from_secs(1));
    f.registry.confirm(family_node("n1", &server.uri(), "s1"));
    let session = alice(&f.sessions);
    f.auth.authenticate_user_to_all(&session).await.unwrap();

    let failures = f.auth.unauthenticate_user_from_all(&session).await;

    assert!(failures.is_empty());
    assert!(f.sessions.get_by_username("alice").node_tokens.is_empty());
}
