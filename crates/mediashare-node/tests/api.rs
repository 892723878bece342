//! Node control plane against an in-process server

use bytes::Bytes;
use mediashare_client::{ClientConfig, ClientError, NodeClient};
use mediashare_core::{FailedShare, FilesGroupsMap};
use mediashare_node::{serve, NodeConfig, NodeState};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

const SECRET: &str = "s1";

struct TestNode {
    base_url: String,
    state: Arc<NodeState>,
    client: NodeClient,
    _dir: TempDir,
}

impl TestNode {
    fn data(&self, rel: &str) -> PathBuf {
        self.state.files.base().join(rel)
    }

    fn rule(&self, token: &str) -> PathBuf {
        self.state.config.rules_dir.join(format!("{token}.toml"))
    }

    async fn upload(&self, username: &str, token: &str, filename: &str) {
        self.client
            .upload_file(
                username,
                token,
                filename,
                Bytes::from_static(b"original"),
                Bytes::from_static(b"thumb"),
            )
            .await
            .unwrap();
    }
}

// Node with the "family" group folder provisioned
async fn spawn_node() -> TestNode {
    let dir = TempDir::new().unwrap();
    let config = NodeConfig {
        node_id: "n1".to_string(),
        secret: SECRET.to_string(),
        base_dir: dir.path().join("data"),
        rules_dir: dir.path().join("rules"),
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    let state = Arc::new(NodeState::new(config));
    state.files.init(&["family".to_string()]).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::clone(&state);
    tokio::spawn(async move {
        serve(listener, served, std::future::pending()).await.unwrap();
    });

    let base_url = format!("http://{addr}");
    let client = NodeClient::new(&base_url, SECRET, ClientConfig::default()).unwrap();
    TestNode {
        base_url,
        state,
        client,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let node = spawn_node().await;
    let res = reqwest::get(format!("{}/health", node.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_control_plane_requires_node_secret() {
    let node = spawn_node().await;
    let http = reqwest::Client::new();

    let res = http
        .post(format!("{}/user/alice/authenticate", node.base_url))
        .json(&"t1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let impostor = NodeClient::new(&node.base_url, "wrong", ClientConfig::default()).unwrap();
    let err = impostor.authenticate_user("alice", "t1").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert!(node.state.sessions.is_empty());
}

#[tokio::test]
async fn test_authenticate_rejects_non_string_token() {
    let node = spawn_node().await;
    let http = reqwest::Client::new();

    for body in ["123", "{\"token\":\"t1\"}", "not json"] {
        let res = http
            .post(format!("{}/user/alice/authenticate", node.base_url))
            .bearer_auth(SECRET)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
        let error: serde_json::Value = res.json().await.unwrap();
        assert_eq!(error["code"], "InvalidRequest");
    }
    assert!(node.state.sessions.is_empty());
}

#[tokio::test]
async fn test_authenticate_publishes_access_link() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();

    assert_eq!(node.state.sessions.len(), 1);
    assert!(node.state.sessions.verify("alice", "t1"));
    let rules = tokio::fs::read_to_string(node.rule("t1")).await.unwrap();
    assert!(rules.contains("/user/alice/own/$1"));

    // Re-authenticating replaces the token and its link
    node.client.authenticate_user("alice", "t2").await.unwrap();
    assert_eq!(node.state.sessions.len(), 1);
    assert!(!node.state.sessions.verify("alice", "t1"));
    assert!(node.state.sessions.verify("alice", "t2"));
    assert!(!node.rule("t1").exists());
    assert!(node.rule("t2").exists());
}

#[tokio::test]
async fn test_unauthenticate_is_idempotent() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();

    node.client.unauthenticate_user("alice").await.unwrap();
    assert!(node.state.sessions.is_empty());
    assert!(!node.rule("t1").exists());

    node.client.unauthenticate_user("alice").await.unwrap();
}

#[tokio::test]
async fn test_upload_requires_user_session() {
    let node = spawn_node().await;

    let err = node
        .client
        .upload_file(
            "alice",
            "t1",
            "f.jpg",
            Bytes::from_static(b"x"),
            Bytes::from_static(b"y"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));

    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;

    let original = tokio::fs::read(node.data("user/alice/own/f.jpg")).await.unwrap();
    assert_eq!(original, b"original");
    let thumb = tokio::fs::read(node.data("user/alice/own/thumb/f_thumb.jpg"))
        .await
        .unwrap();
    assert_eq!(thumb, b"thumb");
}

#[tokio::test]
async fn test_share_reports_missing_group_only() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;

    let map = FilesGroupsMap::new(
        vec!["f.jpg".to_string()],
        vec!["family".to_string(), "work".to_string()],
    );
    let err = node.client.share_files("alice", "t1", &map).await.unwrap_err();
    let ClientError::PartialFailure(failed) = err else {
        panic!("expected partial failure, got {err:?}");
    };
    let pairs: Vec<_> = failed
        .iter()
        .map(|FailedShare { filename, group, .. }| (filename.as_str(), group.as_str()))
        .collect();
    assert_eq!(pairs, vec![("f.jpg", "work")]);

    // The other pair went through
    assert!(node.data("group/family/f.jpg").exists());
    assert!(node.data("group/family/thumb/f_thumb.jpg").exists());
}

#[tokio::test]
async fn test_unshare_and_delete() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;

    let map = FilesGroupsMap::new(vec!["f.jpg".to_string()], vec!["family".to_string()]);
    node.client.share_files("alice", "t1", &map).await.unwrap();
    node.client.unshare_files("alice", "t1", &map).await.unwrap();
    assert!(!node.data("group/family/f.jpg").exists());
    assert!(node.data("user/alice/own/f.jpg").exists());

    node.client.share_files("alice", "t1", &map).await.unwrap();
    node.client.delete_file("alice", "t1", "f.jpg").await.unwrap();
    assert!(!node.data("group/family/f.jpg").exists());
    assert!(!node.data("user/alice/own/f.jpg").exists());
    assert!(!node.data("user/alice/own/thumb/f_thumb.jpg").exists());

    let err = node
        .client
        .delete_file("alice", "t1", "f.jpg")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_aborted_delete_answers_conflict_and_keeps_original() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;
    let map = FilesGroupsMap::new(vec!["f.jpg".to_string()], vec!["family".to_string()]);
    node.client.share_files("alice", "t1", &map).await.unwrap();

    let group_thumb = node.data("group/family/thumb/f_thumb.jpg");
    tokio::fs::remove_file(&group_thumb).await.unwrap();
    tokio::fs::create_dir(&group_thumb).await.unwrap();

    let err = node
        .client
        .delete_file("alice", "t1", "f.jpg")
        .await
        .unwrap_err();
    let ClientError::PartialFailure(failed) = err else {
        panic!("expected partial failure, got {err:?}");
    };
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].group, "family");
    assert!(node.data("user/alice/own/f.jpg").exists());
    assert!(node.data("group/family/f.jpg").exists());
}

#[tokio::test]
async fn test_reupload_of_same_name_is_conflict() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;

    let err = node
        .client
        .upload_file(
            "alice",
            "t1",
            "f.jpg",
            Bytes::from_static(b"replaced"),
            Bytes::from_static(b"thumb"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));

    let original = tokio::fs::read(node.data("user/alice/own/f.jpg")).await.unwrap();
    assert_eq!(original, b"original");
}

#[tokio::test]
async fn test_session_of_other_user_is_refused() {
    let node = spawn_node().await;
    node.client.authenticate_user("alice", "t1").await.unwrap();
    node.upload("alice", "t1", "f.jpg").await;

    // bob's session token does not open alice's area
    node.client.authenticate_user("bob", "t2").await.unwrap();
    let err = node
        .client
        .delete_file("alice", "t2", "f.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert!(node.data("user/alice/own/f.jpg").exists());
}
