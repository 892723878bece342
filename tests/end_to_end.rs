//! Gateway and storage node running together in-process

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mediashare_client::{ClientConfig, GatewayClient};
use mediashare_core::{MediaRecord, MemoryMetadataStore, MetadataStore, Node};
use mediashare_gateway::auth::Claims;
use mediashare_gateway::{AppState, GatewayConfig, JwtIdentityProvider, NodeState};
use mediashare_node::storage::same_file;
use mediashare_node::{register_with_gateway, NodeConfig};
use reqwest::{multipart, Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const JWT_SECRET: &str = "e2e-secret";

struct Cluster {
    gateway_url: String,
    gateway: Arc<AppState>,
    node: Arc<mediashare_node::NodeState>,
    http: Client,
    _dir: TempDir,
}

impl Cluster {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.gateway_url, path)
    }
}

fn bearer(username: &str) -> String {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + ChronoDuration::hours(1)).timestamp(),
        iat: Some(Utc::now().timestamp()),
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

// alice and bob in "family"; node N1 owned by alice with secret s1
async fn spawn_cluster() -> Cluster {
    let dir = TempDir::new().unwrap();

    let node_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node_url = format!("http://{}", node_listener.local_addr().unwrap());
    let node_config = NodeConfig {
        node_id: "n1".to_string(),
        secret: "s1".to_string(),
        base_dir: dir.path().join("data"),
        rules_dir: dir.path().join("rules"),
        groups: vec!["family".to_string()],
        ..Default::default()
    };
    let node = Arc::new(mediashare_node::NodeState::new(node_config));
    node.files.init(&node.config.groups).await.unwrap();
    let served = Arc::clone(&node);
    tokio::spawn(async move {
        mediashare_node::serve(node_listener, served, std::future::pending())
            .await
            .unwrap();
    });

    let store = MemoryMetadataStore::new();
    store.add_group_member("family", "alice").await.unwrap();
    store.add_group_member("family", "bob").await.unwrap();
    store
        .insert_node(
            Node::new("n1", "N1", "alice", &node_url, "http://files.n1")
                .with_secret("s1")
                .with_group("family"),
        )
        .await
        .unwrap();
    store
        .insert_media(MediaRecord::new("n1", "alice", "a.jpg"))
        .await
        .unwrap();
    store
        .insert_media(MediaRecord::new("n1", "bob", "b.jpg").with_group("family"))
        .await
        .unwrap();
    store
        .insert_media(MediaRecord::new("n1", "carol", "c.jpg").with_group("work"))
        .await
        .unwrap();

    let gateway = Arc::new(AppState::with_parts(
        GatewayConfig {
            jwt_secret: Some(JWT_SECRET.to_string()),
            ..Default::default()
        },
        Arc::new(store),
        Arc::new(JwtIdentityProvider::new(JWT_SECRET)),
    ));
    let gateway_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway_url = format!("http://{}", gateway_listener.local_addr().unwrap());
    let served = Arc::clone(&gateway);
    tokio::spawn(async move {
        mediashare_gateway::serve(gateway_listener, served, std::future::pending())
            .await
            .unwrap();
    });

    // The node introduces itself the same way it does at boot
    let client = GatewayClient::new(&gateway_url, ClientConfig::default()).unwrap();
    let attempts = register_with_gateway(&client, "n1", "s1", Duration::from_millis(20)).await;
    assert_eq!(attempts, 1);

    Cluster {
        gateway_url,
        gateway,
        node,
        http: Client::new(),
        _dir: dir,
    }
}

#[tokio::test]
async fn test_login_upload_and_share_across_cluster() {
    let cluster = spawn_cluster().await;
    assert_eq!(cluster.gateway.registry.state("n1"), NodeState::Authenticated);
    let token = bearer("alice");

    // Login authorizes alice on the node
    let res = cluster
        .http
        .post(cluster.url("/login"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let login: Value = res.json().await.unwrap();
    let node_token = login["node_tokens"]["n1"].as_str().unwrap().to_string();
    assert_eq!(cluster.node.sessions.len(), 1);
    assert!(cluster.node.sessions.verify("alice", &node_token));
    assert!(cluster
        .node
        .config
        .rules_dir
        .join(format!("{node_token}.toml"))
        .exists());

    // Own media plus what the family shares, nothing from other groups
    let res = cluster
        .http
        .get(cluster.url("/media?owner_only=false"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let media: Vec<Value> = res.json().await.unwrap();
    let mut names: Vec<_> = media
        .iter()
        .map(|m| m["filename"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.jpg", "b.jpg"]);

    // Upload lands in alice's own area
    let form = multipart::Form::new()
        .part(
            "uploadfile",
            multipart::Part::bytes(b"original".to_vec()).file_name("f.jpg"),
        )
        .part(
            "uploadthumb",
            multipart::Part::bytes(b"thumb".to_vec()).file_name("f_thumb.jpg"),
        );
    let res = cluster
        .http
        .post(cluster.url("/media/n1"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let upload: Value = res.json().await.unwrap();
    let media_id = upload["media"]["id"].as_str().unwrap().to_string();

    let own = cluster.node.files.own_dir("alice");
    assert!(own.join("f.jpg").exists());
    assert!(own.join("thumb").join("f_thumb.jpg").exists());

    // Sharing links the very same file into the group folder
    let res = cluster
        .http
        .post(cluster.url(&format!("/media/{media_id}/shares")))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "groups": ["family"] }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let shared = cluster.node.files.group_dir("family").join("f.jpg");
    assert!(same_file(&own.join("f.jpg"), &shared).await.unwrap());

    // Deleting removes the original and every share
    let res = cluster
        .http
        .delete(cluster.url(&format!("/media/{media_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert!(!own.join("f.jpg").exists());
    assert!(!shared.exists());
}

#[tokio::test]
async fn test_logout_revokes_node_session() {
    let cluster = spawn_cluster().await;
    let token = bearer("alice");

    let res = cluster
        .http
        .post(cluster.url("/login"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let login: Value = res.json().await.unwrap();
    let node_token = login["node_tokens"]["n1"].as_str().unwrap().to_string();

    let res = cluster
        .http
        .post(cluster.url("/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(cluster.node.sessions.is_empty());
    assert!(!cluster
        .node
        .config
        .rules_dir
        .join(format!("{node_token}.toml"))
        .exists());
}
