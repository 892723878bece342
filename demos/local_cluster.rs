//! Local cluster walkthrough
//!
//! Starts a gateway and one storage node in-process, then:
//! - registers the node with the gateway
//! - logs alice in (development auth: the bearer token is the username)
//! - uploads a photo and shares it with the family group
//! - lists what bob can see
//!
//! Run with: cargo run --example local_cluster

use mediashare_core::{MemoryMetadataStore, MetadataStore, Node};
use mediashare_gateway::{AppState, DevIdentityProvider, GatewayConfig};
use mediashare_node::{register_with_gateway, NodeConfig};
use reqwest::multipart;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("🚀 Mediashare - Local Cluster\n");

    let dir = tempfile::tempdir()?;

    // ==================== Storage Node ====================

    let node_listener = TcpListener::bind("127.0.0.1:0").await?;
    let node_url = format!("http://{}", node_listener.local_addr()?);
    let node = Arc::new(mediashare_node::NodeState::new(NodeConfig {
        node_id: "n1".to_string(),
        secret: "s1".to_string(),
        base_dir: dir.path().join("data"),
        rules_dir: dir.path().join("rules"),
        groups: vec!["family".to_string()],
        ..Default::default()
    }));
    node.files.init(&node.config.groups).await?;
    tokio::spawn(mediashare_node::serve(
        node_listener,
        Arc::clone(&node),
        std::future::pending(),
    ));
    println!("💾 Node n1 on {node_url}");

    // ==================== Gateway ====================

    let store = MemoryMetadataStore::new();
    store.add_group_member("family", "alice").await?;
    store.add_group_member("family", "bob").await?;
    store
        .insert_node(
            Node::new("n1", "Home NAS", "alice", &node_url, "http://files.localhost")
                .with_secret("s1")
                .with_group("family"),
        )
        .await?;

    let gateway = Arc::new(AppState::with_parts(
        GatewayConfig {
            auth_enabled: false,
            ..Default::default()
        },
        Arc::new(store),
        Arc::new(DevIdentityProvider::new(chrono::Duration::hours(1))),
    ));
    let gateway_listener = TcpListener::bind("127.0.0.1:0").await?;
    let gateway_url = format!("http://{}", gateway_listener.local_addr()?);
    tokio::spawn(mediashare_gateway::serve(
        gateway_listener,
        Arc::clone(&gateway),
        std::future::pending(),
    ));
    println!("🌐 Gateway on {gateway_url}\n");

    let registration = mediashare_client::GatewayClient::new(
        &gateway_url,
        mediashare_client::ClientConfig::default(),
    )?;
    register_with_gateway(&registration, "n1", "s1", Duration::from_secs(1)).await;
    println!("🔐 Node registered");

    // ==================== Alice ====================

    let http = reqwest::Client::new();

    let login: Value = http
        .post(format!("{gateway_url}/login"))
        .bearer_auth("alice")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("👤 alice logged in: {}", serde_json::to_string_pretty(&login)?);

    println!("\n📤 Uploading 'beach.jpg' shared with family...");
    let form = multipart::Form::new()
        .part(
            "uploadfile",
            multipart::Part::bytes(b"<jpeg bytes>".to_vec()).file_name("beach.jpg"),
        )
        .part(
            "uploadthumb",
            multipart::Part::bytes(b"<thumb bytes>".to_vec()).file_name("beach_thumb.jpg"),
        )
        .text("groups", "family");
    let upload: Value = http
        .post(format!("{gateway_url}/media/n1"))
        .bearer_auth("alice")
        .multipart(form)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("   ✅ {}", upload["media"]["url"]);

    // ==================== Bob ====================

    http.post(format!("{gateway_url}/login"))
        .bearer_auth("bob")
        .send()
        .await?
        .error_for_status()?;

    let media: Vec<Value> = http
        .get(format!("{gateway_url}/media"))
        .bearer_auth("bob")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("\n📋 bob sees {} item(s):", media.len());
    for item in &media {
        println!(
            "   - {} by {} -> {}",
            item["filename"], item["creator"], item["url"]
        );
    }

    println!(
        "\n🔗 Access-link rules: {}",
        json!(std::fs::read_dir(&node.config.rules_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>())
    );

    println!("\n✨ Done");
    Ok(())
}
