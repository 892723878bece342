//! Node registration retry against a mocked gateway

use mediashare_client::{ClientConfig, GatewayClient};
use mediashare_node::{register_with_gateway, spawn_registration};
use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_registration_retries_until_accepted() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/node/n1/authenticate"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/node/n1/authenticate"))
        .and(body_string("s1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&gateway)
        .await;

    let client = GatewayClient::new(gateway.uri(), ClientConfig::default()).unwrap();
    let attempts =
        register_with_gateway(&client, "n1", "s1", Duration::from_millis(20)).await;
    assert_eq!(attempts, 2);
}

#[tokio::test]
async fn test_registration_survives_unreachable_gateway() {
    let gateway = MockServer::start().await;
    let uri = gateway.uri();
    drop(gateway);

    let client = GatewayClient::new(&uri, ClientConfig::default()).unwrap();
    let handle = spawn_registration(
        client,
        "n1".to_string(),
        "s1".to_string(),
        Duration::from_millis(20),
    );

    // Still retrying, never gives up on its own
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!handle.is_finished());
    handle.abort();
}
