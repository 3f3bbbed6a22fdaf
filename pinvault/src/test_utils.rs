//! Test utilities shared by handler and end-to-end tests.

use crate::{AppState, Config, build_router, config::PinataConfig, pinning};
use axum_test::TestServer;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const TEST_JWT: &str = "test-pinata-jwt";
pub const TEST_GATEWAY: &str = "test-gateway.mypinata.cloud";

/// Config pointing the Pinata client at `api_url`.
pub fn create_test_config(api_url: &str, jwt: Option<&str>, gateway: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        pinata: PinataConfig {
            jwt: jwt.map(str::to_string),
            gateway: gateway.map(str::to_string),
            api_url: api_url.parse().expect("Invalid test API URL"),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Router wired to a Pinata mock, without binding a port.
pub fn create_test_router(mock_server: &MockServer, jwt: Option<&str>, gateway: Option<&str>) -> axum::Router {
    let config = create_test_config(&mock_server.uri(), jwt, gateway);
    let state = AppState::builder()
        .pinning(pinning::create_service(&config.pinata).expect("Failed to create pinning client"))
        .maybe_gateway(config.pinata.gateway.as_deref().and_then(pinning::Gateway::new))
        .config(config)
        .build();

    build_router(state).expect("Failed to build router")
}

pub fn create_test_server(mock_server: &MockServer, jwt: Option<&str>, gateway: Option<&str>) -> TestServer {
    TestServer::new(create_test_router(mock_server, jwt, gateway)).expect("Failed to create test server")
}

/// Serve the app on an ephemeral local port, for clients that need a real base URL.
pub async fn spawn_test_app(mock_server: &MockServer, jwt: Option<&str>, gateway: Option<&str>) -> url::Url {
    let router = create_test_router(mock_server, jwt, gateway);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read test listener address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    format!("http://{addr}").parse().expect("Invalid test server URL")
}

/// A Pinata `pinList` response with one row per CID, in order.
pub fn pin_list_body(cids: &[&str]) -> Value {
    let rows: Vec<Value> = cids
        .iter()
        .enumerate()
        .map(|(i, cid)| {
            json!({
                "id": format!("pin-{}", i + 1),
                "ipfs_pin_hash": cid,
                "size": 1024 * (i + 1),
                "user_id": "user-1",
                "name": format!("file-{}.png", i + 1),
                "date_pinned": format!("2024-03-{:02}T12:00:00.000Z", i + 1),
                "date_unpinned": null,
                "metadata": { "name": null, "keyvalues": null },
                "regions": []
            })
        })
        .collect();

    json!({ "count": rows.len(), "rows": rows })
}
