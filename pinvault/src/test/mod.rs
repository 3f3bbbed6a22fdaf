//! End-to-end tests: the page controller talking over HTTP to a served proxy, which in turn talks
//! to a mocked Pinata API.

use crate::page::{HttpFilesApi, LocalFile, MemoryPreviewStore, PageController, PreviewKind, Tab, format_file_size};
use crate::test_utils::{TEST_GATEWAY, TEST_JWT, pin_list_body, spawn_test_app};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A user browses, uploads a file, and sees it in the refreshed list
#[test_log::test(tokio::test)]
async fn test_e2e_browse_upload_and_refresh() {
    let pinata = MockServer::start().await;

    // First list: two existing pins. Second list (after upload): the new one on top.
    Mock::given(method("GET"))
        .and(path("/data/pinList"))
        .and(query_param("status", "pinned"))
        .and(header("authorization", format!("Bearer {TEST_JWT}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(pin_list_body(&["QmOld1", "QmOld2"])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&pinata)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/pinList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pin_list_body(&["QmFresh", "QmOld1", "QmOld2"])))
        .expect(1)
        .mount(&pinata)
        .await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .and(body_string_contains("filename=\"sunset.jpg\""))
        .and(body_string_contains("Content-Type: image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "QmFresh", "PinSize": 6 })))
        .expect(1)
        .mount(&pinata)
        .await;

    let base_url = spawn_test_app(&pinata, Some(TEST_JWT), Some(TEST_GATEWAY)).await;
    info!("Proxy serving at {}", base_url);

    let store = Arc::new(MemoryPreviewStore::new());
    let mut page = PageController::new(HttpFilesApi::new(&base_url).unwrap(), Arc::clone(&store));
    page.set_wallet_connected(true);

    page.load().await;
    assert_eq!(page.files().len(), 2);
    assert_eq!(page.files()[0].url, format!("https://{TEST_GATEWAY}/ipfs/QmOld1"));
    assert_eq!(format_file_size(page.files()[1].size), "2 KB");
    assert_eq!(PreviewKind::from_file_name(&page.files()[0].name), PreviewKind::Image);

    page.select_tab(Tab::Upload);
    page.select_file(LocalFile::new("sunset.jpg", "image/jpeg", &b"pixels"[..]));
    assert_eq!(store.live_count(), 1);

    let response = page.upload().await.unwrap();

    assert_eq!(response.ipfs_hash, "QmFresh");
    assert_eq!(response.url, format!("https://{TEST_GATEWAY}/ipfs/QmFresh"));
    assert_eq!(page.file_url(), Some(response.url.as_str()));
    assert_eq!(store.live_count(), 0);
    assert_eq!(page.tab(), Tab::Explore);
    assert_eq!(page.files().len(), 3);
    assert_eq!(page.files()[0].ipfs_hash, "QmFresh");
}

/// Without credentials the page surfaces the failure and makes no outbound calls
#[test_log::test(tokio::test)]
async fn test_e2e_unconfigured_proxy() {
    let pinata = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&pinata)
        .await;

    let base_url = spawn_test_app(&pinata, None, None).await;

    let store = Arc::new(MemoryPreviewStore::new());
    let mut page = PageController::new(HttpFilesApi::new(&base_url).unwrap(), store).without_wallet_gate();

    page.load().await;
    assert!(page.files().is_empty());

    page.select_file(LocalFile::new("a.txt", "text/plain", &b"hello"[..]));
    let err = page.upload().await.unwrap_err();

    assert!(err.to_string().contains("Server configuration error"));
    assert!(page.file_url().unwrap().starts_with("blob:"));
    assert_eq!(page.notifications().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_e2e_docs_are_served() {
    let pinata = MockServer::start().await;
    let base_url = spawn_test_app(&pinata, None, None).await;

    let client = reqwest::Client::new();

    let health = client.get(base_url.join("healthz").unwrap()).send().await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    let docs = client.get(base_url.join("docs").unwrap()).send().await.unwrap();
    assert_eq!(docs.status(), reqwest::StatusCode::OK);
    assert!(docs.text().await.unwrap().to_lowercase().contains("scalar"));
}
