//! Tests for the video-catalog client against a mock HTTP server.
//!
//! Covers the request parameters the client constructs, the empty-query
//! short-circuit, the absorb-vs-raise failure policy, and status-code
//! classification for the detail lookup.

use std::sync::Arc;
use tubenote::catalog::{Catalog, CatalogClient, SortOrder};
use tubenote::config::{ApiKeyProvider, StaticKeyProvider};
use tubenote::constants::constants;
use tubenote::error::CatalogError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoKeyProvider;

impl ApiKeyProvider for NoKeyProvider {
  fn api_key(&self) -> Option<String> {
    None
  }
}

fn client(server: &MockServer) -> CatalogClient {
  CatalogClient::with_base_url(Arc::new(StaticKeyProvider("test-key".to_string())), server.uri()).expect("client builds")
}

fn keyless_client(server: &MockServer) -> CatalogClient {
  CatalogClient::with_base_url(Arc::new(NoKeyProvider), server.uri()).expect("client builds")
}

/// An unreachable endpoint: nothing listens on port 1.
fn offline_client() -> CatalogClient {
  CatalogClient::with_base_url(Arc::new(StaticKeyProvider("test-key".to_string())), "http://127.0.0.1:1")
    .expect("client builds")
}

fn search_item(id: &str, title: &str) -> serde_json::Value {
  serde_json::json!({
    "id": { "videoId": id },
    "snippet": {
      "title": title,
      "description": format!("{title} description"),
      "channelTitle": "Test Channel",
      "publishedAt": "2024-05-01T10:00:00Z",
      "thumbnails": { "medium": { "url": format!("https://img.example/{id}.jpg") } }
    }
  })
}

fn search_body(items: &[serde_json::Value]) -> serde_json::Value {
  serde_json::json!({ "items": items })
}

mod search {
  use super::*;

  #[tokio::test]
  async fn sends_the_expected_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/search"))
      .and(query_param("part", "snippet"))
      .and(query_param("q", "react hooks"))
      .and(query_param("type", "video"))
      .and(query_param("maxResults", "50"))
      .and(query_param("order", "viewCount"))
      .and(query_param("key", "test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[
        search_item("v1", "Hooks in depth"),
        search_item("v2", "useEffect explained"),
        search_item("v3", "Custom hooks"),
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let results = client(&server).search("react hooks", 50, SortOrder::ViewCount).await.expect("search");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "v1");
    assert_eq!(results[0].channel_name, "Test Channel");
  }

  #[tokio::test]
  async fn whitespace_query_short_circuits_without_a_network_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let results = client(&server).search("   \t ", 50, SortOrder::Date).await.expect("search");
    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn query_whitespace_is_trimmed_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/search"))
      .and(query_param("q", "rust"))
      .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[search_item("v1", "Rust 101")])))
      .expect(1)
      .mount(&server)
      .await;

    let results = client(&server).search("  rust  ", 50, SortOrder::Date).await.expect("search");
    assert_eq!(results.len(), 1);
  }

  #[tokio::test]
  async fn http_failures_degrade_to_empty_results() {
    for status in [400u16, 403, 429, 500, 503] {
      let server = MockServer::start().await;
      Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

      let results = client(&server).search("anything", 50, SortOrder::Date).await.expect("search");
      assert!(results.is_empty(), "status {status} should degrade to empty results");
    }
  }

  #[tokio::test]
  async fn connection_failures_degrade_to_empty_results() {
    let results = offline_client().search("anything", 50, SortOrder::Date).await.expect("search");
    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn a_missing_api_key_raises_before_any_io() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let err = keyless_client(&server).search("anything", 50, SortOrder::Date).await.unwrap_err();
    assert!(matches!(err, CatalogError::MissingApiKey));
  }

  #[tokio::test]
  async fn empty_item_list_is_a_valid_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/search"))
      .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[])))
      .mount(&server)
      .await;

    let results = client(&server).search("very obscure", 50, SortOrder::Date).await.expect("search");
    assert!(results.is_empty());
  }
}

mod popular {
  use super::*;

  #[tokio::test]
  async fn uses_the_seed_query_and_view_count_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/search"))
      .and(query_param("q", constants().popular_seed_query.as_str()))
      .and(query_param("order", "viewCount"))
      .and(query_param("maxResults", "25"))
      .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[search_item("p1", "Popular pick")])))
      .expect(1)
      .mount(&server)
      .await;

    let results = client(&server).popular(25).await.expect("popular");
    assert_eq!(results.len(), 1);
  }

  #[tokio::test]
  async fn failures_degrade_to_empty_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

    let results = client(&server).popular(25).await.expect("popular");
    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn a_missing_api_key_raises() {
    let server = MockServer::start().await;
    let err = keyless_client(&server).popular(25).await.unwrap_err();
    assert!(matches!(err, CatalogError::MissingApiKey));
  }
}

mod detail {
  use super::*;

  fn detail_body(id: &str, with_statistics: bool) -> serde_json::Value {
    let mut item = serde_json::json!({
      "id": id,
      "snippet": {
        "title": "Ownership and Borrowing",
        "description": "The core of the language",
        "channelTitle": "Rustacean Station"
      }
    });
    if with_statistics {
      item["statistics"] = serde_json::json!({ "viewCount": "123456", "likeCount": "789" });
    }
    serde_json::json!({ "items": [item] })
  }

  #[tokio::test]
  async fn returns_counts_when_statistics_are_present() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/videos"))
      .and(query_param("part", "snippet,statistics"))
      .and(query_param("id", "v42"))
      .and(query_param("key", "test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("v42", true)))
      .expect(1)
      .mount(&server)
      .await;

    let detail = client(&server).video_detail("v42").await.expect("detail");
    assert_eq!(detail.id, "v42");
    assert_eq!(detail.title, "Ownership and Borrowing");
    assert_eq!(detail.view_count, Some(123_456));
    assert_eq!(detail.like_count, Some(789));
  }

  #[tokio::test]
  async fn omits_counts_without_statistics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("v42", false)))
      .mount(&server)
      .await;

    let detail = client(&server).video_detail("v42").await.expect("detail");
    assert_eq!(detail.view_count, None);
    assert_eq!(detail.like_count, None);
  }

  #[tokio::test]
  async fn an_empty_item_list_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
      .mount(&server)
      .await;

    let err = client(&server).video_detail("missing").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound));
  }

  #[tokio::test]
  async fn classifies_http_status_codes() {
    let cases: [(u16, fn(&CatalogError) -> bool); 5] = [
      (400, |e| matches!(e, CatalogError::BadRequest(_))),
      (403, |e| matches!(e, CatalogError::Configuration { status: 403, .. })),
      (404, |e| matches!(e, CatalogError::NotFound)),
      (429, |e| matches!(e, CatalogError::RateLimited)),
      (500, |e| matches!(e, CatalogError::Server { status: 500, .. })),
    ];

    for (status, check) in cases {
      let server = MockServer::start().await;
      Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

      let err = client(&server).video_detail("v42").await.unwrap_err();
      assert!(check(&err), "status {status} classified as {err:?}");
    }
  }

  #[tokio::test]
  async fn an_empty_id_is_rejected_without_io() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let err = client(&server).video_detail("  ").await.unwrap_err();
    assert!(matches!(err, CatalogError::BadRequest(_)));
  }

  #[tokio::test]
  async fn connection_failure_is_network_unavailable() {
    let err = offline_client().video_detail("v42").await.unwrap_err();
    assert!(matches!(err, CatalogError::NetworkUnavailable(_)));
  }

  #[tokio::test]
  async fn a_missing_api_key_raises() {
    let server = MockServer::start().await;
    let err = keyless_client(&server).video_detail("v42").await.unwrap_err();
    assert!(matches!(err, CatalogError::MissingApiKey));
  }
}
