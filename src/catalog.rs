//! Client for the remote video-catalog REST API.
//!
//! Three operations: keyword search, the popular fallback listing, and a
//! single-video detail lookup. The listing operations degrade to an empty
//! result set on expected failures (a blank list is an acceptable fallback
//! for search); the detail lookup surfaces a classified [`CatalogError`]
//! because an empty detail page has no sensible rendering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiKeyProvider;
use crate::constants::constants;
use crate::error::CatalogError;

/// A single entry from a search or popular listing.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSummary {
  pub id: String,
  pub title: String,
  pub description: String,
  pub channel_name: String,
  pub thumbnail_url: String,
  pub published_at: DateTime<Utc>,
}

/// Full record for one video, fetched on demand for the detail view.
/// The counters are present only when the remote payload carried them.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetail {
  pub id: String,
  pub title: String,
  pub description: String,
  pub channel_name: String,
  pub view_count: Option<u64>,
  pub like_count: Option<u64>,
}

/// Sort orders the remote search endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  Date,
  ViewCount,
  Relevance,
}

impl SortOrder {
  pub fn as_param(self) -> &'static str {
    match self {
      SortOrder::Date => "date",
      SortOrder::ViewCount => "viewCount",
      SortOrder::Relevance => "relevance",
    }
  }
}

/// The catalog operations the search layer depends on. A trait seam so the
/// orchestrator can be driven by a stub in tests.
#[async_trait]
pub trait Catalog: Send + Sync {
  async fn search(&self, query: &str, max_results: u32, order: SortOrder) -> Result<Vec<VideoSummary>, CatalogError>;
  async fn popular(&self, max_results: u32) -> Result<Vec<VideoSummary>, CatalogError>;
  async fn video_detail(&self, video_id: &str) -> Result<VideoDetail, CatalogError>;
}

pub struct CatalogClient {
  http: Client,
  base_url: String,
  keys: Arc<dyn ApiKeyProvider>,
}

impl CatalogClient {
  pub fn new(keys: Arc<dyn ApiKeyProvider>) -> Result<Self, CatalogError> {
    Self::with_base_url(keys, constants().api_base_url.clone())
  }

  /// Client against an explicit base URL (tests point this at a mock server).
  pub fn with_base_url(keys: Arc<dyn ApiKeyProvider>, base_url: impl Into<String>) -> Result<Self, CatalogError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(format!("tubenote/{}", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| CatalogError::Unknown(e.to_string()))?;
    Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), keys })
  }

  /// Resolve the credential, fresh on every call. A rotated key takes effect
  /// on the next request without restarting the process.
  fn require_key(&self) -> Result<String, CatalogError> {
    self.keys.api_key().ok_or(CatalogError::MissingApiKey)
  }

  async fn run_search(
    &self,
    query: &str,
    max_results: u32,
    order: SortOrder,
    key: &str,
  ) -> Result<Vec<VideoSummary>, CatalogError> {
    let url = format!("{}/search", self.base_url);
    let max_results = max_results.to_string();
    let response = self
      .http
      .get(&url)
      .query(&[
        ("part", "snippet"),
        ("q", query),
        ("type", "video"),
        ("maxResults", max_results.as_str()),
        ("order", order.as_param()),
        ("key", key),
      ])
      .send()
      .await
      .map_err(CatalogError::from_transport)?;
    let response = check_status(response).await?;
    let body: SearchResponse =
      response.json().await.map_err(|e| CatalogError::Unknown(format!("malformed search payload: {e}")))?;
    // Entries without a video id or snippet are unrenderable; skip them.
    Ok(body.items.into_iter().filter_map(SearchItem::into_summary).collect())
  }
}

#[async_trait]
impl Catalog for CatalogClient {
  async fn search(&self, query: &str, max_results: u32, order: SortOrder) -> Result<Vec<VideoSummary>, CatalogError> {
    let query = query.trim();
    if query.is_empty() {
      // Empty input yields empty output, without touching the network. An
      // earlier revision substituted a default query here; that produced
      // surprise results and is rejected.
      return Ok(Vec::new());
    }
    let key = self.require_key()?;
    debug!(query = %query, max_results, order = order.as_param(), "catalog search");
    match self.run_search(query, max_results, order, &key).await {
      Ok(items) => Ok(items),
      Err(e) => {
        // The key already resolved, so everything past that point is an
        // expected, absorbable failure: degrade to "no results".
        warn!(err = %e, query = %query, "search degraded to empty results");
        Ok(Vec::new())
      }
    }
  }

  async fn popular(&self, max_results: u32) -> Result<Vec<VideoSummary>, CatalogError> {
    let key = self.require_key()?;
    let seed = constants().popular_seed_query.as_str();
    debug!(max_results, "catalog popular listing");
    match self.run_search(seed, max_results, SortOrder::ViewCount, &key).await {
      Ok(items) => Ok(items),
      Err(e) => {
        warn!(err = %e, "popular listing degraded to empty results");
        Ok(Vec::new())
      }
    }
  }

  async fn video_detail(&self, video_id: &str) -> Result<VideoDetail, CatalogError> {
    let video_id = video_id.trim();
    if video_id.is_empty() {
      return Err(CatalogError::BadRequest("video id must not be empty".to_string()));
    }
    let key = self.require_key()?;
    debug!(video_id = %video_id, "catalog detail lookup");
    let url = format!("{}/videos", self.base_url);
    let response = self
      .http
      .get(&url)
      .query(&[("part", "snippet,statistics"), ("id", video_id), ("key", key.as_str())])
      .send()
      .await
      .map_err(CatalogError::from_transport)?;
    let response = check_status(response).await?;
    let body: VideoListResponse =
      response.json().await.map_err(|e| CatalogError::Unknown(format!("malformed video payload: {e}")))?;
    // A well-formed 200 with no items means the id does not exist.
    let item = body.items.into_iter().next().ok_or(CatalogError::NotFound)?;
    let snippet = item.snippet.unwrap_or_default();
    Ok(VideoDetail {
      id: item.id,
      title: snippet.title,
      description: snippet.description,
      channel_name: snippet.channel_title,
      view_count: item.statistics.as_ref().and_then(Statistics::view_count),
      like_count: item.statistics.as_ref().and_then(Statistics::like_count),
    })
  }
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let message = response.text().await.unwrap_or_default();
  Err(CatalogError::from_status(status, message))
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
  #[serde(default)]
  items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  id: Option<SearchItemId>,
  snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
  #[serde(rename = "videoId")]
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  #[serde(default)]
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  channel_title: String,
  published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  #[serde(default)]
  url: String,
}

impl SearchItem {
  fn into_summary(self) -> Option<VideoSummary> {
    let id = self.id?.video_id?;
    let snippet = self.snippet?;
    let published_at = snippet.published_at?;
    Some(VideoSummary {
      id,
      title: snippet.title,
      description: snippet.description,
      channel_name: snippet.channel_title,
      thumbnail_url: snippet.thumbnails.medium.map(|t| t.url).unwrap_or_default(),
      published_at,
    })
  }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
  #[serde(default)]
  items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
  id: String,
  snippet: Option<VideoSnippet>,
  statistics: Option<Statistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
  #[serde(default)]
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  channel_title: String,
}

/// The remote API serialises the counters as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  view_count: Option<String>,
  like_count: Option<String>,
}

impl Statistics {
  fn view_count(&self) -> Option<u64> {
    self.view_count.as_deref().and_then(|s| s.parse().ok())
  }

  fn like_count(&self) -> Option<u64> {
    self.like_count.as_deref().and_then(|s| s.parse().ok())
  }
}
