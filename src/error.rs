use reqwest::StatusCode;
use thiserror::Error;

/// Classified failures from the video-catalog API.
///
/// List-producing calls absorb most of these into an empty result set (see
/// `catalog`); the single-video detail call surfaces them so the caller can
/// render the specific failure.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// No route to the catalog, connection refused, or the 10s timeout expired.
  #[error("network unavailable: {0}")]
  NetworkUnavailable(String),

  /// The catalog rejected our credential (HTTP 403).
  #[error("catalog rejected the API key or permissions ({status}): {message}")]
  Configuration { status: u16, message: String },

  /// No API key in process configuration. Checked fresh on every call.
  #[error("no API key configured (set TUBENOTE_API_KEY or add api_key to prefs.toml)")]
  MissingApiKey,

  /// The requested video does not exist (HTTP 404 or an empty item list).
  #[error("video not found")]
  NotFound,

  /// HTTP 429 from the catalog.
  #[error("rate limited by the catalog API")]
  RateLimited,

  /// Any HTTP 5xx from the catalog.
  #[error("catalog server error ({status}): {message}")]
  Server { status: u16, message: String },

  /// HTTP 400, or a request we refuse to send (e.g. an empty video id).
  #[error("bad request: {0}")]
  BadRequest(String),

  /// Everything else, including malformed response payloads.
  #[error("unexpected catalog failure: {0}")]
  Unknown(String),
}

impl CatalogError {
  /// Classify a non-success HTTP status.
  pub fn from_status(status: StatusCode, message: String) -> Self {
    match status.as_u16() {
      400 => CatalogError::BadRequest(message),
      403 => CatalogError::Configuration { status: 403, message },
      404 => CatalogError::NotFound,
      429 => CatalogError::RateLimited,
      s if s >= 500 => CatalogError::Server { status: s, message },
      s => CatalogError::Unknown(format!("unexpected status {s}: {message}")),
    }
  }

  /// Classify a transport-level failure. Timeouts count as "network
  /// unavailable": once the 10s request limit is spent there is no useful
  /// distinction for the caller.
  pub fn from_transport(err: reqwest::Error) -> Self {
    if err.is_timeout() || err.is_connect() {
      CatalogError::NetworkUnavailable(err.to_string())
    } else {
      CatalogError::Unknown(err.to_string())
    }
  }
}
