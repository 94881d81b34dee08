//! Search session orchestration: debounce, sort mapping, result windowing,
//! stale-response discarding, and the reachability gate.
//!
//! Fetches run on spawned tasks and report back over a channel; the host
//! loop drains them with [`SearchOrchestrator::check_pending`], so every
//! state transition happens on the caller's thread.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, SortOrder, VideoSummary};
use crate::constants::constants;
use crate::error::CatalogError;
use crate::reachability::Reachability;

/// Sort options offered to the user, mapped onto remote orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOption {
  LatestUpload,
  OldestUpload,
  MostPopular,
}

impl SortOption {
  pub const ALL: [SortOption; 3] = [SortOption::LatestUpload, SortOption::OldestUpload, SortOption::MostPopular];

  /// The remote order parameter this option translates to.
  pub fn remote_order(self) -> SortOrder {
    match self {
      SortOption::LatestUpload | SortOption::OldestUpload => SortOrder::Date,
      SortOption::MostPopular => SortOrder::ViewCount,
    }
  }

  /// Whether the fetched sequence is reversed locally. The remote API has no
  /// ascending-date order, so oldest-first is newest-first flipped.
  pub fn reverses_locally(self) -> bool {
    matches!(self, SortOption::OldestUpload)
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOption::LatestUpload => "latest",
      SortOption::OldestUpload => "oldest",
      SortOption::MostPopular => "popular",
    }
  }

  pub fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "oldest" => SortOption::OldestUpload,
      "popular" => SortOption::MostPopular,
      _ => SortOption::LatestUpload,
    }
  }
}

/// Session lifecycle as a single tagged state. Task handles live beside the
/// phase as resources; the phase itself never holds booleans.
#[derive(Debug)]
pub enum SearchPhase {
  Idle,
  /// A keystroke landed; the debounce timer for the latest revision is live.
  Typing,
  Loading,
  Ready,
  Errored(CatalogError),
}

/// Which fetch a session last issued; a reconnect signal re-runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchKind {
  Search(String),
  Popular,
}

/// Events posted by the debounce timer and fetch tasks.
enum SessionEvent {
  DebounceElapsed { revision: u64 },
  FetchDone { generation: u64, result: Result<Vec<VideoSummary>, CatalogError> },
}

pub struct SearchOrchestrator {
  catalog: Arc<dyn Catalog>,
  reachability: Reachability,
  input: String,
  sort: SortOption,
  phase: SearchPhase,
  results: Vec<VideoSummary>,
  display_count: usize,
  /// Bumped on every keystroke; a debounce timer only applies when it
  /// carries the current value (a debounce, not a queue).
  input_revision: u64,
  /// Bumped on every issued fetch; only the last-issued generation's result
  /// is applied. The transport is not assumed cancellable, so superseded
  /// fetches complete and are discarded on arrival.
  generation: u64,
  last_fetch: Option<FetchKind>,
  debounce: Option<JoinHandle<()>>,
  fetch_task: Option<JoinHandle<()>>,
  events_tx: mpsc::UnboundedSender<SessionEvent>,
  events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SearchOrchestrator {
  pub fn new(catalog: Arc<dyn Catalog>, reachability: Reachability) -> Self {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    Self {
      catalog,
      reachability,
      input: String::new(),
      sort: SortOption::LatestUpload,
      phase: SearchPhase::Idle,
      results: Vec::new(),
      display_count: constants().initial_window,
      input_revision: 0,
      generation: 0,
      last_fetch: None,
      debounce: None,
      fetch_task: None,
      events_tx,
      events_rx,
    }
  }

  pub fn phase(&self) -> &SearchPhase {
    &self.phase
  }

  pub fn input(&self) -> &str {
    &self.input
  }

  pub fn sort(&self) -> SortOption {
    self.sort
  }

  pub fn result_count(&self) -> usize {
    self.results.len()
  }

  /// The window the UI renders: a prefix of the full result set.
  pub fn visible(&self) -> &[VideoSummary] {
    let end = self.display_count.min(self.results.len());
    &self.results[..end]
  }

  pub fn more_available(&self) -> bool {
    self.display_count < self.results.len()
  }

  /// Record a keystroke and restart the debounce window. Only the most
  /// recent keystroke's timer may trigger a fetch.
  pub fn on_keystroke(&mut self, input: &str) {
    self.input = input.to_string();
    self.input_revision += 1;
    self.phase = SearchPhase::Typing;
    self.cancel_debounce();

    let revision = self.input_revision;
    let tx = self.events_tx.clone();
    let window = Duration::from_millis(constants().search_debounce_ms);
    self.debounce = Some(tokio::spawn(async move {
      tokio::time::sleep(window).await;
      let _ = tx.send(SessionEvent::DebounceElapsed { revision });
    }));
  }

  /// Explicit submit: fetch immediately, skipping the debounce window.
  pub fn on_submit(&mut self) {
    self.cancel_debounce();
    self.begin_fetch();
  }

  /// Re-fetch under the new order mapping. Relevance of the result set
  /// depends on the remote order, so this is never a local re-sort.
  pub fn on_sort_change(&mut self, sort: SortOption) {
    if self.sort == sort {
      return;
    }
    self.sort = sort;
    if self.last_fetch.is_some() {
      self.begin_fetch();
    }
  }

  /// Grow the visible window. Purely local; no network call. The count may
  /// exceed the result-set length; `visible` clamps.
  pub fn on_show_more(&mut self) {
    if !matches!(self.phase, SearchPhase::Ready) {
      return;
    }
    self.display_count += constants().window_increment;
  }

  /// The probe transitioned unreachable → reachable: re-run whichever fetch
  /// was last attempted, same as an initial load.
  pub fn on_reconnect(&mut self) {
    let Some(kind) = self.last_fetch.clone() else { return };
    info!("network restored, re-running last fetch");
    self.start_fetch(kind);
  }

  /// Drain completed timers and fetch results, applying state transitions.
  pub fn check_pending(&mut self) {
    while let Ok(event) = self.events_rx.try_recv() {
      match event {
        SessionEvent::DebounceElapsed { revision } => {
          // An older timer may have fired before its abort landed, and a
          // submit may already have raced past the debounce.
          if revision != self.input_revision || !matches!(self.phase, SearchPhase::Typing) {
            continue;
          }
          self.begin_fetch();
        }
        SessionEvent::FetchDone { generation, result } => {
          if generation != self.generation {
            debug!(generation, current = self.generation, "discarding superseded fetch result");
            continue;
          }
          match result {
            Ok(mut items) => {
              if self.sort.reverses_locally() {
                items.reverse();
              }
              info!(count = items.len(), sort = self.sort.label(), "fetch applied");
              self.results = items;
              self.display_count = constants().initial_window;
              self.phase = SearchPhase::Ready;
            }
            Err(e) => {
              // Listing calls absorb expected failures, so only genuinely
              // unexpected errors (e.g. a missing API key) land here.
              warn!(err = %e, "fetch failed");
              self.phase = SearchPhase::Errored(e);
            }
          }
        }
      }
    }
  }

  /// Clear session resources on teardown. The debounce timer must never
  /// fire after the session is gone.
  pub fn teardown(&mut self) {
    self.cancel_debounce();
    if let Some(handle) = self.fetch_task.take() {
      handle.abort();
    }
    self.phase = SearchPhase::Idle;
  }

  fn cancel_debounce(&mut self) {
    if let Some(handle) = self.debounce.take() {
      handle.abort();
    }
  }

  /// Route the current input: a non-empty trimmed query searches, an empty
  /// one falls back to the popular catalog view (not an error).
  fn begin_fetch(&mut self) {
    let query = self.input.trim();
    let kind = if query.is_empty() { FetchKind::Popular } else { FetchKind::Search(query.to_string()) };
    self.start_fetch(kind);
  }

  fn start_fetch(&mut self, kind: FetchKind) {
    self.last_fetch = Some(kind.clone());
    self.generation += 1;
    let generation = self.generation;

    if !self.reachability.is_reachable() {
      // Offline: degrade to an empty catalog instead of issuing a doomed
      // call. The remembered fetch kind is re-run on the reconnect signal.
      warn!(generation, "network unreachable, skipping fetch");
      self.results.clear();
      self.display_count = constants().initial_window;
      self.phase = SearchPhase::Ready;
      return;
    }

    self.phase = SearchPhase::Loading;
    let order = self.sort.remote_order();
    let catalog = Arc::clone(&self.catalog);
    let tx = self.events_tx.clone();
    // Overwriting the handle detaches any superseded fetch; it completes in
    // the background and its stale generation is discarded on arrival.
    self.fetch_task = Some(tokio::spawn(async move {
      let result = match kind {
        FetchKind::Search(query) => catalog.search(&query, constants().search_max_results, order).await,
        FetchKind::Popular => catalog.popular(constants().popular_max_results).await,
      };
      let _ = tx.send(SessionEvent::FetchDone { generation, result });
    }));
  }
}
