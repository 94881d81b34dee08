//! Per-video note storage.
//!
//! Notes are keyed by video id; each key holds its notes in insertion order
//! and is replaced wholesale on write (last-write-wins per key, no
//! cross-key guarantees).

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A single timestamped note attached to a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub text: String,
  pub timestamp_seconds: f64,
}

/// Keyed note persistence, consumed by the app as an external collaborator.
pub trait NotesStore: Send + Sync {
  fn get(&self, video_id: &str) -> Result<Vec<Note>>;
  fn put(&self, video_id: &str, notes: Vec<Note>) -> Result<()>;
}

/// JSON-file-backed store under the platform data directory. The whole map
/// is read and rewritten per operation; note volumes here are tiny.
pub struct FileNotesStore {
  path: PathBuf,
}

impl FileNotesStore {
  pub fn open_default() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "tubenote").context("No usable home directory for the notes store")?;
    Self::open(proj_dirs.data_dir().join("notes.json"))
  }

  pub fn open(path: PathBuf) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).with_context(|| format!("Failed to create notes directory {}", parent.display()))?;
    }
    Ok(Self { path })
  }

  fn load_map(&self) -> Result<HashMap<String, Vec<Note>>> {
    match std::fs::read_to_string(&self.path) {
      Ok(content) => serde_json::from_str(&content)
        .with_context(|| format!("Notes file {} is not valid JSON", self.path.display())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
      Err(e) => Err(e).with_context(|| format!("Failed to read notes file {}", self.path.display())),
    }
  }

  fn save_map(&self, map: &HashMap<String, Vec<Note>>) -> Result<()> {
    let content = serde_json::to_string_pretty(map).context("Failed to serialise notes")?;
    std::fs::write(&self.path, content).with_context(|| format!("Failed to write notes file {}", self.path.display()))
  }
}

impl NotesStore for FileNotesStore {
  fn get(&self, video_id: &str) -> Result<Vec<Note>> {
    Ok(self.load_map()?.remove(video_id).unwrap_or_default())
  }

  fn put(&self, video_id: &str, notes: Vec<Note>) -> Result<()> {
    let mut map = self.load_map()?;
    map.insert(video_id.to_string(), notes);
    self.save_map(&map)
  }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryNotesStore {
  inner: Mutex<HashMap<String, Vec<Note>>>,
}

impl NotesStore for MemoryNotesStore {
  fn get(&self, video_id: &str) -> Result<Vec<Note>> {
    let map = self.inner.lock().expect("notes map lock");
    Ok(map.get(video_id).cloned().unwrap_or_default())
  }

  fn put(&self, video_id: &str, notes: Vec<Note>) -> Result<()> {
    let mut map = self.inner.lock().expect("notes map lock");
    map.insert(video_id.to_string(), notes);
    Ok(())
  }
}
