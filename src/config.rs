use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Environment variable consulted before the config file for the API key.
pub const API_KEY_ENV: &str = "TUBENOTE_API_KEY";

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
  pub api_key: Option<String>,
  pub default_sort: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "tubenote") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "tubenote") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }
}

/// Source of the catalog API credential.
///
/// Implementations read the key fresh on every call — the key is never held
/// in client or module state, so a rotated credential takes effect without
/// restarting the process.
pub trait ApiKeyProvider: Send + Sync {
  fn api_key(&self) -> Option<String>;
}

/// The default provider: `TUBENOTE_API_KEY` from the environment, falling
/// back to the config file. Both lookups happen on every call.
pub struct ProcessKeyProvider;

impl ApiKeyProvider for ProcessKeyProvider {
  fn api_key(&self) -> Option<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV)
      && !key.trim().is_empty()
    {
      return Some(key);
    }
    Config::load().api_key.filter(|k| !k.trim().is_empty())
  }
}

/// A fixed key, used by the `--api-key` CLI override and by tests.
pub struct StaticKeyProvider(pub String);

impl ApiKeyProvider for StaticKeyProvider {
  fn api_key(&self) -> Option<String> {
    Some(self.0.clone())
  }
}
