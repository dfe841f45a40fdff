use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INFERENCE_ENDPOINT: &str =
  "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com";

/// Sampling parameters sent with every chat request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
  pub max_tokens: u32,
  pub temperature: f64,
  pub top_p: f64,
  pub frequency_penalty: f64,
  pub presence_penalty: f64,
}

impl Default for GenerationParams {
  fn default() -> Self {
    Self {
      max_tokens: 1500,
      temperature: 0.7,
      top_p: 0.85,
      frequency_penalty: 0.0,
      presence_penalty: 0.0,
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
  pub listen_addr: String,
  pub oci_config_path: String,
  pub inference_endpoint: String,
  /// Overrides the region-derived model listing endpoint.
  pub management_endpoint: Option<String>,
  pub connect_timeout_secs: u64,
  pub read_timeout_secs: u64,
  pub generation: GenerationParams,
  pub log_file: Option<PathBuf>,
  /// Sessions untouched for this long are dropped when a page opens.
  pub session_idle_secs: u64,
  pub max_sessions: usize,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      listen_addr: "127.0.0.1:8501".to_string(),
      oci_config_path: "~/.oci/config".to_string(),
      inference_endpoint: DEFAULT_INFERENCE_ENDPOINT.to_string(),
      management_endpoint: None,
      connect_timeout_secs: 10,
      read_timeout_secs: 240,
      generation: GenerationParams::default(),
      log_file: None,
      session_idle_secs: 3600,
      max_sessions: 64,
    }
  }
}

impl AppConfig {
  pub fn oci_config_path(&self) -> PathBuf {
    expand_home(&self.oci_config_path)
  }
}

/// Location of the app's own settings file.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
  let dir = dirs::config_dir().context("missing platform config dir")?;
  Ok(dir.join("oci-vision-ocr").join("config.json"))
}

pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)?;
    let config: AppConfig =
      serde_json::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
  } else {
    let config = AppConfig::default();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json)?;
  Ok(())
}

/// Expands a leading `~` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
  let home = dirs::home_dir();
  match (path.strip_prefix('~'), home) {
    (Some(""), Some(home)) => home,
    (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
      home.join(&rest[1..])
    }
    _ => PathBuf::from(path),
  }
}
