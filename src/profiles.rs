//! Profiles from the OCI CLI/SDK config file.
//!
//! The file is INI-like: `[NAME]` headers followed by `key=value` lines. Values
//! under `[DEFAULT]` apply to every other profile unless overridden.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::expand_home;
use crate::error::AppError;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Credentials and region for one named profile.
#[derive(Clone, Debug, PartialEq)]
pub struct OciProfile {
  pub name: String,
  pub user: String,
  pub fingerprint: String,
  pub key_file: PathBuf,
  pub tenancy: String,
  pub region: String,
  pub pass_phrase: Option<String>,
}

impl OciProfile {
  pub fn key_id(&self) -> String {
    format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
  }
}

/// Section names in file order. Never fails: a missing or unreadable file
/// yields the default profile alone.
pub fn list_profiles(path: &Path) -> Vec<String> {
  let Ok(data) = std::fs::read_to_string(path) else {
    return vec![DEFAULT_PROFILE.to_string()];
  };
  data
    .lines()
    .filter(|line| line.starts_with('['))
    .map(|line| line.trim().trim_matches(|c| c == '[' || c == ']').to_string())
    .collect()
}

pub fn load_profile(path: &Path, name: &str) -> Result<OciProfile, AppError> {
  let data = std::fs::read_to_string(path).map_err(|err| {
    AppError::ConfigMissing(format!("cannot read OCI config {}: {err}", path.display()))
  })?;
  let sections = parse_sections(&data);

  let mut values: HashMap<&str, &str> = HashMap::new();
  if let Some(defaults) = sections.get(DEFAULT_PROFILE) {
    values.extend(defaults.iter().map(|(k, v)| (*k, *v)));
  }
  if name != DEFAULT_PROFILE {
    let section = sections.get(name).ok_or_else(|| {
      AppError::ConfigMissing(format!("profile {name} not found in {}", path.display()))
    })?;
    values.extend(section.iter().map(|(k, v)| (*k, *v)));
  } else if !sections.contains_key(DEFAULT_PROFILE) {
    return Err(AppError::ConfigMissing(format!(
      "profile {name} not found in {}",
      path.display()
    )));
  }

  let required = |key: &str| -> Result<String, AppError> {
    values
      .get(key)
      .filter(|v| !v.is_empty())
      .map(|v| v.to_string())
      .ok_or_else(|| AppError::ConfigMissing(format!("profile {name} is missing `{key}`")))
  };

  Ok(OciProfile {
    name: name.to_string(),
    user: required("user")?,
    fingerprint: required("fingerprint")?,
    key_file: expand_home(&required("key_file")?),
    tenancy: required("tenancy")?,
    region: required("region")?,
    pass_phrase: values
      .get("pass_phrase")
      .filter(|v| !v.is_empty())
      .map(|v| v.to_string()),
  })
}

fn parse_sections(data: &str) -> HashMap<&str, Vec<(&str, &str)>> {
  let mut sections: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
  let mut current: Option<&str> = None;

  for line in data.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
      continue;
    }
    if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
      let header = header.trim();
      sections.entry(header).or_default();
      current = Some(header);
      continue;
    }
    let (Some(section), Some((key, value))) = (current, line.split_once('=')) else {
      continue;
    };
    sections
      .entry(section)
      .or_default()
      .push((key.trim(), value.trim()));
  }

  sections
}
