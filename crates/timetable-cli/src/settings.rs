//! Runtime configuration: an optional TOML file layered under `TIMETABLE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::TimeDelta;
use serde::Deserialize;

use crate::client::UpstreamConfig;

/// Runtime settings, deserialised from `timetable.toml` and the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub base_url:      String,
  #[serde(default)]
  pub username:      String,
  #[serde(default)]
  pub password:      String,
  /// Semester code sent as `hoc_ky`, e.g. `20241`.
  pub semester:      u32,
  #[serde(default = "default_store_path")]
  pub store_path:    PathBuf,
  /// Cache age after which the timetable is refetched.
  #[serde(default = "default_max_age_hours")]
  pub max_age_hours: i64,
  #[serde(default = "default_page_limit")]
  pub page_limit:    u32,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.cache/timetable/cache.sqlite") }

fn default_max_age_hours() -> i64 { 7 * 24 }

fn default_page_limit() -> u32 { 100 }

impl Settings {
  /// Read `path` (if it exists), then apply `TIMETABLE_*` overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TIMETABLE"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn max_age(&self) -> TimeDelta { TimeDelta::hours(self.max_age_hours) }

  pub fn upstream(&self) -> UpstreamConfig {
    UpstreamConfig {
      base_url:   self.base_url.clone(),
      username:   self.username.clone(),
      password:   self.password.clone(),
      semester:   self.semester,
      page_limit: self.page_limit,
    }
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
