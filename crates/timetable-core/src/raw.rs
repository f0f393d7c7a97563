//! The upstream payload, kept verbatim, and the typed view the normalizer
//! reads through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, schedule::WeekId};

/// The upstream timetable response, exactly as received.
///
/// Never mutated; every cache write re-serializes it unchanged. It is the only
/// input re-normalization ever reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Value);

impl RawPayload {
  pub fn new(value: Value) -> Self { Self(value) }

  pub fn as_value(&self) -> &Value { &self.0 }

  pub fn into_value(self) -> Value { self.0 }

  pub fn from_json_str(s: &str) -> Result<Self> { Ok(Self(serde_json::from_str(s)?)) }

  pub fn to_json_string(&self) -> Result<String> { Ok(serde_json::to_string(&self.0)?) }

  /// The top-level `data` container, if present and not `null`.
  pub(crate) fn data(&self) -> Option<&Value> {
    self.0.get("data").filter(|v| !v.is_null())
  }
}

impl From<Value> for RawPayload {
  fn from(value: Value) -> Self { Self(value) }
}

// ─── Typed view ──────────────────────────────────────────────────────────────

/// Contents of the `data` container.
///
/// List items stay as [`Value`]s and are decoded one at a time, so a single
/// unreadable item costs only itself.
#[derive(Debug, Deserialize)]
pub(crate) struct RawData {
  #[serde(rename = "ds_tiet_trong_ngay", default)]
  pub periods: Option<Vec<Value>>,
  #[serde(rename = "ds_tuan_tkb", default)]
  pub weeks:   Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPeriod {
  #[serde(rename = "tiet")]
  pub number: u32,
  #[serde(rename = "gio_bat_dau", default)]
  pub start:  Option<String>,
  #[serde(rename = "gio_ket_thuc", default)]
  pub end:    Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWeek {
  #[serde(rename = "tuan_hoc_ky")]
  pub id:       WeekId,
  #[serde(rename = "ds_thoi_khoa_bieu", default)]
  pub sessions: Option<Vec<Value>>,
}

/// One class session: a subject on one day, `span` periods from `start`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSession {
  #[serde(rename = "thu_kieu_so")]
  pub day_code:     i64,
  #[serde(rename = "tiet_bat_dau")]
  pub start_period: i64,
  #[serde(rename = "so_tiet")]
  pub span:         i64,
  #[serde(rename = "ten_mon", default)]
  pub subject_name: Option<String>,
  #[serde(rename = "ma_mon", default)]
  pub subject_code: Option<String>,
  #[serde(rename = "ngay_hoc", default)]
  pub date:         Option<String>,
}
