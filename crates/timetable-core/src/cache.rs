//! [`CacheStore`] — the persisted copies of the raw payload and the
//! normalized schedule, plus the time of the last fetch.
//!
//! Three slots in a [`KeyValueStore`]:
//!
//! | key                    | value                              |
//! |------------------------|------------------------------------|
//! | `timetable.raw`        | raw payload, JSON text, verbatim   |
//! | `timetable.schedule`   | normalized schedule, JSON text     |
//! | `timetable.last_fetch` | epoch milliseconds, decimal text   |
//!
//! The normalized slot is returned as stored. It is never re-derived from the
//! raw slot, so a schedule written by an older normalizer stays in place
//! until the next fetch overwrites it.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use crate::{
  Error, Result,
  raw::RawPayload,
  schedule::Schedule,
  store::KeyValueStore,
};

pub const RAW_KEY: &str = "timetable.raw";
pub const SCHEDULE_KEY: &str = "timetable.schedule";
pub const LAST_FETCH_KEY: &str = "timetable.last_fetch";

/// Seven days, in milliseconds.
pub const DEFAULT_MAX_AGE_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// The staleness threshold used when none is configured.
pub fn default_max_age() -> TimeDelta { TimeDelta::milliseconds(DEFAULT_MAX_AGE_MILLIS) }

/// Typed access to the three cache slots of a [`KeyValueStore`].
#[derive(Debug)]
pub struct CacheStore<K> {
  kv: K,
}

impl<K: KeyValueStore> CacheStore<K> {
  pub fn new(kv: K) -> Self { Self { kv } }

  pub fn kv(&self) -> &K { &self.kv }

  /// The cached normalized schedule. A missing or unreadable slot reads as
  /// `None`.
  pub async fn load(&self) -> Result<Option<Schedule>> {
    let Some(text) = self.kv.get(SCHEDULE_KEY).await.map_err(Error::store)? else {
      return Ok(None);
    };
    match serde_json::from_str(&text) {
      Ok(schedule) => Ok(Some(schedule)),
      Err(e) => {
        warn!(key = SCHEDULE_KEY, error = %e, "discarding unreadable cache slot");
        Ok(None)
      }
    }
  }

  /// The cached raw payload. A missing or unreadable slot reads as `None`.
  pub async fn load_raw(&self) -> Result<Option<RawPayload>> {
    let Some(text) = self.kv.get(RAW_KEY).await.map_err(Error::store)? else {
      return Ok(None);
    };
    match RawPayload::from_json_str(&text) {
      Ok(raw) => Ok(Some(raw)),
      Err(e) => {
        warn!(key = RAW_KEY, error = %e, "discarding unreadable cache slot");
        Ok(None)
      }
    }
  }

  /// When the cache was last written. A missing or unreadable slot reads as
  /// `None`.
  pub async fn last_fetch(&self) -> Result<Option<DateTime<Utc>>> {
    let Some(text) = self.kv.get(LAST_FETCH_KEY).await.map_err(Error::store)? else {
      return Ok(None);
    };
    let parsed = text
      .trim()
      .parse::<i64>()
      .ok()
      .and_then(DateTime::from_timestamp_millis);
    if parsed.is_none() {
      warn!(key = LAST_FETCH_KEY, value = %text, "discarding unreadable cache slot");
    }
    Ok(parsed)
  }

  /// Persist `raw` verbatim, `schedule`, and the current time.
  pub async fn save(&self, raw: &RawPayload, schedule: &Schedule) -> Result<()> {
    self.save_at(raw, schedule, Utc::now()).await
  }

  /// [`save`](Self::save) with an explicit timestamp.
  ///
  /// All three slots are written before this returns. Whether a failure part
  /// way through can leave them disagreeing depends on the backend's
  /// [`KeyValueStore::set_many`].
  pub async fn save_at(
    &self,
    raw: &RawPayload,
    schedule: &Schedule,
    now: DateTime<Utc>,
  ) -> Result<()> {
    let raw_text = raw.to_json_string()?;
    let schedule_text = serde_json::to_string(schedule)?;
    let stamp = now.timestamp_millis().to_string();

    self
      .kv
      .set_many(vec![
        (RAW_KEY.to_owned(), raw_text),
        (SCHEDULE_KEY.to_owned(), schedule_text),
        (LAST_FETCH_KEY.to_owned(), stamp),
      ])
      .await
      .map_err(Error::store)?;

    info!(
      weeks = schedule.weekly_schedules.len(),
      at = %now,
      "timetable cache written"
    );
    Ok(())
  }

  /// Whether the cache is older than `max_age` right now.
  pub async fn is_stale(&self, max_age: TimeDelta) -> Result<bool> {
    self.is_stale_at(Utc::now(), max_age).await
  }

  /// Whether the cache is older than `max_age` at `now`. A cache that was
  /// never written is stale. An age of exactly `max_age` is still fresh.
  pub async fn is_stale_at(&self, now: DateTime<Utc>, max_age: TimeDelta) -> Result<bool> {
    Ok(match self.last_fetch().await? {
      Some(last) => now - last > max_age,
      None => true,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::{
    normalize::normalize,
    schedule::{ClassEntry, WeekGrid, WeekId},
    store::MemoryStore,
  };

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, 10, 8, 0, 0).unwrap() }

  fn raw() -> RawPayload {
    RawPayload::new(json!({
      "code": 200,
      "data": {
        "ds_tiet_trong_ngay": [{ "tiet": 1, "gio_bat_dau": "07:00", "gio_ket_thuc": "07:45" }],
        "ds_tuan_tkb": [{
          "tuan_hoc_ky": 1,
          "thong_tin_tuan": "Tuần 1 [02/09/2024 -- 08/09/2024]",
          "ds_thoi_khoa_bieu": [{
            "ten_mon": "Math", "ma_mon": "MA101", "thu_kieu_so": 2,
            "tiet_bat_dau": 1, "so_tiet": 2, "ngay_hoc": "2024-09-02",
            "ma_phong": "A.101",
          }],
        }],
      }
    }))
  }

  #[tokio::test]
  async fn empty_cache_loads_nothing_and_is_stale() {
    let cache = CacheStore::new(MemoryStore::new());
    assert!(cache.load().await.unwrap().is_none());
    assert!(cache.load_raw().await.unwrap().is_none());
    assert!(cache.last_fetch().await.unwrap().is_none());
    assert!(cache.is_stale_at(now(), default_max_age()).await.unwrap());
  }

  #[tokio::test]
  async fn save_writes_all_three_slots() {
    let cache = CacheStore::new(MemoryStore::new());
    let raw = raw();
    let schedule = normalize(&raw).unwrap();

    cache.save_at(&raw, &schedule, now()).await.unwrap();

    assert_eq!(cache.load().await.unwrap(), Some(schedule));
    assert_eq!(cache.load_raw().await.unwrap(), Some(raw.clone()));
    assert_eq!(cache.last_fetch().await.unwrap(), Some(now()));

    let stored_raw = cache.kv().get(RAW_KEY).await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&stored_raw).unwrap(), raw.into_value());
    let stamp = cache.kv().get(LAST_FETCH_KEY).await.unwrap().unwrap();
    assert_eq!(stamp, now().timestamp_millis().to_string());
  }

  #[tokio::test]
  async fn staleness_threshold_is_exclusive() {
    let cache = CacheStore::new(MemoryStore::new());
    let raw = raw();
    let schedule = normalize(&raw).unwrap();
    let max_age = default_max_age();
    let one_ms = TimeDelta::milliseconds(1);

    cache.save_at(&raw, &schedule, now() - (max_age - one_ms)).await.unwrap();
    assert!(!cache.is_stale_at(now(), max_age).await.unwrap());

    cache.save_at(&raw, &schedule, now() - max_age).await.unwrap();
    assert!(!cache.is_stale_at(now(), max_age).await.unwrap());

    cache.save_at(&raw, &schedule, now() - (max_age + one_ms)).await.unwrap();
    assert!(cache.is_stale_at(now(), max_age).await.unwrap());
  }

  #[tokio::test]
  async fn load_returns_the_stored_schedule_without_renormalizing() {
    let cache = CacheStore::new(MemoryStore::new());
    let raw = raw();

    // A schedule that disagrees with what `normalize(raw)` would produce, as
    // if written by an older normalizer.
    let mut outdated = Schedule::default();
    let mut grid = WeekGrid::new();
    *grid.cell_mut(5, 5).unwrap() = Some(ClassEntry {
      subject_name: "Legacy".into(),
      subject_code: "OLD1".into(),
      date:         "2020-01-01".into(),
    });
    outdated.weekly_schedules.insert(WeekId::from("1"), grid);

    cache.save_at(&raw, &outdated, now()).await.unwrap();

    let loaded = cache.load().await.unwrap().unwrap();
    assert_eq!(loaded, outdated);
    assert_ne!(Some(loaded), normalize(&raw));
  }

  #[tokio::test]
  async fn corrupt_slots_read_as_absent() {
    let cache = CacheStore::new(MemoryStore::new());
    cache.kv().set(SCHEDULE_KEY, "{not json".into()).await.unwrap();
    cache.kv().set(RAW_KEY, "[".into()).await.unwrap();
    cache.kv().set(LAST_FETCH_KEY, "yesterday".into()).await.unwrap();

    assert!(cache.load().await.unwrap().is_none());
    assert!(cache.load_raw().await.unwrap().is_none());
    assert!(cache.last_fetch().await.unwrap().is_none());
    assert!(cache.is_stale_at(now(), default_max_age()).await.unwrap());
  }

  #[test]
  fn default_threshold_is_one_week() {
    assert_eq!(default_max_age(), TimeDelta::days(7));
  }
}
