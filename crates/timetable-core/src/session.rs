//! [`Timetable`] — the load cycle, edits and week navigation a presentation
//! layer drives.
//!
//! One cycle at a time: every method that touches the cache or the fetcher
//! takes `&mut self`.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use crate::{
  Error, Result,
  cache::{CacheStore, default_max_age},
  edit::apply_edit,
  fetch::Fetcher,
  normalize::normalize,
  raw::RawPayload,
  schedule::{ClassEntry, Direction, Schedule, WeekGrid, WeekId},
  store::KeyValueStore,
};

// ─── States ──────────────────────────────────────────────────────────────────

/// How a load cycle obtained its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
  /// The cache was fresh; nothing was fetched.
  FreshFromCache,
  /// The cache had a timestamp older than the threshold; refetched.
  StaleRefetch,
  /// There was no usable cache; fetched.
  NoCacheRefetch,
}

/// Cache age as shown to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
  pub last_fetch: Option<DateTime<Utc>>,
  pub stale:      bool,
}

// ─── Timetable ───────────────────────────────────────────────────────────────

/// The working copy of a schedule together with its cache and fetcher.
///
/// The in-memory schedule is a copy; [`edit_cell`](Self::edit_cell) writes it
/// back to the cache explicitly after every change.
pub struct Timetable<K, F> {
  cache:        CacheStore<K>,
  fetcher:      F,
  max_age:      TimeDelta,
  clock:        fn() -> DateTime<Utc>,
  raw:          Option<RawPayload>,
  schedule:     Option<Schedule>,
  current_week: Option<WeekId>,
  loaded:       bool,
}

impl<K: KeyValueStore, F: Fetcher> Timetable<K, F> {
  pub fn new(kv: K, fetcher: F) -> Self {
    Self {
      cache: CacheStore::new(kv),
      fetcher,
      max_age: default_max_age(),
      clock: Utc::now,
      raw: None,
      schedule: None,
      current_week: None,
      loaded: false,
    }
  }

  /// Override the staleness threshold (default: seven days).
  pub fn with_max_age(mut self, max_age: TimeDelta) -> Self {
    self.max_age = max_age;
    self
  }

  pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
    self.clock = clock;
    self
  }

  pub fn cache(&self) -> &CacheStore<K> { &self.cache }

  pub fn max_age(&self) -> TimeDelta { self.max_age }

  /// The working copy, if a cycle has produced one.
  pub fn schedule(&self) -> Option<&Schedule> { self.schedule.as_ref() }

  pub fn current_week(&self) -> Option<&WeekId> { self.current_week.as_ref() }

  pub fn current_grid(&self) -> Option<&WeekGrid> {
    self.schedule.as_ref()?.week(self.current_week.as_ref()?)
  }

  // ── Load cycle ────────────────────────────────────────────────────────

  /// Decide where the schedule should come from, without fetching.
  pub async fn decide(&self) -> Result<CacheState> {
    let now = (self.clock)();
    Ok(match self.cache.last_fetch().await? {
      None => CacheState::NoCacheRefetch,
      Some(last) if now - last > self.max_age => CacheState::StaleRefetch,
      Some(_) => CacheState::FreshFromCache,
    })
  }

  /// Run one load cycle and return the path it took.
  ///
  /// A fresh cache is used as is. Otherwise the fetcher runs, the payload is
  /// normalized and the cache is rewritten. A fetch failure ends the cycle
  /// with an error and no schedule; the old cache is not used in its place.
  /// A payload without data ends the cycle with no schedule and leaves the
  /// cache untouched.
  pub async fn load(&mut self) -> Result<CacheState> {
    self.loaded = false;
    self.raw = None;
    self.install(None);

    let mut state = self.decide().await?;
    if state == CacheState::FreshFromCache {
      let schedule = self.cache.load().await?;
      let raw = self.cache.load_raw().await?;
      match (schedule, raw) {
        (Some(schedule), Some(raw)) => {
          info!(weeks = schedule.weekly_schedules.len(), "timetable served from cache");
          self.raw = Some(raw);
          self.install(Some(schedule));
          self.loaded = true;
          return Ok(state);
        }
        _ => {
          warn!("timetable cache is incomplete; refetching");
          state = CacheState::NoCacheRefetch;
        }
      }
    }

    info!(?state, "fetching timetable");
    self.refetch().await?;
    Ok(state)
  }

  /// Fetch regardless of cache age. On failure the current working copy is
  /// kept and the error returned.
  pub async fn refresh(&mut self) -> Result<()> {
    info!("refreshing timetable on request");
    self.refetch().await
  }

  async fn refetch(&mut self) -> Result<()> {
    let raw = self.fetcher.fetch().await.map_err(Error::fetch)?;

    match normalize(&raw) {
      Some(schedule) => {
        self.cache.save_at(&raw, &schedule, (self.clock)()).await?;
        self.raw = Some(raw);
        self.install(Some(schedule));
      }
      None => {
        warn!("upstream returned no timetable data");
        self.raw = Some(raw);
        self.install(None);
      }
    }
    self.loaded = true;
    Ok(())
  }

  fn install(&mut self, schedule: Option<Schedule>) {
    let keep = match (&schedule, &self.current_week) {
      (Some(s), Some(week)) => s.week(week).is_some(),
      _ => false,
    };
    if !keep {
      self.current_week = schedule.as_ref().and_then(Schedule::first_week).cloned();
    }
    self.schedule = schedule;
  }

  /// The schedule, running a load cycle first if none has completed.
  ///
  /// `Ok(None)` means upstream had no data.
  pub async fn get_schedule(&mut self) -> Result<Option<&Schedule>> {
    if !self.loaded {
      self.load().await?;
    }
    Ok(self.schedule.as_ref())
  }

  pub async fn status(&self) -> Result<CacheStatus> {
    let last_fetch = self.cache.last_fetch().await?;
    let stale = match last_fetch {
      Some(last) => (self.clock)() - last > self.max_age,
      None => true,
    };
    Ok(CacheStatus { last_fetch, stale })
  }

  // ── Edits ─────────────────────────────────────────────────────────────

  /// Replace (or clear, with `None`) one cell and write the result back to
  /// the cache alongside the unchanged raw payload.
  ///
  /// Only the addressed cell changes; see [`apply_edit`]. If the cache write
  /// fails the working copy is left as it was.
  pub async fn edit_cell(
    &mut self,
    week_id: &WeekId,
    period_index: usize,
    day_index: usize,
    entry: Option<ClassEntry>,
  ) -> Result<()> {
    let (Some(raw), Some(schedule)) = (self.raw.as_ref(), self.schedule.as_ref()) else {
      return Err(Error::NotLoaded);
    };

    let next = apply_edit(schedule, week_id, period_index, day_index, entry)?;
    self.cache.save_at(raw, &next, (self.clock)()).await?;
    self.schedule = Some(next);
    Ok(())
  }

  // ── Navigation ────────────────────────────────────────────────────────

  /// Move to the previous or next week in upstream order. Stepping past
  /// either end leaves the current week unchanged.
  pub fn change_week(&mut self, direction: Direction) -> Option<&WeekId> {
    let target = self
      .schedule
      .as_ref()
      .zip(self.current_week.as_ref())
      .and_then(|(schedule, current)| schedule.neighbor_week(current, direction))
      .cloned();
    if let Some(target) = target {
      self.current_week = Some(target);
    }
    self.current_week.as_ref()
  }

  /// Jump to `week_id`.
  pub fn select_week(&mut self, week_id: &WeekId) -> Result<()> {
    match &self.schedule {
      Some(schedule) if schedule.week(week_id).is_some() => {
        self.current_week = Some(week_id.clone());
        Ok(())
      }
      Some(_) => Err(Error::WeekNotFound(week_id.clone())),
      None => Err(Error::NotLoaded),
    }
  }
}
