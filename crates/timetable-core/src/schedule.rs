//! The normalized schedule — periods, week grids and class entries.
//!
//! A [`Schedule`] is a materialized view over the upstream payload: a class
//! spanning several periods is copied into every cell it covers, so any cell
//! can be read without looking at its neighbours.

use std::{collections::BTreeMap, fmt};

use serde::{
  Deserialize, Deserializer, Serialize, Serializer,
  de::{self, MapAccess, Visitor},
  ser::SerializeMap,
};

/// Rows of a [`WeekGrid`]: periods 1..=12.
pub const PERIODS_PER_DAY: usize = 12;

/// Columns of a [`WeekGrid`]: Monday..=Sunday.
pub const DAYS_PER_WEEK: usize = 7;

// ─── Periods & entries ───────────────────────────────────────────────────────

/// Time bounds of one numbered period, as upstream formats them (`"07:00"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub start: String,
  pub end:   String,
}

/// One scheduled class as it appears in a single grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
  pub subject_name: String,
  pub subject_code: String,
  /// Calendar date of the session, verbatim from upstream.
  pub date:         String,
}

// ─── Weekday ─────────────────────────────────────────────────────────────────

/// Grid column, decoded from the upstream day code.
///
/// Upstream numbers days the Vietnamese way: `2` is Monday ("thứ hai") up to
/// `8` for Sunday, so the column is `code - 2`. Code `3` is therefore Tuesday
/// (column 1), not Monday; a `code - 3` reading would leave Sunday without a
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

impl Weekday {
  pub const ALL: [Weekday; DAYS_PER_WEEK] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
  ];

  /// Decode an upstream day code. Codes outside `2..=8` have no column.
  pub fn from_day_code(code: i64) -> Option<Self> {
    code
      .checked_sub(2)
      .and_then(|column| usize::try_from(column).ok())
      .and_then(Self::from_column)
  }

  pub fn from_column(column: usize) -> Option<Self> {
    Self::ALL.get(column).copied()
  }

  pub fn column(self) -> usize { self as usize }

  pub fn day_code(self) -> i64 { self as i64 + 2 }

  pub fn short_name(self) -> &'static str {
    match self {
      Weekday::Monday => "Mon",
      Weekday::Tuesday => "Tue",
      Weekday::Wednesday => "Wed",
      Weekday::Thursday => "Thu",
      Weekday::Friday => "Fri",
      Weekday::Saturday => "Sat",
      Weekday::Sunday => "Sun",
    }
  }
}

// ─── Week identifiers ────────────────────────────────────────────────────────

/// Upstream identifier of a week. Upstream sends numbers or strings; both are
/// kept as text so `1` and `"1"` name the same week.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId(String);

impl WeekId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WeekId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(&self.0) }
}

impl From<&str> for WeekId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for WeekId {
  fn from(s: String) -> Self { Self(s) }
}

impl Serialize for WeekId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for WeekId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct WeekIdVisitor;

    impl Visitor<'_> for WeekIdVisitor {
      type Value = WeekId;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a week identifier (string or integer)")
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<WeekId, E> { Ok(WeekId::from(v)) }

      fn visit_string<E: de::Error>(self, v: String) -> Result<WeekId, E> { Ok(WeekId(v)) }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<WeekId, E> { Ok(WeekId(v.to_string())) }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<WeekId, E> { Ok(WeekId(v.to_string())) }
    }

    deserializer.deserialize_any(WeekIdVisitor)
  }
}

// ─── Week grid ───────────────────────────────────────────────────────────────

/// A fixed 12×7 matrix: rows are periods 1..=12, columns Monday..=Sunday.
///
/// The shape is part of the type, so a persisted grid of any other shape
/// fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekGrid {
  cells: [[Option<ClassEntry>; DAYS_PER_WEEK]; PERIODS_PER_DAY],
}

impl WeekGrid {
  pub fn new() -> Self { Self::default() }

  /// The entry at zero-based `(period, day)`; `None` for an empty cell or an
  /// index outside the grid.
  pub fn get(&self, period: usize, day: usize) -> Option<&ClassEntry> {
    self.cells.get(period)?.get(day)?.as_ref()
  }

  pub fn cell_mut(&mut self, period: usize, day: usize) -> Option<&mut Option<ClassEntry>> {
    self.cells.get_mut(period)?.get_mut(day)
  }

  pub fn rows(&self) -> impl Iterator<Item = &[Option<ClassEntry>; DAYS_PER_WEEK]> {
    self.cells.iter()
  }

  /// Number of non-empty cells.
  pub fn occupied(&self) -> usize {
    self.cells.iter().flatten().filter(|c| c.is_some()).count()
  }
}

// ─── Weekly schedules ────────────────────────────────────────────────────────

/// Week grids keyed by [`WeekId`], in upstream insertion order.
///
/// Serialized as a JSON object; the order of its keys survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedules {
  entries: Vec<(WeekId, WeekGrid)>,
}

impl WeeklySchedules {
  pub fn new() -> Self { Self::default() }

  /// Insert `grid` under `id`. An existing week keeps its position and has its
  /// grid replaced.
  pub fn insert(&mut self, id: WeekId, grid: WeekGrid) {
    match self.entries.iter_mut().find(|(k, _)| *k == id) {
      Some((_, slot)) => *slot = grid,
      None => self.entries.push((id, grid)),
    }
  }

  pub fn get(&self, id: &WeekId) -> Option<&WeekGrid> {
    self.entries.iter().find(|(k, _)| k == id).map(|(_, g)| g)
  }

  pub fn get_mut(&mut self, id: &WeekId) -> Option<&mut WeekGrid> {
    self.entries.iter_mut().find(|(k, _)| k == id).map(|(_, g)| g)
  }

  pub fn position(&self, id: &WeekId) -> Option<usize> {
    self.entries.iter().position(|(k, _)| k == id)
  }

  pub fn ids(&self) -> impl Iterator<Item = &WeekId> { self.entries.iter().map(|(k, _)| k) }

  pub fn iter(&self) -> impl Iterator<Item = (&WeekId, &WeekGrid)> {
    self.entries.iter().map(|(k, g)| (k, g))
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Serialize for WeeklySchedules {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (id, grid) in &self.entries {
      map.serialize_entry(id, grid)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for WeeklySchedules {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct WeeksVisitor;

    impl<'de> Visitor<'de> for WeeksVisitor {
      type Value = WeeklySchedules;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of week identifiers to week grids")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut weeks = WeeklySchedules::new();
        while let Some((id, grid)) = access.next_entry::<WeekId, WeekGrid>()? {
          weeks.insert(id, grid);
        }
        Ok(weeks)
      }
    }

    deserializer.deserialize_map(WeeksVisitor)
  }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Step through the week list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Previous,
  Next,
}

/// The normalized timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  /// Period number → time bounds. Numbers are upstream's; gaps are kept.
  pub periods:          BTreeMap<u32, Period>,
  #[serde(rename = "weeklySchedules")]
  pub weekly_schedules: WeeklySchedules,
}

impl Schedule {
  pub fn week(&self, id: &WeekId) -> Option<&WeekGrid> { self.weekly_schedules.get(id) }

  pub fn week_ids(&self) -> impl Iterator<Item = &WeekId> { self.weekly_schedules.ids() }

  pub fn first_week(&self) -> Option<&WeekId> { self.weekly_schedules.ids().next() }

  /// The week adjacent to `current` in insertion order, or `None` at either
  /// end of the list or when `current` is unknown.
  pub fn neighbor_week(&self, current: &WeekId, direction: Direction) -> Option<&WeekId> {
    let index = self.weekly_schedules.position(current)?;
    let target = match direction {
      Direction::Previous => index.checked_sub(1)?,
      Direction::Next => index + 1,
    };
    self.weekly_schedules.ids().nth(target)
  }
}
