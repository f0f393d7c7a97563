//! Raw payload → [`Schedule`].
//!
//! Pure and deterministic: the same payload always produces the same schedule.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
  raw::{RawData, RawPayload, RawPeriod, RawSession, RawWeek},
  schedule::{ClassEntry, PERIODS_PER_DAY, Period, Schedule, WeekGrid, Weekday},
};

/// Normalize `raw` into a [`Schedule`].
///
/// Returns `None` when the payload has no `data` container or the container
/// is not an object with list fields; callers treat that as "no data", not as
/// an error.
///
/// A session spanning `N` periods from period `P` is written into rows
/// `P-1 ..= P-1+N-1` of its day's column. Rows that fall outside the grid are
/// skipped without error, as are sessions whose day code has no column.
/// Periods, weeks and sessions that cannot be read are dropped one by one;
/// the rest of the schedule is kept.
pub fn normalize(raw: &RawPayload) -> Option<Schedule> {
  let data = raw.data()?;
  let data = match RawData::deserialize(data) {
    Ok(data) => data,
    Err(e) => {
      warn!(error = %e, "timetable payload has an unreadable data container");
      return None;
    }
  };

  let mut schedule = Schedule::default();

  for period in readable::<RawPeriod>(data.periods, "period") {
    schedule.periods.insert(
      period.number,
      Period {
        start: period.start.unwrap_or_default(),
        end:   period.end.unwrap_or_default(),
      },
    );
  }

  for week in readable::<RawWeek>(data.weeks, "week") {
    let mut grid = WeekGrid::new();
    for session in readable::<RawSession>(week.sessions, "session") {
      write_session(&mut grid, &session);
    }
    schedule.weekly_schedules.insert(week.id, grid);
  }

  Some(schedule)
}

/// Items of an upstream list that decode as `T`.
fn readable<T: DeserializeOwned>(
  items: Option<Vec<Value>>,
  kind: &'static str,
) -> impl Iterator<Item = T> {
  items
    .into_iter()
    .flatten()
    .filter_map(move |item| match T::deserialize(&item) {
      Ok(item) => Some(item),
      Err(e) => {
        debug!(error = %e, kind, "skipping unreadable item");
        None
      }
    })
}

fn write_session(grid: &mut WeekGrid, session: &RawSession) {
  let Some(day) = Weekday::from_day_code(session.day_code) else {
    debug!(day_code = session.day_code, "skipping session with no grid column");
    return;
  };

  let entry = ClassEntry {
    subject_name: session.subject_name.clone().unwrap_or_default(),
    subject_code: session.subject_code.clone().unwrap_or_default(),
    date:         session.date.clone().unwrap_or_default(),
  };

  // Clamp the span to the grid up front; upstream numbers are unbounded.
  let first_row = session.start_period.saturating_sub(1);
  let end_row = first_row
    .saturating_add(session.span.max(0))
    .min(PERIODS_PER_DAY as i64);
  let rows = first_row.max(0)..end_row;
  if first_row < 0 || first_row.saturating_add(session.span) > end_row {
    debug!(
      start = session.start_period,
      span = session.span,
      subject = %entry.subject_code,
      "span clipped to the grid"
    );
  }

  for row in rows {
    let Ok(row) = usize::try_from(row) else { continue };
    if let Some(cell) = grid.cell_mut(row, day.column()) {
      *cell = Some(entry.clone());
    }
  }
}
