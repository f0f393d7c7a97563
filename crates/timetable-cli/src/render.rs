//! Plain-text rendering of week grids for the terminal.

use std::fmt::Write as _;

use timetable_core::schedule::{PERIODS_PER_DAY, Schedule, WeekGrid, WeekId, Weekday};

const CELL_WIDTH: usize = 10;

/// One week as a table: a row per period, a column per weekday. Cells show
/// the subject code.
pub fn week(schedule: &Schedule, id: &WeekId, grid: &WeekGrid) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Week {id}");

  let _ = write!(out, "{:<16}", "Period");
  for day in Weekday::ALL {
    let _ = write!(out, "| {:<CELL_WIDTH$}", day.short_name());
  }
  out.push('\n');

  for (row, cells) in grid.rows().enumerate() {
    let number = row + 1;
    let times = u32::try_from(number)
      .ok()
      .and_then(|n| schedule.periods.get(&n))
      .map(|p| format!("{}-{}", p.start, p.end))
      .unwrap_or_default();
    let _ = write!(out, "{number:>2} {times:<13}");
    for cell in cells {
      let label = cell.as_ref().map(|e| e.subject_code.as_str()).unwrap_or("");
      let _ = write!(out, "| {:<CELL_WIDTH$}", truncate(label, CELL_WIDTH));
    }
    out.push('\n');
  }

  debug_assert_eq!(out.lines().count(), PERIODS_PER_DAY + 2);
  out
}

/// Week identifiers in upstream order with the number of occupied cells.
pub fn week_list(schedule: &Schedule) -> String {
  let mut out = String::new();
  for (id, grid) in schedule.weekly_schedules.iter() {
    let _ = writeln!(out, "{id:>6}  {:>3} cells", grid.occupied());
  }
  out
}

fn truncate(s: &str, max: usize) -> String { s.chars().take(max).collect() }
