//! Single-cell edits over a [`Schedule`].

use crate::{
  Error, Result,
  schedule::{ClassEntry, DAYS_PER_WEEK, PERIODS_PER_DAY, Schedule, WeekId},
};

/// Return a copy of `schedule` with one cell of `week_id` replaced by `entry`,
/// or cleared when `entry` is `None`.
///
/// `period_index` and `day_index` are zero-based grid coordinates. The input
/// is left untouched.
///
/// Edits are cell-granular: a class spanning several periods occupies several
/// cells, and changing one of them does not touch the others. Callers that
/// want to move or delete a whole session edit each of its cells.
pub fn apply_edit(
  schedule: &Schedule,
  week_id: &WeekId,
  period_index: usize,
  day_index: usize,
  entry: Option<ClassEntry>,
) -> Result<Schedule> {
  if period_index >= PERIODS_PER_DAY || day_index >= DAYS_PER_WEEK {
    return Err(Error::CellOutOfRange {
      period: period_index,
      day:    day_index,
    });
  }
  if schedule.week(week_id).is_none() {
    return Err(Error::WeekNotFound(week_id.clone()));
  }

  let mut next = schedule.clone();
  let cell = next
    .weekly_schedules
    .get_mut(week_id)
    .and_then(|grid| grid.cell_mut(period_index, day_index))
    .ok_or_else(|| Error::WeekNotFound(week_id.clone()))?;
  *cell = entry;
  Ok(next)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{normalize::normalize, raw::RawPayload};

  fn math_payload() -> RawPayload {
    RawPayload::new(json!({
      "data": {
        "ds_tiet_trong_ngay": [],
        "ds_tuan_tkb": [
          {
            "tuan_hoc_ky": 1,
            "ds_thoi_khoa_bieu": [{
              "ten_mon": "Math", "ma_mon": "MA101", "thu_kieu_so": 2,
              "tiet_bat_dau": 1, "so_tiet": 2, "ngay_hoc": "2024-09-02",
            }],
          },
          {
            "tuan_hoc_ky": 2,
            "ds_thoi_khoa_bieu": [{
              "ten_mon": "Physics", "ma_mon": "PH102", "thu_kieu_so": 4,
              "tiet_bat_dau": 3, "so_tiet": 3, "ngay_hoc": "2024-09-11",
            }],
          },
        ],
      }
    }))
  }

  fn chemistry() -> ClassEntry {
    ClassEntry {
      subject_name: "Chemistry".into(),
      subject_code: "CH201".into(),
      date:         "2024-09-05".into(),
    }
  }

  #[test]
  fn clearing_one_cell_leaves_the_rest_of_the_run() {
    let before = normalize(&math_payload()).unwrap();
    let week = WeekId::from("1");

    let after = apply_edit(&before, &week, 0, 0, None).unwrap();
    let grid = after.week(&week).unwrap();

    assert!(grid.get(0, 0).is_none());
    assert_eq!(grid.get(1, 0).unwrap().subject_name, "Math");
  }

  #[test]
  fn edit_changes_only_the_target_cell() {
    let before = normalize(&math_payload()).unwrap();
    let week = WeekId::from("2");

    let after = apply_edit(&before, &week, 7, 5, Some(chemistry())).unwrap();

    for (id, grid) in after.weekly_schedules.iter() {
      let old = before.week(id).unwrap();
      for period in 0..PERIODS_PER_DAY {
        for day in 0..DAYS_PER_WEEK {
          if *id == week && period == 7 && day == 5 {
            assert_eq!(grid.get(period, day), Some(&chemistry()));
          } else {
            assert_eq!(grid.get(period, day), old.get(period, day));
          }
        }
      }
    }
    assert_eq!(after.periods, before.periods);
  }

  #[test]
  fn input_schedule_is_not_mutated() {
    let before = normalize(&math_payload()).unwrap();
    let snapshot = before.clone();

    let _ = apply_edit(&before, &WeekId::from("1"), 1, 0, Some(chemistry())).unwrap();
    assert_eq!(before, snapshot);
  }

  #[test]
  fn unknown_week_is_rejected() {
    let before = normalize(&math_payload()).unwrap();
    let err = apply_edit(&before, &WeekId::from("99"), 0, 0, None).unwrap_err();
    assert!(matches!(err, Error::WeekNotFound(id) if id.as_str() == "99"));
  }

  #[test]
  fn coordinates_outside_the_grid_are_rejected() {
    let before = normalize(&math_payload()).unwrap();
    let week = WeekId::from("1");

    assert!(matches!(
      apply_edit(&before, &week, PERIODS_PER_DAY, 0, None),
      Err(Error::CellOutOfRange { period: 12, day: 0 })
    ));
    assert!(matches!(
      apply_edit(&before, &week, 0, DAYS_PER_WEEK, None),
      Err(Error::CellOutOfRange { period: 0, day: 7 })
    ));
  }
}
