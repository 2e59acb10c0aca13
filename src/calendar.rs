use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::CalendarError;

pub const GRID_ROWS: usize = 6;
pub const GRID_COLUMNS: usize = 7;

/// First column of the month grid, taken from locale settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Sunday,
    #[default]
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            WeekStart::Sunday => "Su Mo Tu We Th Fr Sa",
            WeekStart::Monday => "Mo Tu We Th Fr Sa Su",
        }
    }

    fn offset_of(self, day: Weekday) -> i64 {
        match self {
            WeekStart::Sunday => i64::from(day.num_days_from_sunday()),
            WeekStart::Monday => i64::from(day.num_days_from_monday()),
        }
    }
}

/// Six full weeks around a month; cells outside it hold real adjacent-month dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: [[NaiveDate; GRID_COLUMNS]; GRID_ROWS],
}

impl MonthGrid {
    pub fn is_in_month(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells.iter().flat_map(|week| week.iter().copied())
    }

    pub fn first_day(&self) -> NaiveDate {
        self.cells[0][0]
    }

    pub fn title(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|first| first.format("%B %Y").to_string())
            .unwrap_or_default()
    }
}

pub fn build_grid(month: u32, year: i32, week_start: WeekStart) -> Result<MonthGrid, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    let first_of_month =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidYear(year))?;

    let lead = week_start.offset_of(first_of_month.weekday());
    let first_cell = first_of_month
        .checked_sub_signed(Duration::days(lead))
        .ok_or(CalendarError::InvalidYear(year))?;
    // The last cell must exist too, otherwise the grid would be cut short.
    first_cell
        .checked_add_signed(Duration::days((GRID_ROWS * GRID_COLUMNS) as i64 - 1))
        .ok_or(CalendarError::InvalidYear(year))?;

    let mut cells = [[first_cell; GRID_COLUMNS]; GRID_ROWS];
    for (week, row) in cells.iter_mut().enumerate() {
        for (weekday_index, cell) in row.iter_mut().enumerate() {
            let offset = (week * GRID_COLUMNS + weekday_index) as i64;
            *cell = first_cell + Duration::days(offset);
        }
    }

    Ok(MonthGrid { year, month, cells })
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Moves by whole months, clamping the day to the target month's length.
pub fn shift_month(day: NaiveDate, delta: i32) -> NaiveDate {
    let mut year = day.year();
    let mut month = day.month() as i32 + delta;
    while month > 12 {
        year += 1;
        month -= 12;
    }
    while month < 1 {
        year -= 1;
        month += 12;
    }
    let month_u32 = month as u32;
    let max_day = days_in_month(year, month_u32);
    let target_day = day.day().min(max_day);
    NaiveDate::from_ymd_opt(year, month_u32, target_day).unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};
    use proptest::prelude::*;

    use super::{WeekStart, build_grid, days_in_month, shift_month};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn may_2024_starting_monday() {
        let grid = build_grid(5, 2024, WeekStart::Monday).expect("grid should build");
        assert_eq!(grid.first_day(), date(2024, 4, 29));
        assert_eq!(grid.cells[5][6], date(2024, 6, 9));
        assert!(!grid.is_in_month(grid.first_day()));
        assert!(grid.is_in_month(date(2024, 5, 31)));
        assert_eq!(grid.title(), "May 2024");
    }

    #[test]
    fn month_starting_on_week_start_has_no_leading_days() {
        let grid = build_grid(9, 2024, WeekStart::Sunday).expect("grid should build");
        assert_eq!(grid.first_day(), date(2024, 9, 1));
        let grid = build_grid(4, 2024, WeekStart::Monday).expect("grid should build");
        assert_eq!(grid.first_day(), date(2024, 4, 1));
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(build_grid(0, 2024, WeekStart::Monday).is_err());
        assert!(build_grid(13, 2024, WeekStart::Sunday).is_err());
    }

    #[test]
    fn shift_month_clamps_day() {
        assert_eq!(shift_month(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(shift_month(date(2024, 1, 15), -1), date(2023, 12, 15));
        assert_eq!(shift_month(date(2023, 11, 30), 14), date(2025, 1, 30));
        assert_eq!(days_in_month(2023, 2), 28);
    }

    proptest! {
        #[test]
        fn grid_always_has_42_cells_covering_the_month_once(
            month in 1u32..=12,
            year in 1900i32..2200,
            sunday in any::<bool>(),
        ) {
            let week_start = if sunday { WeekStart::Sunday } else { WeekStart::Monday };
            let grid = build_grid(month, year, week_start).expect("grid should build");
            let dates = grid.dates().collect::<Vec<_>>();
            prop_assert_eq!(dates.len(), 42);
            prop_assert_eq!(grid.first_day().weekday(), week_start.weekday());

            for pair in dates.windows(2) {
                prop_assert_eq!(pair[1] - pair[0], chrono::Duration::days(1));
            }

            let in_month = dates.iter().filter(|day| grid.is_in_month(**day)).count();
            prop_assert_eq!(in_month as u32, days_in_month(year, month));
            for day in 1..=days_in_month(year, month) {
                let target = NaiveDate::from_ymd_opt(year, month, day).expect("valid date");
                prop_assert_eq!(dates.iter().filter(|cell| **cell == target).count(), 1);
            }
        }
    }
}
