//! Time-window resolution.
//!
//! Views pick a named window (`today`, `week`, `month`, `all`); aggregation needs concrete
//! instants. Resolution is a pure function of the window and the caller's "now", so the local
//! time zone is whatever zone `now` carries. Bounds are returned in UTC for querying.

use crate::error::{WardError, WardResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Local calendar day containing `now`.
    #[default]
    Today,
    /// Rolling 7×24h ending at `now`. Not aligned to calendar weeks.
    Week,
    /// From the first of the current month (local midnight) to `now`.
    Month,
    /// No bounds.
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Today => "today",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = WardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(TimeWindow::Today),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "all" => Ok(TimeWindow::All),
            other => Err(WardError::InvalidInput(format!(
                "unknown time window '{other}' (expected today, week, month or all)"
            ))),
        }
    }
}

/// Half-open interval `[start, end)`. A `None` bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowBounds {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl WindowBounds {
    pub const UNBOUNDED: WindowBounds = WindowBounds {
        start: None,
        end: None,
    };

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| instant >= start)
            && self.end.map_or(true, |end| instant < end)
    }
}

/// Resolves `window` against `now`.
pub fn resolve<Tz: TimeZone>(window: TimeWindow, now: &DateTime<Tz>) -> WindowBounds {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();

    match window {
        TimeWindow::Today => {
            let start = local_midnight(&tz, today);
            WindowBounds {
                start: Some(start),
                end: Some(start + Duration::hours(24)),
            }
        }
        TimeWindow::Week => WindowBounds {
            start: Some(now_utc - Duration::days(7)),
            end: Some(now_utc),
        },
        TimeWindow::Month => {
            let first_of_month = today - Duration::days(i64::from(today.day0()));
            WindowBounds {
                start: Some(local_midnight(&tz, first_of_month)),
                end: Some(now_utc),
            }
        }
        TimeWindow::All => WindowBounds::UNBOUNDED,
    }
}

/// One local calendar day as a UTC half-open interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// The day `date` in time zone `tz`, from local midnight to the next local midnight.
    pub fn local<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> WardResult<Self> {
        let next = date
            .succ_opt()
            .ok_or_else(|| WardError::InvalidInput(format!("date out of range: {date}")))?;
        Ok(Self {
            date,
            start: local_midnight(tz, date),
            end: local_midnight(tz, next),
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.bounds().contains(instant)
    }

    pub fn bounds(&self) -> WindowBounds {
        WindowBounds {
            start: Some(self.start),
            end: Some(self.end),
        }
    }
}

/// Local midnight of `date` in `tz`, as UTC.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_instant(tz, date.and_time(NaiveTime::MIN))
}

/// The instant a local wall-clock reading names in `tz`, as UTC.
///
/// Where the reading does not exist (a DST gap) the first valid local time after it, in
/// 30-minute steps, is used. An ambiguous reading resolves to the earlier instant.
pub(crate) fn local_instant<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    (0..=48)
        .map(|step| local + Duration::minutes(30 * step))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|instant| instant.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, MappedLocalTime};

    /// Central European zone around the 2024 spring change: local midnight on 31 March does
    /// not exist and the clock reads 01:00 (+02:00) straight after 23:59:59 (+01:00).
    #[derive(Debug, Clone, Copy)]
    struct GapZone;

    impl GapZone {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }

        fn gap() -> (NaiveDateTime, NaiveDateTime) {
            let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
            (
                day.and_hms_opt(0, 0, 0).unwrap(),
                day.and_hms_opt(1, 0, 0).unwrap(),
            )
        }
    }

    impl TimeZone for GapZone {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            GapZone
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            MappedLocalTime::Single(Self::winter())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<FixedOffset> {
            let (gap_start, gap_end) = Self::gap();
            if *local < gap_start {
                MappedLocalTime::Single(Self::winter())
            } else if *local < gap_end {
                MappedLocalTime::None
            } else {
                MappedLocalTime::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            Self::winter()
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            let switch = NaiveDate::from_ymd_opt(2024, 3, 30)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap();
            if *utc < switch {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn today_spans_local_calendar_day() {
        let now = utc(2024, 3, 15, 10, 0);
        let bounds = resolve(TimeWindow::Today, &now);
        assert_eq!(bounds.start, Some(utc(2024, 3, 15, 0, 0)));
        assert_eq!(bounds.end, Some(utc(2024, 3, 16, 0, 0)));
    }

    #[test]
    fn month_starts_on_the_first_at_midnight_and_ends_now() {
        let now = utc(2024, 3, 15, 10, 0);
        let bounds = resolve(TimeWindow::Month, &now);
        assert_eq!(bounds.start, Some(utc(2024, 3, 1, 0, 0)));
        assert_eq!(bounds.end, Some(now));
    }

    #[test]
    fn week_is_rolling_seven_days() {
        let now = utc(2024, 3, 15, 10, 0);
        let bounds = resolve(TimeWindow::Week, &now);
        assert_eq!(bounds.start, Some(utc(2024, 3, 8, 10, 0)));
        assert_eq!(bounds.end, Some(now));
    }

    #[test]
    fn all_is_unbounded() {
        let bounds = resolve(TimeWindow::All, &utc(2024, 3, 15, 10, 0));
        assert_eq!(bounds, WindowBounds::UNBOUNDED);
        assert!(bounds.is_unbounded());
        assert!(bounds.contains(utc(1990, 1, 1, 0, 0)));
    }

    #[test]
    fn local_offset_shifts_midnight() {
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = cest.with_ymd_and_hms(2024, 3, 15, 1, 30, 0).unwrap();

        let today = resolve(TimeWindow::Today, &now);
        assert_eq!(today.start, Some(utc(2024, 3, 14, 22, 0)));
        assert_eq!(today.end, Some(utc(2024, 3, 15, 22, 0)));

        let month = resolve(TimeWindow::Month, &now);
        assert_eq!(month.start, Some(utc(2024, 2, 29, 22, 0)));
    }

    #[test]
    fn bounds_are_half_open() {
        let bounds = resolve(TimeWindow::Today, &utc(2024, 3, 15, 10, 0));
        assert!(bounds.contains(utc(2024, 3, 15, 0, 0)));
        assert!(!bounds.contains(utc(2024, 3, 16, 0, 0)));
    }

    #[test]
    fn parses_window_names() {
        assert_eq!("Week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert_eq!(" all ".parse::<TimeWindow>().unwrap(), TimeWindow::All);
        assert!(matches!(
            "fortnight".parse::<TimeWindow>(),
            Err(WardError::InvalidInput(_))
        ));
    }

    #[test]
    fn day_range_covers_one_local_day() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let day = DayRange::local(date, &tz).unwrap();
        assert_eq!(day.start, utc(2024, 3, 15, 5, 0));
        assert_eq!(day.end, utc(2024, 3, 16, 5, 0));
        assert!(day.contains(utc(2024, 3, 16, 4, 59)));
        assert!(!day.contains(utc(2024, 3, 16, 5, 0)));
    }

    #[test]
    fn midnight_in_a_dst_gap_moves_to_the_first_valid_local_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let day = DayRange::local(date, &GapZone).unwrap();
        assert_eq!(day.start, utc(2024, 3, 30, 23, 0));
        assert_eq!(day.end, utc(2024, 3, 31, 22, 0));

        let now = GapZone.from_utc_datetime(&utc(2024, 3, 31, 10, 0).naive_utc());
        let today = resolve(TimeWindow::Today, &now);
        assert_eq!(today.start, Some(utc(2024, 3, 30, 23, 0)));
        assert_eq!(today.end, Some(utc(2024, 3, 31, 23, 0)));
    }

    #[test]
    fn local_instant_steps_over_the_gap() {
        let (gap_start, gap_end) = GapZone::gap();
        let inside = gap_start + Duration::minutes(15);
        // 00:15 does not exist; the next half-hour step that does is 01:15 (+02:00).
        assert_eq!(local_instant(&GapZone, inside), utc(2024, 3, 30, 23, 15));
        assert_eq!(local_instant(&GapZone, gap_end), utc(2024, 3, 30, 23, 0));
        assert_eq!(
            local_instant(&GapZone, gap_start - Duration::minutes(1)),
            utc(2024, 3, 30, 22, 59)
        );
    }
}
