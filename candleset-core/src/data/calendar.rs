//! Trading-session calendars.
//!
//! The pipeline only ever talks to the `MarketCalendar` trait: a source of
//! valid one-minute session timestamps for an exchange. Calendars are looked
//! up by exchange name, mirroring how an external calendar service is keyed.
//!
//! The bundled NYSE implementation covers the regular session (09:30-16:00
//! America/New_York, DST-aware) on weekdays, with holidays supplied by the
//! caller. Minutes are stamped at interval start, matching the candle files.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("unknown calendar: {0}")]
    UnknownCalendar(String),
}

/// A source of valid trading-session minutes.
pub trait MarketCalendar: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Every session minute in `[start, end]`, ascending.
    fn session_minutes(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>>;

    /// The open of the session containing `ts`, if `ts` is a session minute.
    fn session_open(&self, ts: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Look up a calendar by exchange name.
pub fn get_calendar(name: &str) -> Result<Box<dyn MarketCalendar>, CalendarError> {
    match name.to_ascii_uppercase().as_str() {
        "NYSE" => Ok(Box::new(Nyse::new())),
        _ => Err(CalendarError::UnknownCalendar(name.to_string())),
    }
}

const SESSION_MINUTES: i64 = 390; // 09:30 to 16:00

/// NYSE regular-session calendar.
#[derive(Debug, Clone, Default)]
pub struct Nyse {
    holidays: BTreeSet<NaiveDate>,
}

impl Nyse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar with full-day closures (exchange holidays) excluded.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// `[open, close)` of the regular session on `date`, in UTC.
    fn session_bounds(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&date) {
            return None;
        }
        let offset = eastern_offset(date);
        let open_local = date.and_hms_opt(9, 30, 0)?;
        let open = offset
            .from_local_datetime(&open_local)
            .single()?
            .with_timezone(&Utc);
        Some((open, open + Duration::minutes(SESSION_MINUTES)))
    }
}

impl MarketCalendar for Nyse {
    fn name(&self) -> &str {
        "NYSE"
    }

    fn session_minutes(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut minutes = Vec::new();
        if start > end {
            return minutes;
        }
        // Pad one day each side so offset shifts cannot drop a boundary session.
        let mut day = start
            .date_naive()
            .pred_opt()
            .unwrap_or_else(|| start.date_naive());
        let last = end.date_naive().succ_opt().unwrap_or_else(|| end.date_naive());
        while day <= last {
            if let Some((open, close)) = self.session_bounds(day) {
                let mut ts = open;
                while ts < close {
                    if ts >= start && ts <= end {
                        minutes.push(ts);
                    }
                    ts += Duration::minutes(1);
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        minutes
    }

    fn session_open(&self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Sessions never cross UTC midnight, so the UTC date is the session date.
        let (open, close) = self.session_bounds(ts.date_naive())?;
        if ts >= open && ts < close {
            Some(open)
        } else {
            None
        }
    }
}

/// US Eastern UTC offset for `date`: EDT from the second Sunday of March
/// through the first Sunday of November, EST otherwise.
fn eastern_offset(date: NaiveDate) -> FixedOffset {
    let dst_start = nth_weekday(date.year(), 3, Weekday::Sun, 2);
    let dst_end = nth_weekday(date.year(), 11, Weekday::Sun, 1);
    let hours = if date >= dst_start && date < dst_end {
        4
    } else {
        5
    };
    FixedOffset::west_opt(hours * 3600).expect("fixed offset in range")
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, nth: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start");
    let delta = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + Duration::days(delta + 7 * (nth as i64 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn registry_resolves_nyse_case_insensitively() {
        assert_eq!(get_calendar("nyse").unwrap().name(), "NYSE");
        assert!(matches!(
            get_calendar("LSE").unwrap_err(),
            CalendarError::UnknownCalendar(_)
        ));
    }

    #[test]
    fn winter_session_is_est() {
        // 2024-01-02 is a Tuesday; 09:30 EST = 14:30 UTC.
        let nyse = Nyse::new();
        let minutes = nyse.session_minutes(utc(2024, 1, 2, 0, 0), utc(2024, 1, 2, 23, 59));
        assert_eq!(minutes.len(), 390);
        assert_eq!(minutes[0], utc(2024, 1, 2, 14, 30));
        assert_eq!(*minutes.last().unwrap(), utc(2024, 1, 2, 20, 59));
    }

    #[test]
    fn summer_session_is_edt() {
        // 2024-07-01 is a Monday; 09:30 EDT = 13:30 UTC.
        let nyse = Nyse::new();
        let minutes = nyse.session_minutes(utc(2024, 7, 1, 0, 0), utc(2024, 7, 1, 23, 59));
        assert_eq!(minutes.len(), 390);
        assert_eq!(minutes[0], utc(2024, 7, 1, 13, 30));
    }

    #[test]
    fn weekend_has_no_minutes() {
        let nyse = Nyse::new();
        let minutes = nyse.session_minutes(utc(2024, 1, 6, 0, 0), utc(2024, 1, 7, 23, 59));
        assert!(minutes.is_empty());
    }

    #[test]
    fn holidays_are_excluded() {
        let nyse = Nyse::with_holidays([NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()]);
        let minutes = nyse.session_minutes(utc(2024, 1, 2, 0, 0), utc(2024, 1, 3, 23, 59));
        // Only the 2024-01-03 session survives.
        assert_eq!(minutes.len(), 390);
        assert_eq!(minutes[0], utc(2024, 1, 3, 14, 30));
    }

    #[test]
    fn bounds_clip_partial_sessions() {
        let nyse = Nyse::new();
        let minutes = nyse.session_minutes(utc(2024, 1, 2, 14, 35), utc(2024, 1, 2, 14, 40));
        assert_eq!(minutes.len(), 6); // 14:35 through 14:40 inclusive
        assert_eq!(minutes[0], utc(2024, 1, 2, 14, 35));
    }

    #[test]
    fn session_open_resolves_in_session_minutes_only() {
        let nyse = Nyse::new();
        let open = utc(2024, 1, 2, 14, 30);
        assert_eq!(nyse.session_open(utc(2024, 1, 2, 15, 0)), Some(open));
        assert_eq!(nyse.session_open(open), Some(open));
        // Final stamped minute is 20:59; 21:00 is past the close.
        assert_eq!(nyse.session_open(utc(2024, 1, 2, 21, 0)), None);
        assert_eq!(nyse.session_open(utc(2024, 1, 6, 15, 0)), None);
    }

    #[test]
    fn dst_boundaries_2024() {
        // Second Sunday of March 2024 is the 10th; first Sunday of November is the 3rd.
        assert_eq!(
            nth_weekday(2024, 3, Weekday::Sun, 2),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert_eq!(
            nth_weekday(2024, 11, Weekday::Sun, 1),
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()
        );
        // Friday before the spring transition is EST, Monday after is EDT.
        assert_eq!(
            eastern_offset(NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
        assert_eq!(
            eastern_offset(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()),
            FixedOffset::west_opt(4 * 3600).unwrap()
        );
    }
}
