//! Simulation window bounds.

use std::str::FromStr;

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, WbError};

/// A point or period in time usable as a window bound.
///
/// Strings name a period (`"2000"`, `"2000-06"`, `"2000-06-15"`) or an instant
/// (`"2000-06-15 12:00:00"`). As a lower bound the period starts the window;
/// as an upper bound the whole period is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBound {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeBound {
    fn period(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: end_of_day(last),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

impl From<NaiveDate> for TimeBound {
    fn from(date: NaiveDate) -> Self {
        Self::period(date, date)
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(t: NaiveDateTime) -> Self {
        Self { start: t, end: t }
    }
}

impl FromStr for TimeBound {
    type Err = WbError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || WbError::InvalidTimeBound(s.to_string());

        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(t.into());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date.into());
        }
        if let Ok(first) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|d| d.pred_opt())
                .ok_or_else(invalid)?;
            return Ok(Self::period(first, last));
        }
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            let year: i32 = s.parse().map_err(|_| invalid())?;
            let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
            let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
            return Ok(Self::period(first, last));
        }
        Err(invalid())
    }
}

impl TryFrom<&str> for TimeBound {
    type Error = WbError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Inclusive simulation window. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimWindow {
    pub tmin: Option<NaiveDateTime>,
    pub tmax: Option<NaiveDateTime>,
}

impl SimWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(tmin: Option<TimeBound>, tmax: Option<TimeBound>) -> Result<Self> {
        let window = Self {
            tmin: tmin.map(|b| b.start()),
            tmax: tmax.map(|b| b.end()),
        };
        if let (Some(tmin), Some(tmax)) = (window.tmin, window.tmax) {
            if tmin > tmax {
                return Err(WbError::InvalidWindow { tmin, tmax });
            }
        }
        Ok(window)
    }

    pub fn parse(tmin: Option<&str>, tmax: Option<&str>) -> Result<Self> {
        let tmin = tmin.map(TimeBound::from_str).transpose()?;
        let tmax = tmax.map(TimeBound::from_str).transpose()?;
        Self::new(tmin, tmax)
    }

    pub fn is_unbounded(&self) -> bool {
        self.tmin.is_none() && self.tmax.is_none()
    }

    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        self.tmin.is_none_or(|tmin| *t >= tmin) && self.tmax.is_none_or(|tmax| *t <= tmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn year_bound_spans_the_whole_year() {
        let window = SimWindow::parse(Some("2000"), Some("2015")).unwrap();
        assert_eq!(window.tmin, Some(at(2000, 1, 1)));
        assert!(window.contains(&at(2015, 12, 31)));
        assert!(!window.contains(&at(2016, 1, 1)));
        assert!(!window.contains(&at(1999, 12, 31)));
    }

    #[test]
    fn month_bound_ends_on_last_day() {
        let window = SimWindow::parse(None, Some("2000-02")).unwrap();
        assert!(window.contains(&at(2000, 2, 29)));
        assert!(!window.contains(&at(2000, 3, 1)));
    }

    #[test]
    fn date_values_are_accepted() {
        let d = NaiveDate::from_ymd_opt(2001, 5, 4).unwrap();
        let window = SimWindow::new(Some(d.into()), Some(d.into())).unwrap();
        assert!(window.contains(&at(2001, 5, 4)));
        assert!(window.contains(&at(2001, 5, 4).date().and_hms_opt(18, 0, 0).unwrap()));
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(matches!(
            SimWindow::parse(Some("2010"), Some("2000")),
            Err(WbError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            "yesterday".parse::<TimeBound>(),
            Err(WbError::InvalidTimeBound(_))
        ));
    }
}
