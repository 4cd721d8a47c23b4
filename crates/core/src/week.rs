//! Week label parsing and active-week resolution.
//!
//! Rosters are published per week under labels such as
//! `"08/01/24 au 14/01/24"`. [`WeekInterval::parse`] turns a label into a
//! concrete interval, and [`ActiveWeekResolver`] picks the week to show by
//! default, keeping yesterday's week on screen until the morning cutover.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::WeekSchedule;

/// Separator between the two dates of a week label.
pub const WEEK_LABEL_SEPARATOR: &str = " au ";

/// Date format of each side of a week label (two-digit year).
pub const WEEK_LABEL_DATE_FORMAT: &str = "%d/%m/%y";

/// Why a week label could not be turned into an interval.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WeekLabelError {
    #[error("week label is missing the ' au ' separator")]
    MissingSeparator,
    #[error("week label contains more than one ' au ' separator")]
    RepeatedSeparator,
    #[error("invalid date in week label: {0:?}")]
    InvalidDate(String),
    #[error("week label ends before it starts")]
    Reversed,
}

/// A closed interval from the start of one day to the end of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl WeekInterval {
    /// Parse a label of the form `"dd/mm/yy au dd/mm/yy"`.
    ///
    /// ```
    /// use pharmaguard_core::WeekInterval;
    ///
    /// let week = WeekInterval::parse("01/01/24 au 07/01/24").unwrap();
    /// assert_eq!(week.first_day().to_string(), "2024-01-01");
    /// assert_eq!(week.last_day().to_string(), "2024-01-07");
    ///
    /// assert!(WeekInterval::parse("01/01/24 - 07/01/24").is_err());
    /// assert!(WeekInterval::parse("31/04/24 au 07/05/24").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`WeekLabelError`] if the separator is missing or repeated,
    /// either date is not a real calendar date, or the end precedes the start.
    pub fn parse(label: &str) -> Result<Self, WeekLabelError> {
        let mut parts = label.split(WEEK_LABEL_SEPARATOR);
        let (Some(first), Some(last)) = (parts.next(), parts.next()) else {
            return Err(WeekLabelError::MissingSeparator);
        };
        if parts.next().is_some() {
            return Err(WeekLabelError::RepeatedSeparator);
        }

        let first = parse_date(first)?;
        let last = parse_date(last)?;
        if last < first {
            return Err(WeekLabelError::Reversed);
        }

        Ok(Self::from_days(first, last))
    }

    /// Interval covering `first` 00:00:00 through `last` 23:59:59.999.
    #[must_use]
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Self {
        let start = first.and_time(NaiveTime::MIN);
        let end = last.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
        Self { start, end }
    }

    /// Start of the first day.
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// End of the last day.
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end.date()
    }

    /// Whether `instant` falls inside the interval, both ends included.
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether `day` is one of the days covered by the interval.
    #[must_use]
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.first_day() <= day && day <= self.last_day()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, WeekLabelError> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, WEEK_LABEL_DATE_FORMAT)
        .map_err(|_| WeekLabelError::InvalidDate(trimmed.to_owned()))
}

/// Chooses which week of a roster is "current".
///
/// Rosters change over at a fixed time each morning (07:00 by default).
/// Before the cutover the previous day is used, so the night's on-duty
/// pharmacies stay on screen until the new roster takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWeekResolver {
    cutover: NaiveTime,
}

impl Default for ActiveWeekResolver {
    fn default() -> Self {
        Self {
            cutover: NaiveTime::from_hms_opt(Self::DEFAULT_CUTOVER_HOUR, 0, 0)
                .unwrap_or(NaiveTime::MIN),
        }
    }
}

impl ActiveWeekResolver {
    /// Hour at which rosters change over unless configured otherwise.
    pub const DEFAULT_CUTOVER_HOUR: u32 = 7;

    /// Create a resolver with a custom daily cutover time.
    #[must_use]
    pub const fn new(cutover: NaiveTime) -> Self {
        Self { cutover }
    }

    #[must_use]
    pub const fn cutover(&self) -> NaiveTime {
        self.cutover
    }

    /// The calendar day whose roster applies at local time `now`.
    #[must_use]
    pub fn effective_day(&self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        if now.time() < self.cutover {
            today.pred_opt().unwrap_or(today)
        } else {
            today
        }
    }

    /// Index of the first week containing the effective day.
    ///
    /// Weeks with malformed labels are skipped. Returns `None` when no week
    /// matches; callers must show an explicit "no roster" state rather than
    /// fall back to the first week.
    #[must_use]
    pub fn resolve(&self, now: NaiveDateTime, weeks: &[WeekSchedule]) -> Option<usize> {
        let day = self.effective_day(now);
        weeks
            .iter()
            .position(|week| week.interval().is_ok_and(|interval| interval.contains_day(day)))
    }
}
