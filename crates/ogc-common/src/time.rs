//! Time handling for WMS TIME parameters and time dimensions.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::OgcError;

/// Format an instant the way WMS servers expect it in TIME parameters.
///
/// Whole seconds produce `yyyy-MM-ddTHH:mm:ssZ`; instants with a sub-second
/// part keep millisecond precision.
pub fn format_wms_time(dt: &DateTime<Utc>) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

/// Parse an ISO 8601 instant.
///
/// Accepts RFC 3339, a datetime without zone (UTC assumed) and a bare date.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Parse an ISO 8601 duration such as `PT1H`, `P1D`, `P2W` or `P1DT6H30M`.
///
/// Year and month designators have no fixed length and are rejected.
pub fn parse_iso_duration(s: &str) -> Result<Duration, TimeParseError> {
    let invalid = || TimeParseError::InvalidDuration(s.to_string());
    let body = s.trim().strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::zero();
    let mut in_time = false;
    let mut number = String::new();

    for c in body.chars() {
        match c {
            'T' => {
                if in_time || !number.is_empty() {
                    return Err(invalid());
                }
                in_time = true;
            }
            '0'..='9' | '.' => number.push(c),
            unit => {
                let value: f64 = number.parse().map_err(|_| invalid())?;
                number.clear();
                let seconds = match (unit, in_time) {
                    ('W', false) => value * 7.0 * 86_400.0,
                    ('D', false) => value * 86_400.0,
                    ('H', true) => value * 3_600.0,
                    ('M', true) => value * 60.0,
                    ('S', true) => value,
                    ('Y', false) | ('M', false) => {
                        return Err(TimeParseError::CalendarPeriod(s.to_string()))
                    }
                    _ => return Err(invalid()),
                };
                let millis = (seconds * 1000.0).round();
                if !millis.is_finite() || millis >= i64::MAX as f64 {
                    return Err(invalid());
                }
                total = total
                    .checked_add(&Duration::milliseconds(millis as i64))
                    .ok_or_else(invalid)?;
            }
        }
    }

    if !number.is_empty() || total <= Duration::zero() {
        return Err(invalid());
    }
    Ok(total)
}

/// A time range for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A degenerate range covering a single instant.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    /// Encode as a WMS TIME value: a single instant when both bounds are
    /// equal, `start/end` otherwise.
    pub fn to_wms_time(&self) -> String {
        if self.is_instant() {
            format_wms_time(&self.start)
        } else {
            format!(
                "{}/{}",
                format_wms_time(&self.start),
                format_wms_time(&self.end)
            )
        }
    }

    /// Parse WMS TIME parameter.
    ///
    /// Supports:
    /// - Single time: "2024-01-15T12:00:00Z"
    /// - Time range: "2024-01-15T00:00:00Z/2024-01-16T00:00:00Z"
    /// - Time range with period: "2024-01-15T00:00:00Z/2024-01-16T00:00:00Z/PT1H",
    ///   requested as the whole range
    /// - Time list: "2024-01-15T00:00:00Z,2024-01-15T06:00:00Z"
    /// - "current"
    pub fn from_wms_time(s: &str) -> Result<TimeSpec, TimeParseError> {
        if s.eq_ignore_ascii_case("current") {
            return Ok(TimeSpec::Current);
        }

        if s.contains('/') {
            let parts: Vec<&str> = s.split('/').collect();
            let (start, end) = match parts.as_slice() {
                [start, end] => (start, end),
                [start, end, period] => {
                    match parse_iso_duration(period) {
                        Ok(_) | Err(TimeParseError::CalendarPeriod(_)) => {}
                        Err(e) => return Err(e),
                    }
                    (start, end)
                }
                _ => return Err(TimeParseError::InvalidFormat(s.to_string())),
            };
            let start_dt = parse_iso8601(start)?;
            let end_dt = parse_iso8601(end)?;
            return Ok(TimeSpec::Range(TimeRange::new(start_dt, end_dt)));
        }

        if s.contains(',') {
            let times: Result<Vec<_>, _> = s.split(',').map(parse_iso8601).collect();
            return Ok(TimeSpec::List(times?));
        }

        Ok(TimeSpec::Single(parse_iso8601(s)?))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

/// Parsed TIME parameter specification.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSpec {
    /// Use current/latest available time
    Current,
    /// Single specific time
    Single(DateTime<Utc>),
    /// Time range (start/end)
    Range(TimeRange),
    /// Explicit list of times
    List(Vec<DateTime<Utc>>),
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid ISO 8601 duration: {0}")]
    InvalidDuration(String),

    #[error("Calendar periods (years, months) have no fixed length: {0}")]
    CalendarPeriod(String),
}

impl From<TimeParseError> for OgcError {
    fn from(err: TimeParseError) -> Self {
        OgcError::InvalidTime(err.to_string())
    }
}

/// One entry of a time dimension extent.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeExtentEntry {
    Instant(DateTime<Utc>),
    /// `start/end[/period]`; without a usable period the interval is continuous.
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: Option<Duration>,
    },
}

impl TimeExtentEntry {
    fn nearest(&self, target: &DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeExtentEntry::Instant(t) => *t,
            TimeExtentEntry::Interval { start, end, period } => {
                if target <= start {
                    return *start;
                }
                if target >= end {
                    return *end;
                }
                let Some(period) = period else {
                    return *target;
                };
                let step = period.num_milliseconds();
                let offset = (*target - *start).num_milliseconds();
                if step <= 0 {
                    return *target;
                }
                let Some(below) =
                    start.checked_add_signed(Duration::milliseconds(offset / step * step))
                else {
                    return *start;
                };
                // A period running past the representable range leaves only `below`
                match below.checked_add_signed(*period) {
                    Some(above) if above <= *end && (*target - below) > (above - *target) => above,
                    _ => below,
                }
            }
        }
    }
}

/// Values declared by a capabilities time dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeDimensionValues {
    pub entries: Vec<TimeExtentEntry>,
}

impl TimeDimensionValues {
    /// Parse a comma-separated extent like
    /// `2024-01-01T00:00:00Z,2024-01-02T00:00:00Z/2024-01-03T00:00:00Z/PT6H`.
    pub fn parse(text: &str) -> Result<Self, TimeParseError> {
        let mut entries = Vec::new();

        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = item.split('/').collect();
            let entry = match parts.as_slice() {
                [instant] => TimeExtentEntry::Instant(parse_iso8601(instant)?),
                [start, end] => TimeExtentEntry::Interval {
                    start: parse_iso8601(start)?,
                    end: parse_iso8601(end)?,
                    period: None,
                },
                [start, end, period] => TimeExtentEntry::Interval {
                    start: parse_iso8601(start)?,
                    end: parse_iso8601(end)?,
                    period: match parse_iso_duration(period) {
                        Ok(d) => Some(d),
                        Err(TimeParseError::CalendarPeriod(_)) => None,
                        Err(e) => return Err(e),
                    },
                },
                _ => return Err(TimeParseError::InvalidFormat(item.to_string())),
            };
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The available instant closest to `target`.
    pub fn nearest(&self, target: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .map(|entry| entry.nearest(target))
            .min_by_key(|candidate| (*candidate - *target).num_milliseconds().abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_iso8601("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);

        assert_eq!(parse_iso8601("2024-01-15").unwrap(), utc(2024, 1, 15, 0));
        assert!(parse_iso8601("yesterday").is_err());
    }

    #[test]
    fn test_parse_wms_time_range() {
        let spec = TimeRange::from_wms_time("2024-01-15T00:00:00Z/2024-01-16T00:00:00Z").unwrap();
        assert_eq!(
            spec,
            TimeSpec::Range(TimeRange::new(utc(2024, 1, 15, 0), utc(2024, 1, 16, 0)))
        );
    }

    #[test]
    fn test_parse_wms_time_range_with_period() {
        let spec =
            TimeRange::from_wms_time("2024-01-15T00:00:00Z/2024-01-16T00:00:00Z/PT1H").unwrap();
        assert_eq!(
            spec,
            TimeSpec::Range(TimeRange::new(utc(2024, 1, 15, 0), utc(2024, 1, 16, 0)))
        );
        assert!(TimeRange::from_wms_time("2024-01-15T00:00:00Z/2024-02-15T00:00:00Z/P1M").is_ok());
        assert!(TimeRange::from_wms_time("2024-01-15T00:00:00Z/2024-01-16T00:00:00Z/hourly").is_err());
        assert!(matches!(
            TimeRange::from_wms_time("2024-01-15T00:00:00Z/2024-01-16T00:00:00Z/PT1H/x"),
            Err(TimeParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_wms_time_encoding() {
        assert_eq!(
            TimeRange::instant(utc(2024, 1, 15, 12)).to_wms_time(),
            "2024-01-15T12:00:00Z"
        );
        assert_eq!(
            TimeRange::new(utc(2024, 1, 15, 0), utc(2024, 1, 16, 0)).to_wms_time(),
            "2024-01-15T00:00:00Z/2024-01-16T00:00:00Z"
        );
        let precise = utc(2024, 1, 15, 12) + Duration::milliseconds(250);
        assert_eq!(format_wms_time(&precise), "2024-01-15T12:00:00.250Z");
    }

    #[test]
    fn test_iso_duration() {
        assert_eq!(parse_iso_duration("PT1H").unwrap(), Duration::hours(1));
        assert_eq!(
            parse_iso_duration("P1DT6H30M").unwrap(),
            Duration::hours(30) + Duration::minutes(30)
        );
        assert_eq!(parse_iso_duration("P2W").unwrap(), Duration::days(14));
        assert!(matches!(
            parse_iso_duration("P1M"),
            Err(TimeParseError::CalendarPeriod(_))
        ));
        assert!(parse_iso_duration("1H").is_err());
        assert!(parse_iso_duration("PT").is_err());
    }

    #[test]
    fn test_iso_duration_out_of_range() {
        assert!(matches!(
            parse_iso_duration("P99999999999999999999DT99999999999999999999H"),
            Err(TimeParseError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_iso_duration("P99999999999999W"),
            Err(TimeParseError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_nearest_in_list() {
        let values = TimeDimensionValues::parse(
            "2024-01-01T00:00:00Z,2024-01-01T06:00:00Z,2024-01-01T12:00:00Z",
        )
        .unwrap();
        let target = utc(2024, 1, 1, 7);
        assert_eq!(values.nearest(&target), Some(utc(2024, 1, 1, 6)));
        assert_eq!(values.nearest(&utc(2023, 6, 1, 0)), Some(utc(2024, 1, 1, 0)));
    }

    #[test]
    fn test_nearest_in_periodic_interval() {
        let values =
            TimeDimensionValues::parse("2024-01-01T00:00:00Z/2024-01-02T00:00:00Z/PT6H").unwrap();
        assert_eq!(values.nearest(&utc(2024, 1, 1, 8)), Some(utc(2024, 1, 1, 6)));
        assert_eq!(values.nearest(&utc(2024, 1, 1, 10)), Some(utc(2024, 1, 1, 12)));
        assert_eq!(values.nearest(&utc(2024, 1, 5, 0)), Some(utc(2024, 1, 2, 0)));
    }

    #[test]
    fn test_nearest_with_unrepresentable_step() {
        // One step from the start lands beyond the last representable date
        let values =
            TimeDimensionValues::parse("2024-01-01T00:00:00Z/2024-01-03T00:00:00Z/P99999999D")
                .unwrap();
        assert_eq!(values.nearest(&utc(2024, 1, 2, 0)), Some(utc(2024, 1, 1, 0)));
        assert_eq!(values.nearest(&utc(2024, 1, 4, 0)), Some(utc(2024, 1, 3, 0)));
    }

    #[test]
    fn test_nearest_in_continuous_interval() {
        let values =
            TimeDimensionValues::parse("2024-01-01T00:00:00Z/2024-12-01T00:00:00Z/P1M").unwrap();
        let target = utc(2024, 3, 17, 5);
        assert_eq!(values.nearest(&target), Some(target));
        assert!(TimeDimensionValues::default().nearest(&target).is_none());
    }
}
