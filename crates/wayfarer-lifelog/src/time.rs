//! Opaque instants with day arithmetic under an explicit calendar zone.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    SecondsFormat, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{LifeLogError, LifeLogResult};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_DAY: i64 = MILLIS_PER_SECOND * 60 * 60 * 24;

/// Granularity used to find the first valid instant of a date whose midnight
/// falls in a DST gap.
const GAP_PROBE_MINUTES: i64 = 15;

/// A point in time with epoch-millisecond resolution.
///
/// Serialized as an ISO-8601 UTC string such as `2000-01-01T00:00:01.000Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Current time according to the active clock.
    pub fn now() -> Self {
        crate::clock::now()
    }

    pub fn from_datetime<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Self {
        Self(datetime.timestamp_millis())
    }

    /// Parse an RFC 3339 string.
    pub fn parse(text: &str) -> LifeLogResult<Self> {
        DateTime::parse_from_rfc3339(text)
            .map(|datetime| Self::from_datetime(&datetime))
            .map_err(|e| LifeLogError::InvalidTimestamp(format!("{text}: {e}")))
    }

    /// Convert to a UTC datetime, saturating outside chrono's range.
    pub fn to_utc(self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.0).unwrap_or(if self.0 < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    pub fn to_zoned<Tz: TimeZone>(self, zone: &Tz) -> DateTime<Tz> {
        self.to_utc().with_timezone(zone)
    }

    pub fn add_days(self, days: i64) -> Self {
        Self(self.0.saturating_add(days.saturating_mul(MILLIS_PER_DAY)))
    }

    pub fn add_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds.saturating_mul(MILLIS_PER_SECOND)))
    }

    /// Step whole calendar days in `zone`, keeping the local wall-clock time.
    ///
    /// Unlike [`Timestamp::add_days`] this never skips or repeats a date when a
    /// day is 23 or 25 hours long.
    pub fn add_calendar_days<Tz: TimeZone>(self, days: i64, zone: &Tz) -> Self {
        let local = self.to_zoned(zone).naive_local();
        let shifted = if days >= 0 {
            local.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            local.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted
            .and_then(|naive| resolve_local(&naive, zone))
            .unwrap_or_else(|| self.add_days(days))
    }

    /// Local midnight of this instant's date in `zone`.
    ///
    /// Idempotent: `t.start_of_day(z).start_of_day(z) == t.start_of_day(z)`.
    pub fn start_of_day<Tz: TimeZone>(self, zone: &Tz) -> Self {
        let date = self.to_zoned(zone).date_naive();
        start_of_date(date, zone)
    }

    pub fn weekday<Tz: TimeZone>(self, zone: &Tz) -> Weekday {
        self.to_zoned(zone).weekday()
    }

    pub fn to_iso_string(self) -> String {
        self.to_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// First instant of `date` in `zone`.
fn start_of_date<Tz: TimeZone>(date: NaiveDate, zone: &Tz) -> Timestamp {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(found) = resolve_local(&midnight, zone) {
        return found;
    }
    // Midnight was skipped by a DST transition.
    let probes = MILLIS_PER_DAY / (GAP_PROBE_MINUTES * 60 * MILLIS_PER_SECOND);
    (1..=probes)
        .map(|step| midnight + Duration::minutes(step * GAP_PROBE_MINUTES))
        .take_while(|probe| probe.date() == date)
        .find_map(|probe| resolve_local(&probe, zone))
        .unwrap_or_else(|| Timestamp(midnight.and_utc().timestamp_millis()))
}

fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, zone: &Tz) -> Option<Timestamp> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(datetime) => Some(Timestamp::from_datetime(&datetime)),
        LocalResult::Ambiguous(earliest, _) => Some(Timestamp::from_datetime(&earliest)),
        LocalResult::None => None,
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(datetime: DateTime<Tz>) -> Self {
        Self::from_datetime(&datetime)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl FromStr for Timestamp {
    type Err = LifeLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().into()
    }

    #[test]
    fn test_iso_string_has_millis_and_z() {
        let t = utc(2000, 1, 1, 0, 0).add_seconds(1);
        assert_eq!(t.to_iso_string(), "2000-01-01T00:00:01.000Z");
    }

    #[test]
    fn test_parse_offset_string() {
        let t = Timestamp::parse("2021-12-30T00:00:00+09:00").unwrap();
        assert_eq!(t, utc(2021, 12, 29, 15, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(LifeLogError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_add_days_and_seconds() {
        let t = utc(2000, 1, 10, 12, 0);
        assert_eq!(t.add_days(-9), utc(2000, 1, 1, 12, 0));
        assert_eq!(t.add_seconds(60), utc(2000, 1, 10, 12, 1));
        assert!(t.add_days(1) > t);
    }

    #[test]
    fn test_start_of_day_utc() {
        let t = utc(2000, 2, 1, 23, 59);
        assert_eq!(t.start_of_day(&Utc), utc(2000, 2, 1, 0, 0));
    }

    #[test]
    fn test_start_of_day_idempotent() {
        let t = utc(2021, 12, 29, 16, 30);
        let once = t.start_of_day(&jst());
        assert_eq!(once.start_of_day(&jst()), once);
    }

    #[test]
    fn test_start_of_day_depends_on_zone() {
        // 2021-12-29T16:30Z is already 2021-12-30 01:30 in Tokyo.
        let t = utc(2021, 12, 29, 16, 30);
        assert_eq!(t.start_of_day(&jst()), utc(2021, 12, 29, 15, 0));
        assert_eq!(t.start_of_day(&Utc), utc(2021, 12, 29, 0, 0));
    }

    #[test]
    fn test_calendar_days_keep_wall_clock() {
        let t = utc(2022, 1, 1, 13, 0);
        assert_eq!(t.add_calendar_days(-3, &jst()), utc(2021, 12, 29, 13, 0));
        assert_eq!(t.add_calendar_days(2, &Utc), utc(2022, 1, 3, 13, 0));
    }

    #[test]
    fn test_weekday_in_zone() {
        // Saturday 2022-01-01 15:00Z is Sunday in Tokyo.
        let t = utc(2022, 1, 1, 15, 0);
        assert_eq!(t.weekday(&Utc), Weekday::Sat);
        assert_eq!(t.weekday(&jst()), Weekday::Sun);
    }

    #[test]
    fn test_serde_as_string() {
        let t = utc(2000, 1, 1, 0, 0);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2000-01-01T00:00:00.000Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
