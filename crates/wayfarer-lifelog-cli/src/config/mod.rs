//! Configuration loading and resolution.
//!
//! Each setting is taken from its command-line flag, then its environment
//! variable, then a default.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;

use crate::types::{CliError, CliResult};

pub const STORE_ENV: &str = "LIFELOG_FILE";
pub const OFFSET_ENV: &str = "LIFELOG_UTC_OFFSET";

/// Store used when the working directory has one.
const PROJECT_STORE: &str = ".lifelog/lifelog.json";
const HOME_STORE: &str = ".wayfarer-lifelog/lifelog.json";

/// Zone whose midnights delimit days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSetting {
    /// The system zone, including its daylight saving rules.
    Local,
    Fixed(FixedOffset),
}

/// Everything the commands need before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store_path: PathBuf,
    pub zone: ZoneSetting,
}

impl Settings {
    pub fn resolve(store: Option<&str>, utc_offset: Option<&str>) -> CliResult<Self> {
        Ok(Self {
            store_path: resolve_store_path(store),
            zone: resolve_zone(utc_offset)?,
        })
    }
}

/// Resolve the store file path.
pub fn resolve_store_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(str::to_string)
        .or_else(|| env_value(STORE_ENV))
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from(PROJECT_STORE)).filter(|path| path.exists()))
        .unwrap_or_else(|| home_dir().join(HOME_STORE))
}

/// Resolve the day zone. Without an explicit offset the system zone is used,
/// so days on either side of a DST change keep their own midnight.
pub fn resolve_zone(explicit: Option<&str>) -> CliResult<ZoneSetting> {
    match explicit.map(str::to_string).or_else(|| env_value(OFFSET_ENV)) {
        Some(text) => parse_utc_offset(&text).map(ZoneSetting::Fixed),
        None => Ok(ZoneSetting::Local),
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

/// Parse `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(text: &str) -> CliResult<FixedOffset> {
    let invalid = || CliError::InvalidArgument(format!("invalid UTC offset: {text:?}"));

    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = text.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = text.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    if !rest.is_ascii() {
        return Err(invalid());
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None => return Err(invalid()),
    };
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_store_path_wins() {
        assert_eq!(resolve_store_path(Some("/tmp/a.json")), PathBuf::from("/tmp/a.json"));
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(parse_utc_offset("+09:00").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(parse_utc_offset("-05:30").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("+0100").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_reject_bad_offsets() {
        for text in ["", "09:00", "+9:00", "+24:00", "+09:60", "+ab:cd", "+09", "+-1:00"] {
            assert!(parse_utc_offset(text).is_err(), "{text} accepted");
        }
    }

    #[test]
    fn test_explicit_zone_is_fixed() {
        let zone = resolve_zone(Some("+02:00")).unwrap();
        assert_eq!(zone, ZoneSetting::Fixed(FixedOffset::east_opt(7200).unwrap()));
    }

    #[test]
    fn test_settings_reject_bad_offset() {
        let err = Settings::resolve(Some("/tmp/a.json"), Some("nine")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
