//! Backward-fill resolution and daily deltas of cumulative counters.

use chrono::TimeZone;

use crate::log_store::DayPages;
use crate::time::Timestamp;
use crate::types::{DaySummary, LifeLogData, LifeLogResult};

/// Days shown in a summary window, also used as the backward-fill horizon.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Resolve the most recent value `extract` finds on `day`, searching earlier
/// days when `day` has none.
///
/// Pages on the same day are scanned newest-appended first, so the latest
/// snapshot of a day wins. At most `horizon` distinct days are inspected;
/// `Ok(None)` means the search was exhausted.
pub fn pick_log<T, U, S, Tz, F>(
    source: &S,
    id: &str,
    day: Timestamp,
    horizon: i32,
    zone: &Tz,
    mut extract: F,
) -> LifeLogResult<Option<U>>
where
    S: DayPages<T>,
    Tz: TimeZone,
    F: FnMut(&T) -> Option<U>,
{
    let mut day = day;
    let mut remaining = horizon;
    while remaining > 0 {
        let pages = source.pages_for_day(id, day, zone)?;
        if let Some(found) = pages.iter().rev().find_map(|page| extract(&page.data)) {
            return Ok(Some(found));
        }
        day = day.add_calendar_days(-1, zone);
        remaining -= 1;
    }
    tracing::debug!("No value for {id} within {horizon} days");
    Ok(None)
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    finished: i64,
    agreement: i64,
}

fn profile_counters(data: &LifeLogData) -> Option<Counters> {
    match data {
        LifeLogData::Properties(_) => None,
        LifeLogData::Profile(profile) => Some(Counters {
            finished: profile.finished,
            agreement: profile.agreement(),
        }),
    }
}

/// Change of the profile counters between `day - 1` and `day`.
///
/// Both ends are resolved independently with the same `horizon`. If either
/// has no history the summary is all zero. Deltas are signed.
pub fn get_day_summary<S, Tz>(
    source: &S,
    id: &str,
    day: Timestamp,
    horizon: i32,
    zone: &Tz,
) -> LifeLogResult<DaySummary>
where
    S: DayPages<LifeLogData>,
    Tz: TimeZone,
{
    let today = pick_log(source, id, day, horizon, zone, profile_counters)?;
    let yesterday = pick_log(
        source,
        id,
        day.add_calendar_days(-1, zone),
        horizon,
        zone,
        profile_counters,
    )?;

    Ok(match (today, yesterday) {
        (Some(today), Some(yesterday)) => DaySummary {
            finished: today.finished - yesterday.finished,
            agreement: Some(today.agreement - yesterday.agreement),
        },
        _ => DaySummary::unchanged(),
    })
}

/// Trailing window of `days` summaries ending at `now`, oldest first.
pub fn day_summaries<S, Tz>(
    source: &S,
    id: &str,
    now: Timestamp,
    days: u32,
    zone: &Tz,
) -> LifeLogResult<Vec<DaySummary>>
where
    S: DayPages<LifeLogData>,
    Tz: TimeZone,
{
    let horizon = i32::try_from(days).unwrap_or(i32::MAX);
    (0..days)
        .rev()
        .map(|back| {
            let day = now.add_calendar_days(-i64::from(back), zone);
            get_day_summary(source, id, day, horizon, zone)
        })
        .collect()
}
