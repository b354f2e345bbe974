//! Boundary to whatever renders the daily summary window.

use chrono::{TimeZone, Weekday};

use crate::time::Timestamp;
use crate::types::DaySummary;

/// Receives the trailing summary window after every recorded snapshot.
///
/// `summaries` are ordered oldest first and the last one belongs to
/// `current_day`.
pub trait ChartSink {
    fn set_data(&mut self, current_day: Timestamp, summaries: &[DaySummary]);
}

impl<C: ChartSink + ?Sized> ChartSink for &mut C {
    fn set_data(&mut self, current_day: Timestamp, summaries: &[DaySummary]) {
        (**self).set_data(current_day, summaries)
    }
}

impl<C: ChartSink + ?Sized> ChartSink for Box<C> {
    fn set_data(&mut self, current_day: Timestamp, summaries: &[DaySummary]) {
        (**self).set_data(current_day, summaries)
    }
}

/// Keeps the most recent data set. Useful when nothing needs drawing.
#[derive(Debug, Clone, Default)]
pub struct RecordingChart {
    pub current_day: Option<Timestamp>,
    pub summaries: Vec<DaySummary>,
    pub updates: usize,
}

impl ChartSink for RecordingChart {
    fn set_data(&mut self, current_day: Timestamp, summaries: &[DaySummary]) {
        self.current_day = Some(current_day);
        self.summaries = summaries.to_vec();
        self.updates += 1;
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Weekday labels for `count` days ending at `current_day`, oldest first.
pub fn day_labels<Tz: TimeZone>(
    current_day: Timestamp,
    count: usize,
    zone: &Tz,
) -> Vec<&'static str> {
    (0..count)
        .rev()
        .map(|back| {
            let back = i64::try_from(back).unwrap_or(i64::MAX);
            weekday_name(current_day.add_calendar_days(-back, zone).weekday(zone))
        })
        .collect()
}
