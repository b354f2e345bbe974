//! Plain-text rendering of the summary window.

use std::io::Write;

use chrono::TimeZone;

use wayfarer_lifelog::{day_labels, ChartSink, DaySummary, Timestamp};

/// Prints one row per day each time new data arrives.
pub struct TextChart<W, Tz> {
    out: W,
    zone: Tz,
}

impl<Tz: TimeZone> TextChart<std::io::Stdout, Tz> {
    pub fn stdout(zone: Tz) -> Self {
        Self::new(std::io::stdout(), zone)
    }
}

impl<W: Write, Tz: TimeZone> TextChart<W, Tz> {
    pub fn new(out: W, zone: Tz) -> Self {
        Self { out, zone }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, current_day: Timestamp, summaries: &[DaySummary]) -> std::io::Result<()> {
        let labels = day_labels(current_day, summaries.len(), &self.zone);
        writeln!(self.out, "{:<10} {:>9} {:>9}", "day", "finished", "agreement")?;
        for (label, summary) in labels.iter().zip(summaries) {
            let agreement = summary
                .agreement
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                self.out,
                "{label:<10} {:>9} {agreement:>9}",
                summary.finished
            )?;
        }
        self.out.flush()
    }
}

impl<W: Write, Tz: TimeZone> ChartSink for TextChart<W, Tz> {
    fn set_data(&mut self, current_day: Timestamp, summaries: &[DaySummary]) {
        if let Err(e) = self.render(current_day, summaries) {
            tracing::warn!("Failed to draw chart: {e}");
        }
    }
}
