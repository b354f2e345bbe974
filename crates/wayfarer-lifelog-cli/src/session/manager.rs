//! Store file lifecycle and the read-side queries behind each subcommand.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use wayfarer_lifelog::{
    day_summaries, weekday_name, ChartSink, FileBackend, Ingestor, LifeLogData, LogPage, LogStore,
    Timestamp,
};

use crate::types::{CliError, CliResult};

/// One day of a summary window, ready for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub date: String,
    pub weekday: &'static str,
    pub finished: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<i64>,
}

/// Identities and page counts of a store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub path: String,
    pub identities: Vec<(String, usize)>,
}

impl StoreReport {
    pub fn page_count(&self) -> usize {
        self.identities.iter().map(|(_, pages)| pages).sum()
    }
}

/// Owns the store file location and the zone days are computed in.
pub struct LifeLogSessionManager<Tz> {
    file_path: PathBuf,
    zone: Tz,
}

impl<Tz: TimeZone> LifeLogSessionManager<Tz> {
    /// Open a store file, creating its directory if needed. The file itself
    /// is written on the first recorded snapshot.
    pub fn open(path: impl Into<PathBuf>, zone: Tz) -> CliResult<Self> {
        let file_path = path.into();

        if file_path.exists() {
            tracing::info!("Opening existing store file: {}", file_path.display());
        } else {
            tracing::info!("Store file will be created at: {}", file_path.display());
            if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CliError::Io(std::io::Error::other(format!(
                        "Failed to create directory {}: {e}",
                        parent.display()
                    )))
                })?;
            }
        }

        Ok(Self { file_path, zone })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn zone(&self) -> &Tz {
        &self.zone
    }

    pub fn store(&self) -> LogStore<LifeLogData, FileBackend> {
        LogStore::new(FileBackend::new(&self.file_path))
    }

    pub fn ingestor<C: ChartSink>(&self, chart: C) -> Ingestor<FileBackend, C, Tz> {
        Ingestor::new(self.store(), chart, self.zone.clone())
    }

    /// Summary window of `days` ending on the day containing `at`.
    pub fn summaries(&self, id: &str, at: Timestamp, days: u32) -> CliResult<Vec<SummaryRow>> {
        let summaries = day_summaries(&self.store(), id, at, days, &self.zone)?;
        let first = at.add_calendar_days(-i64::from(days) + 1, &self.zone);

        Ok(summaries
            .into_iter()
            .enumerate()
            .map(|(offset, summary)| {
                let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                let day = first.add_calendar_days(offset, &self.zone);
                SummaryRow {
                    date: day.to_zoned(&self.zone).date_naive().to_string(),
                    weekday: weekday_name(day.weekday(&self.zone)),
                    finished: summary.finished,
                    agreement: summary.agreement,
                }
            })
            .collect())
    }

    /// Pages of `id` that touch the calendar day `date`.
    pub fn pages_for_day(&self, id: &str, date: NaiveDate) -> CliResult<Vec<LogPage<LifeLogData>>> {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .and_then(|local| self.zone.from_local_datetime(&local).single())
            .ok_or_else(|| CliError::InvalidArgument(format!("invalid day: {date}")))?;
        Ok(self.store().get_pages_for_day(id, noon.into(), &self.zone)?)
    }

    /// Whole store as pretty JSON.
    pub fn export(&self) -> CliResult<String> {
        let logs = self.store().snapshot()?;
        Ok(serde_json::to_string_pretty(&logs)?)
    }

    /// Load the store and count pages per identity.
    pub fn validate(&self) -> CliResult<StoreReport> {
        let identities = self
            .store()
            .logs()?
            .map(|log| (log.id, log.pages.len()))
            .collect();

        Ok(StoreReport {
            path: self.file_path.display().to_string(),
            identities,
        })
    }
}
