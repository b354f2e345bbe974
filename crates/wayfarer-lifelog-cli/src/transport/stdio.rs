//! Stdio watcher: reads intercepted responses from stdin, one JSON per line.

use chrono::TimeZone;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use wayfarer_lifelog::{BlobBackend, ChartSink, Ingestor, Outcome};

use crate::types::{CliError, CliResult};

use super::framing;

/// Counts of what happened to each line of a watch stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub recorded: usize,
    /// Unknown URLs and profiles with no known account.
    pub skipped: usize,
    /// Unparseable lines and rejected responses.
    pub failed: usize,
}

/// Feeds every line of a stream into an [`Ingestor`].
pub struct StdioWatcher<B, C, Tz> {
    ingestor: Ingestor<B, C, Tz>,
}

impl<B, C, Tz> StdioWatcher<B, C, Tz>
where
    B: BlobBackend,
    C: ChartSink,
    Tz: TimeZone,
{
    pub fn new(ingestor: Ingestor<B, C, Tz>) -> Self {
        Self { ingestor }
    }

    pub fn ingestor(&self) -> &Ingestor<B, C, Tz> {
        &self.ingestor
    }

    pub fn into_ingestor(self) -> Ingestor<B, C, Tz> {
        self.ingestor
    }

    /// Run until EOF on stdin.
    pub async fn run(&mut self) -> CliResult<WatchStats> {
        self.run_from(BufReader::new(tokio::io::stdin())).await
    }

    /// Run until EOF on `reader`. Bad lines are logged and skipped.
    pub async fn run_from<R: AsyncBufRead + Unpin>(&mut self, mut reader: R) -> CliResult<WatchStats> {
        let mut stats = WatchStats::default();
        let mut line = String::new();
        let mut line_no = 0usize;

        tracing::info!("Watching for responses");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(CliError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on input, shutting down");
                break;
            }
            line_no += 1;

            let response = match framing::parse_line(&line) {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Line {line_no}: {e}");
                    stats.failed += 1;
                    continue;
                }
            };

            match self.ingestor.dispatch(&response.url, &response.body_text()) {
                Some(Outcome::Recorded { .. }) => stats.recorded += 1,
                Some(Outcome::Ignored) | Some(Outcome::NoIdentity) => stats.skipped += 1,
                None => stats.failed += 1,
            }
        }

        tracing::info!(
            "Watch finished: {} recorded, {} skipped, {} failed",
            stats.recorded,
            stats.skipped,
            stats.failed
        );
        Ok(stats)
    }
}
