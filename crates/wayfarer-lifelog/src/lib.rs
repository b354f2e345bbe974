//! Wayfarer LifeLog: a temporal log of account snapshots and the daily
//! progress summaries derived from it.

pub mod chart;
pub mod clock;
pub mod ingest;
pub mod log_store;
pub mod shape;
pub mod storage;
pub mod summary;
pub mod time;
pub mod types;

pub use chart::{day_labels, weekday_name, ChartSink, RecordingChart};
pub use clock::{
    with_override, with_override_async, Clock, FixedClock, OffsetClock, ScopedClock, SteppingClock,
    SystemClock,
};
pub use ingest::{Ingestor, Outcome, PROFILE_URL, PROPERTIES_URL};
pub use log_store::{DayPages, LifeLog, LifeLogs, LogStore, PageWrite};
pub use shape::{Shape, ValidationError};
pub use storage::{BlobBackend, FileBackend, MemoryBackend};
pub use summary::{day_summaries, get_day_summary, pick_log, DEFAULT_WINDOW_DAYS};
pub use time::Timestamp;
pub use types::*;
