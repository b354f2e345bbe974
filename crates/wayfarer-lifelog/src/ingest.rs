//! Turning intercepted account responses into log pages.
//!
//! Each response is parsed, validated against its [`Shape`], recorded under
//! the account's email, and followed by a chart refresh. A response rejected
//! before it is recorded leaves the store untouched. A failed chart refresh
//! after recording is logged and does not fail the response.

use chrono::TimeZone;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::chart::ChartSink;
use crate::clock;
use crate::log_store::{LogStore, PageWrite};
use crate::shape::Shape;
use crate::storage::BlobBackend;
use crate::summary::{day_summaries, DEFAULT_WINDOW_DAYS};
use crate::time::Timestamp;
use crate::types::{
    LifeLogData, LifeLogError, LifeLogResult, ProfileKind, ProfileLog, PropertiesLog,
};

pub const PROPERTIES_URL: &str = "/api/v1/vault/properties";
pub const PROFILE_URL: &str = "/api/v1/vault/profile";

#[derive(Debug, Deserialize)]
struct Response<T> {
    version: String,
    result: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertiesResult {
    performance: String,
    reward_progress: i64,
    social_profile: SocialProfile,
}

#[derive(Debug, Deserialize)]
struct SocialProfile {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResult {
    performance: String,
    finished: i64,
    accepted: i64,
    rejected: i64,
    duplicated: i64,
    progress: i64,
    available: i64,
    total: i64,
}

fn response_shape(result: Shape) -> Shape {
    Shape::record([("result", result), ("version", Shape::String)])
}

/// Expected structure of a properties response.
pub fn properties_shape() -> Shape {
    response_shape(Shape::record([
        ("performance", Shape::String),
        ("rewardProgress", Shape::Integer),
        ("socialProfile", Shape::record([("email", Shape::String)])),
    ]))
}

/// Expected structure of a profile response.
pub fn profile_shape() -> Shape {
    response_shape(Shape::record([
        ("performance", Shape::String),
        ("finished", Shape::Integer),
        ("accepted", Shape::Integer),
        ("rejected", Shape::Integer),
        ("duplicated", Shape::Integer),
        ("progress", Shape::Integer),
        ("available", Shape::Integer),
        ("total", Shape::Integer),
    ]))
}

/// Parse `json`, check it against `shape`, then decode it.
pub fn parse_response<R: DeserializeOwned>(shape: &Shape, json: &str) -> LifeLogResult<R> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        LifeLogError::InvalidPayload(format!("failed to parse response JSON ({e}): {json}"))
    })?;
    shape.validate(&value)?;
    serde_json::from_value(value).map_err(|e| LifeLogError::InvalidPayload(e.to_string()))
}

/// Result of handling one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Recorded { id: String, write: PageWrite },
    /// A profile arrived before any properties response named the account.
    NoIdentity,
    /// The URL is not one this ingestor listens to.
    Ignored,
}

/// Feeds responses into a log store and refreshes a chart.
pub struct Ingestor<B, C, Tz> {
    store: LogStore<LifeLogData, B>,
    chart: C,
    zone: Tz,
    window_days: u32,
    last_id: Option<String>,
}

impl<B, C, Tz> Ingestor<B, C, Tz>
where
    B: BlobBackend,
    C: ChartSink,
    Tz: TimeZone,
{
    pub fn new(store: LogStore<LifeLogData, B>, chart: C, zone: Tz) -> Self {
        Self {
            store,
            chart,
            zone,
            window_days: DEFAULT_WINDOW_DAYS,
            last_id: None,
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Attribute profile responses to `id` until a properties response
    /// names another account.
    pub fn with_identity(mut self, id: impl Into<String>) -> Self {
        self.last_id = Some(id.into());
        self
    }

    pub fn store(&self) -> &LogStore<LifeLogData, B> {
        &self.store
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    /// Email of the account named by the last properties response.
    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Handle one response, propagating any failure.
    pub fn handle(&mut self, url: &str, body: &str) -> LifeLogResult<Outcome> {
        match url {
            PROPERTIES_URL => self.on_properties(body),
            PROFILE_URL => self.on_profile(body),
            _ => Ok(Outcome::Ignored),
        }
    }

    /// Handle one response, logging and swallowing any failure so later
    /// responses are still ingested.
    pub fn dispatch(&mut self, url: &str, body: &str) -> Option<Outcome> {
        match self.handle(url, body) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Failed to ingest {url}: {e}");
                None
            }
        }
    }

    fn on_properties(&mut self, body: &str) -> LifeLogResult<Outcome> {
        let Response { version, result } =
            parse_response::<Response<PropertiesResult>>(&properties_shape(), body)?;

        let email = result.social_profile.email;
        self.last_id = Some(email.clone());
        self.record(
            email,
            LifeLogData::Properties(PropertiesLog {
                version,
                performance: result.performance,
                reward_progress: result.reward_progress,
            }),
        )
    }

    fn on_profile(&mut self, body: &str) -> LifeLogResult<Outcome> {
        let Some(id) = self.last_id.clone() else {
            tracing::debug!("Profile response before any properties response; skipped");
            return Ok(Outcome::NoIdentity);
        };

        let Response { version, result } =
            parse_response::<Response<ProfileResult>>(&profile_shape(), body)?;

        self.record(
            id,
            LifeLogData::Profile(ProfileLog {
                kind: ProfileKind::Profile,
                version,
                performance: result.performance,
                finished: result.finished,
                accepted: result.accepted,
                rejected: result.rejected,
                duplicated: result.duplicated,
                progress: result.progress,
                available: result.available,
                total: result.total,
            }),
        )
    }

    fn record(&mut self, id: String, data: LifeLogData) -> LifeLogResult<Outcome> {
        let now = clock::now();
        let write = self.store.append_page(&id, now, data)?;
        tracing::info!("Recorded snapshot for {id} ({write:?})");
        // The page is already saved; a failed refresh only costs the chart.
        if let Err(e) = self.update_chart(&id, now) {
            tracing::warn!("Failed to refresh chart for {id}: {e}");
        }
        Ok(Outcome::Recorded { id, write })
    }

    fn update_chart(&mut self, id: &str, now: Timestamp) -> LifeLogResult<()> {
        let summaries = day_summaries(&self.store, id, now, self.window_days, &self.zone)?;
        self.chart.set_data(now, &summaries);
        Ok(())
    }
}
