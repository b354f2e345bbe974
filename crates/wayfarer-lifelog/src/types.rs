//! Core data types for log pages, snapshot variants, and day summaries.

use serde::{Deserialize, Serialize};

use crate::shape::ValidationError;
use crate::time::Timestamp;

/// A maximal span of time during which the logged value did not change.
///
/// Persisted as `{ "utc1": <iso>, "utc2": <iso>, "data": <json> }`. Both bounds
/// are inclusive and `start <= end` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage<T> {
    #[serde(rename = "utc1")]
    pub start: Timestamp,
    #[serde(rename = "utc2")]
    pub end: Timestamp,
    pub data: T,
}

impl<T> LogPage<T> {
    /// A fresh page covering a single instant.
    pub fn at(timestamp: Timestamp, data: T) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
            data,
        }
    }
}

/// A snapshot recorded in a life log.
///
/// The properties variant carries no `kind` field; the profile variant is
/// tagged with `kind: "profile"`. Both reject unknown fields, so a record with
/// any other tag fails to decode instead of reaching aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LifeLogData {
    Profile(ProfileLog),
    Properties(PropertiesLog),
}

/// Account properties snapshot (`/api/v1/vault/properties`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertiesLog {
    pub version: String,
    /// Rating such as `"great"` or `"good"`.
    pub performance: String,
    pub reward_progress: i64,
}

/// Review profile snapshot (`/api/v1/vault/profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileLog {
    pub kind: ProfileKind,
    pub version: String,
    pub performance: String,
    /// Candidates reviewed so far. Cumulative.
    pub finished: i64,
    /// Agreements where the candidate was accepted.
    pub accepted: i64,
    /// Agreements where the candidate was rejected.
    pub rejected: i64,
    /// Agreements where the candidate was marked duplicate.
    pub duplicated: i64,
    pub progress: i64,
    /// Upgrades available.
    pub available: i64,
    /// Upgrades applied.
    pub total: i64,
}

impl ProfileLog {
    /// Total agreements across accepted, rejected and duplicated.
    pub fn agreement(&self) -> i64 {
        self.accepted + self.rejected + self.duplicated
    }
}

/// Tag of the profile variant. Serialized as `"profile"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileKind {
    #[default]
    #[serde(rename = "profile")]
    Profile,
}

/// Daily change of the cumulative profile counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DaySummary {
    pub finished: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<i64>,
}

impl DaySummary {
    /// Summary used when either side of the delta has no history.
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Errors that can occur in the lifelog library.
#[derive(thiserror::Error, Debug)]
pub enum LifeLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed log blob: {0}")]
    MalformedBlob(serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Convenience result type.
pub type LifeLogResult<T> = Result<T, LifeLogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(finished: i64) -> ProfileLog {
        ProfileLog {
            kind: ProfileKind::Profile,
            version: "0".to_string(),
            performance: "good".to_string(),
            finished,
            accepted: 1,
            rejected: 2,
            duplicated: 3,
            progress: 0,
            available: 1,
            total: 2,
        }
    }

    #[test]
    fn test_properties_has_no_kind() {
        let data = LifeLogData::Properties(PropertiesLog {
            version: "0".to_string(),
            performance: "good".to_string(),
            reward_progress: 89,
        });
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({ "version": "0", "performance": "good", "rewardProgress": 89 })
        );
    }

    #[test]
    fn test_profile_tagged() {
        let value = serde_json::to_value(LifeLogData::Profile(profile(10))).unwrap();
        assert_eq!(value["kind"], "profile");
        assert_eq!(value["finished"], 10);

        let decoded: LifeLogData = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, LifeLogData::Profile(profile(10)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let value = json!({
            "kind": "settings",
            "version": "0",
            "performance": "good",
            "rewardProgress": 1
        });
        assert!(serde_json::from_value::<LifeLogData>(value).is_err());
    }

    #[test]
    fn test_agreement_sum() {
        assert_eq!(profile(0).agreement(), 6);
    }

    #[test]
    fn test_summary_omits_missing_agreement() {
        let value = serde_json::to_value(DaySummary::unchanged()).unwrap();
        assert_eq!(value, json!({ "finished": 0 }));
    }

    #[test]
    fn test_page_wire_names() {
        let page = LogPage::at(Timestamp::from_millis(1_000), 7);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(
            value,
            json!({
                "utc1": "1970-01-01T00:00:01.000Z",
                "utc2": "1970-01-01T00:00:01.000Z",
                "data": 7
            })
        );
    }
}
