//! One intercepted response as it arrives on the watch stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A response captured from the account site.
///
/// `body` may be the raw response text or an already-decoded JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptedResponse {
    pub url: String,
    pub body: Value,
}

impl InterceptedResponse {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: Value::String(body.into()),
        }
    }

    /// Response text as the ingestor expects it.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_text_from_string() {
        let response = InterceptedResponse::new("/x", "{\"a\":1}");
        assert_eq!(response.body_text(), "{\"a\":1}");
    }

    #[test]
    fn test_body_text_from_object() {
        let response: InterceptedResponse =
            serde_json::from_value(json!({ "url": "/x", "body": { "a": 1 } })).unwrap();
        assert_eq!(response.body_text(), "{\"a\":1}");
    }
}
