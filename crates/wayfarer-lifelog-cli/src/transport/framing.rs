//! Line framing for the watch stream.

use crate::types::{CliError, CliResult, InterceptedResponse};

/// Decode one line of the watch stream. Blank lines carry nothing.
pub fn parse_line(line: &str) -> CliResult<Option<InterceptedResponse>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let response: InterceptedResponse =
        serde_json::from_str(trimmed).map_err(|e| CliError::ParseError(e.to_string()))?;
    if response.url.is_empty() {
        return Err(CliError::ParseError("response has an empty url".to_string()));
    }
    Ok(Some(response))
}
