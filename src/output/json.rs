use crate::domain::UserSummary;
use crate::error::Result;

/// Pretty-printed JSON list of per-user summaries.
pub fn format_json(summaries: &[UserSummary]) -> Result<String> {
    Ok(serde_json::to_string_pretty(summaries)?)
}
