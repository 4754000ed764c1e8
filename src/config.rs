use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs for a dataset load. Owned by the caller and passed into
/// [`crate::dataset::Dataset::load`]; the engine keeps no global settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on memoized date tokens per load.
    pub token_cache_capacity: usize,
    /// Work types treated as border-critical when the category alone does not
    /// say so. Matched case-insensitively against the whole work type.
    pub legacy_priority_work_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_cache_capacity: 4096,
            legacy_priority_work_types: vec!["BOP".into(), "BORDER_FENCE".into(), "ROAD".into()],
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn is_legacy_priority_type(&self, work_type: &str) -> bool {
        let work_type = work_type.trim();
        self.legacy_priority_work_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(work_type))
    }
}
