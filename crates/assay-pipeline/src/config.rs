//! Pipeline tuning knobs.

use std::time::Duration;
use serde::Deserialize;

/// Retry, timeout, and stage-skipping policy for a pipeline instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retries per stage after the first attempt, applied only to errors
    /// classified transient or malformed-output.
    pub max_stage_retries: u32,
    /// Wall-clock budget per stage attempt.
    #[serde(with = "duration_secs")]
    pub stage_timeout: Duration,
    /// Skip the table-analysis pass entirely.
    pub skip_table_analysis: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_stage_retries: 2,
            stage_timeout: Duration::from_secs(20 * 60),
            skip_table_analysis: false,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
