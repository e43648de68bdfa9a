//! Summary record of a completed simulation run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ModelId;
use crate::time::SimTime;

/// Result bundle returned by a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Fresh identifier for this particular run.
    pub profile_run_id: Uuid,
    /// Name of the run profile.
    pub profile_name: String,
    /// Clock value when the loop stopped.
    pub final_clock_time: SimTime,
    /// Number of events dispatched.
    pub executed_event_count: u64,
    /// Wall-clock time the run took.
    pub real_time_duration: Duration,
    /// Identity of the simulated model.
    pub model_id: ModelId,
    /// Name of the simulated model.
    pub model_name: String,
}

impl RunResult {
    /// Serializes to a JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Column header matching [`RunResult::to_csv_row`].
    pub fn csv_header() -> &'static str {
        "profile_run_id,profile_name,final_clock_time,executed_event_count,\
         real_time_duration_secs,model_id,model_name"
    }

    /// One CSV row; string fields are quoted when they need it.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.profile_run_id,
            csv_field(&self.profile_name),
            self.final_clock_time,
            self.executed_event_count,
            self.real_time_duration.as_secs_f64(),
            self.model_id,
            csv_field(&self.model_name),
        )
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
