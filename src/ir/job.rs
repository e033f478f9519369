use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::step::Step;

/// Current IR schema version.
pub const SCHEMA_VERSION: &str = "1.0";

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

/// An ordered sequence of steps plus job-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "new_job_id")]
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Advisory constraints (e.g. `require_homed`). Never enforced by the compiler.
    #[serde(default)]
    pub constraints: Map<String, Value>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            version: default_version(),
            job_id: job_id.into(),
            name: None,
            steps,
            constraints: Map::new(),
        }
    }

    /// A job with a freshly generated id.
    pub fn anonymous(steps: Vec<Step>) -> Self {
        Self::new(new_job_id(), steps)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Human-friendly label: the name when present, otherwise the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Transfer;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_metadata() {
        let job: Job = serde_json::from_value(json!({"steps": []})).unwrap();
        assert_eq!(job.version, SCHEMA_VERSION);
        assert!(Uuid::parse_str(&job.job_id).is_ok());
        assert!(job.name.is_none());
        assert!(job.constraints.is_empty());
    }

    #[test]
    fn parses_full_job() {
        let job: Job = serde_json::from_value(json!({
            "version": "1.0",
            "job_id": "job-test",
            "name": "Test transfer",
            "steps": [
                {"id": "s1", "op": "transfer", "args": {
                    "source_labware": "S1", "source_well": "A1",
                    "dest_labware": "D1", "dest_well": "B1", "volume_uL": 20.0
                }},
                {"id": "s2", "op": "decontaminate"}
            ],
            "constraints": {"require_homed": true}
        }))
        .unwrap();

        assert_eq!(job.job_id, "job-test");
        assert_eq!(job.label(), "Test transfer");
        assert_eq!(job.steps.len(), 2);
        assert_eq!(job.constraints["require_homed"], true);
    }

    #[test]
    fn serialization_roundtrip() {
        let job = Job::new(
            "job-1",
            vec![Step::transfer("s1", Transfer::new("S1", "A1", "D1", "B1", 5.0))],
        )
        .with_name("one")
        .with_constraint("require_homed", true);
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn label_falls_back_to_id() {
        let job = Job::new("job-7", Vec::new());
        assert_eq!(job.label(), "job-7");
    }
}
