use std::fmt;

use thiserror::Error;

use crate::compiler::TranslationError;
use crate::preflight::ValidationError;
use crate::simulator::ShapeError;

#[derive(Debug, Error)]
pub enum LabflowError {
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("No jobs queued")]
    EmptyQueue,

    #[error("Job already submitted: {0}")]
    DuplicateJob(String),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Invalid volumetric state: {0}")]
    Shape(#[from] ShapeError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LabflowError>;

/// Every preflight violation that blocked a submission, in step order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub job_id: String,
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preflight check failed for job {}:", self.job_id)?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl LabflowError {
    /// The preflight violations, when this is a validation failure.
    pub fn violations(&self) -> Option<&[ValidationError]> {
        match self {
            LabflowError::Validation(failure) => Some(&failure.errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::ErrorKind;

    #[test]
    fn validation_failure_lists_every_violation() {
        let err = LabflowError::Validation(ValidationFailure {
            job_id: "job-1".into(),
            errors: vec![
                ValidationError {
                    step_id: "s1".into(),
                    kind: ErrorKind::LabwareNotFound,
                    message: "Source labware X1 missing".into(),
                },
                ValidationError {
                    step_id: "s2".into(),
                    kind: ErrorKind::UnknownOperation,
                    message: "Unknown op: mix".into(),
                },
            ],
        });
        assert_eq!(
            err.to_string(),
            "Preflight check failed for job job-1:\n  \
             s1: LabwareNotFound - Source labware X1 missing\n  \
             s2: UnknownOperation - Unknown op: mix"
        );
        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[test]
    fn empty_queue_display() {
        assert_eq!(LabflowError::EmptyQueue.to_string(), "No jobs queued");
        assert!(LabflowError::EmptyQueue.violations().is_none());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LabflowError>();
    }
}
