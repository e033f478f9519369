//! Preflight validation of IR jobs against the deck.
//!
//! [`validate`] walks every step and collects all violations instead of
//! stopping at the first one, so a planner can fix a job in a single pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deck::DeckState;
use crate::ir::{Job, Operation, Step, Transfer};

/// Per-aspirate/dispense volume ceiling used when no limit is configured.
pub const DEFAULT_MAX_VOLUME_UL: f64 = 1000.0;

/// Field separator of worklist records; may not appear inside a field.
pub const RECORD_DELIMITER: char = ';';

/// Taxonomy of preflight failures surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LabwareNotFound,
    VolumeOutOfRange,
    TipNotAvailable,
    MotionError,
    UnknownOperation,
    PreconditionFailed,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::LabwareNotFound,
        ErrorKind::VolumeOutOfRange,
        ErrorKind::TipNotAvailable,
        ErrorKind::MotionError,
        ErrorKind::UnknownOperation,
        ErrorKind::PreconditionFailed,
    ];

    /// Configuration name of the kind, e.g. `labware_not_found`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::LabwareNotFound => "labware_not_found",
            ErrorKind::VolumeOutOfRange => "volume_out_of_range",
            ErrorKind::TipNotAvailable => "tip_not_available",
            ErrorKind::MotionError => "motion_error",
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::PreconditionFailed => "precondition_failed",
        }
    }

    /// The kind reported for a bad or missing step argument.
    pub fn for_argument(argument: &str) -> Self {
        match argument {
            "volume_uL" => ErrorKind::VolumeOutOfRange,
            "source_labware" | "dest_labware" => ErrorKind::LabwareNotFound,
            _ => ErrorKind::MotionError,
        }
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown error kind '{s}'"))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LabwareNotFound => write!(f, "LabwareNotFound"),
            ErrorKind::VolumeOutOfRange => write!(f, "VolumeOutOfRange"),
            ErrorKind::TipNotAvailable => write!(f, "TipNotAvailable"),
            ErrorKind::MotionError => write!(f, "MotionError"),
            ErrorKind::UnknownOperation => write!(f, "UnknownOperation"),
            ErrorKind::PreconditionFailed => write!(f, "PreconditionFailed"),
        }
    }
}

/// A single preflight violation attributed to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub step_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(step: &Step, kind: ErrorKind, message: String) -> Self {
        Self {
            step_id: step.id.clone(),
            kind,
            message,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.step_id, self.kind, self.message)
    }
}

/// Validate `job` against `deck`. An empty result means the job may be submitted.
pub fn validate(job: &Job, deck: &DeckState, max_volume_ul: f64) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for step in &job.steps {
        for bad in &step.malformed {
            errors.push(ValidationError::new(
                step,
                ErrorKind::for_argument(bad.name),
                format!("Argument {} has invalid value {}", bad.name, bad.value),
            ));
        }

        match &step.operation {
            Operation::Unknown { op, .. } => errors.push(ValidationError::new(
                step,
                ErrorKind::UnknownOperation,
                format!("Unknown op: {op}"),
            )),
            Operation::Transfer(transfer) => {
                check_transfer(step, transfer, deck, max_volume_ul, &mut errors)
            }
            // No mandatory arguments yet.
            Operation::Wash { .. } | Operation::Decontaminate => {}
        }
    }

    debug!(job_id = %job.job_id, violations = errors.len(), "preflight finished");
    errors
}

fn check_transfer(
    step: &Step,
    transfer: &Transfer,
    deck: &DeckState,
    max_volume_ul: f64,
    errors: &mut Vec<ValidationError>,
) {
    let sides = [
        ("Source", "source_labware", &transfer.source_labware),
        ("Destination", "dest_labware", &transfer.dest_labware),
    ];
    for (side, argument, labware) in sides {
        if step.is_malformed(argument) {
            continue;
        }
        match labware.as_deref() {
            Some(label) if deck.contains(label) => {
                if label.contains(RECORD_DELIMITER) {
                    errors.push(ValidationError::new(
                        step,
                        ErrorKind::LabwareNotFound,
                        format!("{side} labware {label} contains '{RECORD_DELIMITER}'"),
                    ));
                }
            }
            _ => errors.push(ValidationError::new(
                step,
                ErrorKind::LabwareNotFound,
                format!("{side} labware {} missing", labware.as_deref().unwrap_or("<none>")),
            )),
        }
    }

    if let Some(class) = &transfer.liquid_class
        && class.contains(RECORD_DELIMITER)
    {
        errors.push(ValidationError::new(
            step,
            ErrorKind::for_argument("liquid_class"),
            format!("Liquid class {class} contains '{RECORD_DELIMITER}'"),
        ));
    }

    if step.is_malformed("volume_uL") {
        return;
    }
    let in_range = transfer
        .volume_ul
        .is_some_and(|v| v.is_finite() && v > 0.0 && v <= max_volume_ul);
    if !in_range {
        let message = match transfer.volume_ul {
            Some(v) => format!("Volume {v}µL invalid (allowed: >0 and <= {max_volume_ul}µL)"),
            None => "Volume missing".to_string(),
        };
        errors.push(ValidationError::new(
            step,
            ErrorKind::VolumeOutOfRange,
            message,
        ));
    }
}
