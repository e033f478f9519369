//! Compiles IR jobs into Gemini worklist (`.gwl`) records.
//!
//! Record layouts (semicolon-delimited, reserved fields left empty):
//!
//! | Record        | Line                                                    |
//! |---------------|---------------------------------------------------------|
//! | Aspirate      | `A;<labware>;;;<position>;;<volume:.2>;<liquidClass>;;;` |
//! | Dispense      | `D;<labware>;;;<position>;;<volume:.2>;<liquidClass>;;;` |
//! | Wash          | `W<scheme>;`                                            |
//! | Decontaminate | `WD;`                                                   |
//!
//! The compiler assumes the job already passed preflight. Anything it cannot
//! translate is a [`TranslationError`], never a soft validation result.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::ir::{AddressingError, Job, Operation, Step, Transfer, well_to_position};
use crate::preflight::{ErrorKind, RECORD_DELIMITER};

/// A job could not be turned into instrument records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    #[error("unknown operation '{op}' in step {step_id}")]
    UnknownOperation { step_id: String, op: String },

    #[error("missing argument '{argument}' for transfer in step {step_id}")]
    MissingArgument {
        step_id: String,
        argument: &'static str,
    },

    #[error("step {step_id}: {source}")]
    Addressing {
        step_id: String,
        #[source]
        source: AddressingError,
    },

    #[error("invalid value {value} for argument '{argument}' in step {step_id}")]
    MalformedArgument {
        step_id: String,
        argument: &'static str,
        value: String,
    },

    #[error("argument '{argument}' in step {step_id} contains the record delimiter: {value}")]
    Delimiter {
        step_id: String,
        argument: &'static str,
        value: String,
    },
}

impl TranslationError {
    /// The error kind used to look up a recovery action.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            TranslationError::MissingArgument { argument, .. }
            | TranslationError::MalformedArgument { argument, .. }
            | TranslationError::Delimiter { argument, .. } => ErrorKind::for_argument(argument),
            TranslationError::Addressing { .. } => ErrorKind::MotionError,
        }
    }
}

/// Direction of a pipetting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipette {
    Aspirate,
    Dispense,
}

/// One worklist record. `Display` renders the exact protocol line.
///
/// Fields are written unescaped, so `labware` and `liquid_class` must not
/// contain [`RECORD_DELIMITER`]; [`compile_records`] refuses such values.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Pipette {
        direction: Pipette,
        labware: String,
        position: u8,
        volume_ul: f64,
        liquid_class: String,
    },
    Wash { scheme: u32 },
    Decontaminate,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Pipette {
                direction,
                labware,
                position,
                volume_ul,
                liquid_class,
            } => {
                let code = match direction {
                    Pipette::Aspirate => 'A',
                    Pipette::Dispense => 'D',
                };
                // RackID, RackType, TubeID, TipType, TipMask, ForcedRackType stay empty.
                write!(
                    f,
                    "{code};{labware};;;{position};;{volume_ul:.2};{liquid_class};;;"
                )
            }
            Record::Wash { scheme } => write!(f, "W{scheme};"),
            Record::Decontaminate => write!(f, "WD;"),
        }
    }
}

/// The fields of a transfer once every required argument is known to be present.
pub(crate) struct ResolvedTransfer<'a> {
    pub source_labware: &'a str,
    pub source_position: u8,
    pub dest_labware: &'a str,
    pub dest_position: u8,
    pub volume_ul: f64,
}

/// Refuse a step whose wire arguments could not all be read.
pub(crate) fn ensure_readable(step: &Step) -> Result<(), TranslationError> {
    match step.malformed.first() {
        Some(bad) => Err(TranslationError::MalformedArgument {
            step_id: step.id.clone(),
            argument: bad.name,
            value: bad.value.to_string(),
        }),
        None => Ok(()),
    }
}

fn delimiter_free<'a>(
    step: &Step,
    argument: &'static str,
    value: &'a str,
) -> Result<&'a str, TranslationError> {
    if value.contains(RECORD_DELIMITER) {
        return Err(TranslationError::Delimiter {
            step_id: step.id.clone(),
            argument,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Resolve labware, wells and volume of a transfer, or report the first gap.
pub(crate) fn resolve_transfer<'a>(
    step: &Step,
    transfer: &'a Transfer,
) -> Result<ResolvedTransfer<'a>, TranslationError> {
    let missing = |argument| TranslationError::MissingArgument {
        step_id: step.id.clone(),
        argument,
    };
    let address = |well: &str| {
        well_to_position(well).map_err(|source| TranslationError::Addressing {
            step_id: step.id.clone(),
            source,
        })
    };

    let source_labware = transfer
        .source_labware
        .as_deref()
        .ok_or_else(|| missing("source_labware"))?;
    let source_well = transfer
        .source_well
        .as_deref()
        .ok_or_else(|| missing("source_well"))?;
    let dest_labware = transfer
        .dest_labware
        .as_deref()
        .ok_or_else(|| missing("dest_labware"))?;
    let dest_well = transfer
        .dest_well
        .as_deref()
        .ok_or_else(|| missing("dest_well"))?;
    let volume_ul = transfer.volume_ul.ok_or_else(|| missing("volume_uL"))?;

    Ok(ResolvedTransfer {
        source_labware,
        source_position: address(source_well)?,
        dest_labware,
        dest_position: address(dest_well)?,
        volume_ul,
    })
}

/// Compile `job` into typed records, in step order.
pub fn compile_records(job: &Job) -> Result<Vec<Record>, TranslationError> {
    let mut records = Vec::with_capacity(job.steps.len() * 2);

    for step in &job.steps {
        ensure_readable(step)?;
        match &step.operation {
            Operation::Transfer(transfer) => {
                let resolved = resolve_transfer(step, transfer)?;
                let source_labware =
                    delimiter_free(step, "source_labware", resolved.source_labware)?;
                let dest_labware = delimiter_free(step, "dest_labware", resolved.dest_labware)?;
                let liquid_class =
                    delimiter_free(step, "liquid_class", transfer.liquid_class())?.to_string();
                records.push(Record::Pipette {
                    direction: Pipette::Aspirate,
                    labware: source_labware.to_string(),
                    position: resolved.source_position,
                    volume_ul: resolved.volume_ul,
                    liquid_class: liquid_class.clone(),
                });
                records.push(Record::Pipette {
                    direction: Pipette::Dispense,
                    labware: dest_labware.to_string(),
                    position: resolved.dest_position,
                    volume_ul: resolved.volume_ul,
                    liquid_class,
                });
            }
            Operation::Wash { scheme } => records.push(Record::Wash { scheme: *scheme }),
            Operation::Decontaminate => records.push(Record::Decontaminate),
            Operation::Unknown { op, .. } => {
                return Err(TranslationError::UnknownOperation {
                    step_id: step.id.clone(),
                    op: op.clone(),
                });
            }
        }
    }

    Ok(records)
}

/// Compile `job` into worklist lines.
pub fn compile(job: &Job) -> Result<Vec<String>, TranslationError> {
    Ok(compile_records(job)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// Write worklist lines, one per line, as a `.gwl` file body.
pub fn write_worklist<W: Write>(lines: &[String], mut out: W) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
