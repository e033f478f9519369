//! # labflow
//!
//! Turns instrument-agnostic liquid-handling jobs into Gemini worklist
//! records for Tecan Fluent / EVOware style instruments.
//!
//! The pipeline is: [`preflight::validate`] a [`Job`] against the deck,
//! [`compiler::compile`] it into worklist lines, and [`simulator::simulate`]
//! the volumetric effect as a dry run. [`JobManager`] sequences these steps
//! per job and tracks each job's [`JobStatus`].

pub mod compiler;
pub mod config;
pub mod deck;
pub mod error;
pub mod ir;
pub mod lifecycle;
pub mod logging;
pub mod policy;
pub mod preflight;
pub mod simulator;

pub use compiler::{Record, TranslationError, compile};
pub use deck::DeckState;
pub use error::{LabflowError, ValidationFailure};
pub use ir::{Job, Operation, Step, StepKind, Transfer};
pub use lifecycle::{AuditRecord, JobManager, JobStatus, RunOutput};
pub use policy::{RecoveryAction, RecoveryPolicy};
pub use preflight::{DEFAULT_MAX_VOLUME_UL, ErrorKind, ValidationError, validate};
pub use simulator::{VolumetricState, simulate};
