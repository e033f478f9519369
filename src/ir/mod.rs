//! Intermediate representation: instrument-agnostic jobs made of typed steps.

mod job;
mod step;
pub mod well;

pub use job::{Job, SCHEMA_VERSION};
pub use step::{
    DEFAULT_LIQUID_CLASS, DEFAULT_WASH_SCHEME, MalformedArgument, Operation, Step, StepKind,
    Transfer,
};
pub use well::{AddressingError, WELL_COUNT, position_to_well, well_to_position};
