//! Dry-run simulation of volumetric effects.
//!
//! Tracks liquid per well and applies transfers in step order. No capacity,
//! dead volume or physical dynamics are modelled; wells may go negative, which
//! tests use as a signal that a job draws from an empty well.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::{TranslationError, ensure_readable, resolve_transfer};
use crate::ir::{Job, Operation, WELL_COUNT, well_to_position};

/// Caller-supplied volumes did not describe a 96-well plate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("labware {labware} has {len} volumes, expected 96")]
pub struct ShapeError {
    pub labware: String,
    pub len: usize,
}

/// Volume (µL) per well for each labware. Index `p - 1` holds position `p`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<f64>>", into = "BTreeMap<String, Vec<f64>>")]
pub struct VolumetricState {
    plates: BTreeMap<String, [f64; WELL_COUNT]>,
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for VolumetricState {
    type Error = ShapeError;

    fn try_from(map: BTreeMap<String, Vec<f64>>) -> Result<Self, Self::Error> {
        let mut state = Self::default();
        for (labware, volumes) in map {
            state.set(labware, &volumes)?;
        }
        Ok(state)
    }
}

impl From<VolumetricState> for BTreeMap<String, Vec<f64>> {
    fn from(state: VolumetricState) -> Self {
        state
            .plates
            .into_iter()
            .map(|(labware, volumes)| (labware, volumes.to_vec()))
            .collect()
    }
}

impl VolumetricState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the volumes of `labware`. `volumes` must hold exactly 96 entries.
    pub fn set(&mut self, labware: impl Into<String>, volumes: &[f64]) -> Result<(), ShapeError> {
        let labware = labware.into();
        let plate: [f64; WELL_COUNT] = volumes.try_into().map_err(|_| ShapeError {
            labware: labware.clone(),
            len: volumes.len(),
        })?;
        self.plates.insert(labware, plate);
        Ok(())
    }

    /// Volumes of `labware`, indexed by position − 1.
    pub fn volumes(&self, labware: &str) -> Option<&[f64]> {
        self.plates.get(labware).map(|plate| plate.as_slice())
    }

    /// Volume in a well addressed by id (e.g. `"B1"`).
    pub fn get(&self, labware: &str, well: &str) -> Option<f64> {
        let position = well_to_position(well).ok()?;
        self.plates
            .get(labware)
            .map(|plate| plate[usize::from(position - 1)])
    }

    /// Net volume across all wells of `labware`.
    pub fn total(&self, labware: &str) -> Option<f64> {
        self.plates.get(labware).map(|plate| plate.iter().sum())
    }

    pub fn labware(&self) -> impl Iterator<Item = &str> {
        self.plates.keys().map(String::as_str)
    }

    pub fn contains(&self, labware: &str) -> bool {
        self.plates.contains_key(labware)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    fn plate_mut(&mut self, labware: &str) -> &mut [f64; WELL_COUNT] {
        self.plates
            .entry(labware.to_string())
            .or_insert([0.0; WELL_COUNT])
    }
}

/// Simulate `job` starting from `initial` (all wells empty when `None`).
///
/// The input state is never modified. Unknown operations and untranslatable
/// transfers are contract failures: preflight should have rejected them.
pub fn simulate(
    job: &Job,
    initial: Option<&VolumetricState>,
) -> Result<VolumetricState, TranslationError> {
    let mut state = initial.cloned().unwrap_or_default();

    for step in &job.steps {
        ensure_readable(step)?;
        match &step.operation {
            Operation::Transfer(transfer) => {
                let resolved = resolve_transfer(step, transfer)?;
                state.plate_mut(resolved.source_labware)
                    [usize::from(resolved.source_position - 1)] -= resolved.volume_ul;
                state.plate_mut(resolved.dest_labware)[usize::from(resolved.dest_position - 1)] +=
                    resolved.volume_ul;
            }
            // Reserved for tip-state modelling.
            Operation::Wash { .. } | Operation::Decontaminate => {}
            Operation::Unknown { op, .. } => {
                return Err(TranslationError::UnknownOperation {
                    step_id: step.id.clone(),
                    op: op.clone(),
                });
            }
        }
    }

    Ok(state)
}
