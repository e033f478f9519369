//! Error-kind → recovery-action table.
//!
//! The manager consults this table when a job fails. Every kind currently
//! resolves to [`RecoveryAction::Abort`] unless configuration overrides it;
//! actions are advisory and do not alter `run_next` control flow.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::preflight::ErrorKind;

/// What to do when an error of a given kind is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    Skip,
    Abort,
    RequireUser,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryAction::Retry => write!(f, "retry"),
            RecoveryAction::Skip => write!(f, "skip"),
            RecoveryAction::Abort => write!(f, "abort"),
            RecoveryAction::RequireUser => write!(f, "require_user"),
        }
    }
}

/// Built-in action for each kind. Adding an [`ErrorKind`] variant forces a
/// decision here.
fn default_action(kind: ErrorKind) -> RecoveryAction {
    match kind {
        ErrorKind::LabwareNotFound
        | ErrorKind::VolumeOutOfRange
        | ErrorKind::TipNotAvailable
        | ErrorKind::MotionError
        | ErrorKind::UnknownOperation
        | ErrorKind::PreconditionFailed => RecoveryAction::Abort,
    }
}

/// Recovery table with per-kind overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, RecoveryAction>",
    into = "BTreeMap<String, RecoveryAction>"
)]
pub struct RecoveryPolicy {
    overrides: BTreeMap<ErrorKind, RecoveryAction>,
}

impl TryFrom<BTreeMap<String, RecoveryAction>> for RecoveryPolicy {
    type Error = String;

    fn try_from(raw: BTreeMap<String, RecoveryAction>) -> Result<Self, Self::Error> {
        let mut policy = Self::default();
        for (name, action) in raw {
            policy.set(name.parse()?, action);
        }
        Ok(policy)
    }
}

impl From<RecoveryPolicy> for BTreeMap<String, RecoveryAction> {
    fn from(policy: RecoveryPolicy) -> Self {
        policy
            .overrides
            .into_iter()
            .map(|(kind, action)| (kind.as_str().to_string(), action))
            .collect()
    }
}

impl RecoveryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, kind: ErrorKind, action: RecoveryAction) -> Self {
        self.set(kind, action);
        self
    }

    pub fn set(&mut self, kind: ErrorKind, action: RecoveryAction) {
        self.overrides.insert(kind, action);
    }

    pub fn action_for(&self, kind: ErrorKind) -> RecoveryAction {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_action(kind))
    }

    /// The effective action for every kind, in declaration order.
    pub fn table(&self) -> Vec<(ErrorKind, RecoveryAction)> {
        ErrorKind::ALL
            .iter()
            .map(|&kind| (kind, self.action_for(kind)))
            .collect()
    }
}
