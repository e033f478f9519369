use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a submitted job.
///
/// Jobs flow: PENDING → RUNNING → COMPLETED | ERROR, with PAUSED as a detour
/// from RUNNING and ABORTED reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Aborted,
    Error,
}

impl JobStatus {
    /// No further transitions except a bookkeeping abort.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Aborted | JobStatus::Error
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Aborted => write!(f, "aborted"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Something that happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Pause,
    Resume,
    Complete,
    Fail,
    Abort,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Start => write!(f, "START"),
            Event::Pause => write!(f, "PAUSE"),
            Event::Resume => write!(f, "RESUME"),
            Event::Complete => write!(f, "COMPLETE"),
            Event::Fail => write!(f, "FAIL"),
            Event::Abort => write!(f, "ABORT"),
        }
    }
}

/// The result of evaluating an event against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the given status.
    Moved { from: JobStatus, to: JobStatus },
    /// The event does not apply in the current status; nothing changes.
    Ignored(JobStatus),
}

impl Transition {
    /// Status after the transition.
    pub fn status(self) -> JobStatus {
        match self {
            Transition::Moved { to, .. } => to,
            Transition::Ignored(status) => status,
        }
    }
}

/// Status transition table.
pub struct StateMachine;

impl StateMachine {
    /// Compute the transition for `event` from `status`.
    ///
    /// - `Start`: Pending → Running.
    /// - `Pause` / `Resume`: Running ⇄ Paused.
    /// - `Complete` / `Fail`: Running → Completed / Error.
    /// - `Abort`: any status other than Aborted → Aborted.
    ///
    /// Every other combination is ignored.
    pub fn apply(status: JobStatus, event: Event) -> Transition {
        let to = match (status, event) {
            (JobStatus::Pending, Event::Start) => JobStatus::Running,
            (JobStatus::Running, Event::Pause) => JobStatus::Paused,
            (JobStatus::Paused, Event::Resume) => JobStatus::Running,
            (JobStatus::Running, Event::Complete) => JobStatus::Completed,
            (JobStatus::Running, Event::Fail) => JobStatus::Error,
            (JobStatus::Aborted, Event::Abort) => return Transition::Ignored(status),
            (_, Event::Abort) => JobStatus::Aborted,
            _ => return Transition::Ignored(status),
        };
        Transition::Moved { from: status, to }
    }
}
