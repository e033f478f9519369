use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::state::{Event, JobStatus, StateMachine, Transition};
use crate::compiler;
use crate::deck::DeckState;
use crate::error::{LabflowError, Result, ValidationFailure};
use crate::ir::Job;
use crate::policy::{RecoveryAction, RecoveryPolicy};
use crate::preflight::{self, DEFAULT_MAX_VOLUME_UL, ErrorKind};
use crate::simulator::{self, VolumetricState};

/// What `run_next` produced for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub job_id: String,
    /// Worklist lines, in execution order.
    pub records: Vec<String>,
    /// Volumes after the dry run.
    pub state: VolumetricState,
}

/// Structured audit record produced when a job finishes running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub job_id: String,
    pub name: Option<String>,
    pub status: JobStatus,
    pub status_transitions: Vec<JobStatus>,
    pub step_count: usize,
    pub record_count: usize,
    pub error: Option<String>,
    pub recovery: Option<RecoveryAction>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Point-in-time view of the manager, for status endpoints and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub deck: DeckState,
    pub max_volume_ul: f64,
    pub queued_jobs: usize,
    pub statuses: BTreeMap<String, JobStatus>,
}

// Bookkeeping for one submitted job id.
#[derive(Debug, Clone)]
struct Tracked {
    status: JobStatus,
    history: Vec<JobStatus>,
    submitted_at: DateTime<Utc>,
}

/// Owns the FIFO queue and the status of every submitted job.
///
/// Execution is synchronous: `run_next` validates, compiles and simulates one
/// job before returning, so no locking is needed around the queue.
pub struct JobManager {
    deck: DeckState,
    max_volume_ul: f64,
    initial_volumes: Option<VolumetricState>,
    policy: RecoveryPolicy,
    queue: VecDeque<Job>,
    jobs: BTreeMap<String, Tracked>,
    audit: Vec<AuditRecord>,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new(DeckState::default())
    }
}

impl JobManager {
    /// Create a manager over `deck` with the default volume limit and policy.
    pub fn new(deck: DeckState) -> Self {
        Self {
            deck,
            max_volume_ul: DEFAULT_MAX_VOLUME_UL,
            initial_volumes: None,
            policy: RecoveryPolicy::default(),
            queue: VecDeque::new(),
            jobs: BTreeMap::new(),
            audit: Vec::new(),
        }
    }

    pub fn with_max_volume(mut self, max_volume_ul: f64) -> Self {
        self.max_volume_ul = max_volume_ul;
        self
    }

    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Volumes every dry run starts from. Defaults to empty plates.
    pub fn with_initial_volumes(mut self, volumes: VolumetricState) -> Self {
        self.initial_volumes = Some(volumes);
        self
    }

    pub fn deck(&self) -> &DeckState {
        &self.deck
    }

    pub fn max_volume_ul(&self) -> f64 {
        self.max_volume_ul
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Validate and enqueue `job`, returning its id.
    ///
    /// Rejected jobs leave no trace: the queue and status table are untouched.
    pub fn submit(&mut self, job: Job) -> Result<String> {
        let errors = preflight::validate(&job, &self.deck, self.max_volume_ul);
        if !errors.is_empty() {
            warn!(job_id = %job.job_id, violations = errors.len(), "submission rejected by preflight");
            return Err(LabflowError::Validation(ValidationFailure {
                job_id: job.job_id,
                errors,
            }));
        }
        if self.jobs.contains_key(&job.job_id) {
            return Err(LabflowError::DuplicateJob(job.job_id));
        }

        let job_id = job.job_id.clone();
        self.jobs.insert(
            job_id.clone(),
            Tracked {
                status: JobStatus::Pending,
                history: vec![JobStatus::Pending],
                submitted_at: Utc::now(),
            },
        );
        self.queue.push_back(job);
        info!(job_id = %job_id, queued = self.queue.len(), "job submitted");
        Ok(job_id)
    }

    /// Compile and dry-run the oldest queued job.
    ///
    /// Translation failures mark the job `error` and are returned to the caller;
    /// nothing is retried automatically.
    pub fn run_next(&mut self) -> Result<RunOutput> {
        let job = self.queue.pop_front().ok_or(LabflowError::EmptyQueue)?;
        let started_at = Utc::now();
        self.apply(&job.job_id, Event::Start);
        info!(job_id = %job.job_id, steps = job.steps.len(), "job running");

        let outcome = compiler::compile(&job).and_then(|records| {
            simulator::simulate(&job, self.initial_volumes.as_ref()).map(|state| (records, state))
        });

        match outcome {
            Ok((records, state)) => {
                self.apply(&job.job_id, Event::Complete);
                self.record_audit(&job, started_at, records.len(), None, None);
                info!(job_id = %job.job_id, records = records.len(), "job completed");
                Ok(RunOutput {
                    job_id: job.job_id,
                    records,
                    state,
                })
            }
            Err(err) => {
                self.apply(&job.job_id, Event::Fail);
                let action = self.policy.action_for(err.kind());
                warn!(job_id = %job.job_id, error = %err, %action, "job failed");
                self.record_audit(&job, started_at, 0, Some(err.to_string()), Some(action));
                Err(err.into())
            }
        }
    }

    /// Running → Paused. No-op for any other status or unknown id.
    pub fn pause(&mut self, job_id: &str) {
        self.apply(job_id, Event::Pause);
    }

    /// Paused → Running. No-op for any other status or unknown id.
    pub fn resume(&mut self, job_id: &str) {
        self.apply(job_id, Event::Resume);
    }

    /// Drop a job from the queue if it has not started, and mark it aborted.
    ///
    /// A job already running cannot be interrupted; the status change is
    /// bookkeeping only.
    pub fn abort(&mut self, job_id: &str) {
        let before = self.queue.len();
        self.queue.retain(|job| job.job_id != job_id);
        if self.queue.len() != before {
            debug!(job_id, "removed from queue");
        }
        self.apply(job_id, Event::Abort);
    }

    /// Current status, or `None` if `job_id` was never submitted.
    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|tracked| tracked.status)
    }

    /// Advisory recovery action for an error kind.
    pub fn recovery_action(&self, kind: ErrorKind) -> RecoveryAction {
        self.policy.action_for(kind)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Ids of queued jobs, head first.
    pub fn queued_ids(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(|job| job.job_id.as_str())
    }

    /// Audit records of every job that has run, oldest first.
    pub fn history(&self) -> &[AuditRecord] {
        &self.audit
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            deck: self.deck.clone(),
            max_volume_ul: self.max_volume_ul,
            queued_jobs: self.queue.len(),
            statuses: self
                .jobs
                .iter()
                .map(|(id, tracked)| (id.clone(), tracked.status))
                .collect(),
        }
    }

    fn apply(&mut self, job_id: &str, event: Event) {
        let Some(tracked) = self.jobs.get_mut(job_id) else {
            debug!(job_id, %event, "event for unknown job ignored");
            return;
        };
        match StateMachine::apply(tracked.status, event) {
            Transition::Moved { from, to } => {
                tracked.status = to;
                tracked.history.push(to);
                debug!(job_id, %event, %from, %to, "status changed");
            }
            Transition::Ignored(status) => {
                debug!(job_id, %event, %status, "event ignored");
            }
        }
    }

    fn record_audit(
        &mut self,
        job: &Job,
        started_at: DateTime<Utc>,
        record_count: usize,
        error: Option<String>,
        recovery: Option<RecoveryAction>,
    ) {
        let Some(tracked) = self.jobs.get(&job.job_id) else {
            return;
        };
        let completed_at = Utc::now();
        self.audit.push(AuditRecord {
            job_id: job.job_id.clone(),
            name: job.name.clone(),
            status: tracked.status,
            status_transitions: tracked.history.clone(),
            step_count: job.steps.len(),
            record_count,
            error,
            recovery,
            submitted_at: tracked.submitted_at,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        });
    }
}
