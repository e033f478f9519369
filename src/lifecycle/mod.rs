mod manager;
mod state;

pub use manager::{AuditRecord, JobManager, ManagerSnapshot, RunOutput};
pub use state::{Event, JobStatus, StateMachine, Transition};
