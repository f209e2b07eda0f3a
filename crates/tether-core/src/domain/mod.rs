//! Domain model (IDs, job record, events, errors, agent input).
//!
//! Pure data + state transitions. No locks, no tasks, no channels.

pub mod errors;
pub mod events;
pub mod ids;
pub mod input;
pub mod job;
pub mod outcome;

pub use errors::{Cancelled, ErrorKind, JobError, TaskError, TransitionError};
pub use events::{EventKind, EventRecord};
pub use ids::{IdParseError, JobId};
pub use input::AgentJobInput;
pub use job::{JobRecord, JobSnapshot, JobStatus};
