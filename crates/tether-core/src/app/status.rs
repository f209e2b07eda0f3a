//! Status - ステータス集計

use serde::{Deserialize, Serialize};

use crate::domain::JobStatus;

/// Number of registered jobs per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Queued => self.queued += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Succeeded => self.succeeded += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.succeeded + self.failed + self.cancelled
    }

    /// Jobs that have not reached a terminal status yet.
    pub fn active(&self) -> usize {
        self.queued + self.running
    }
}

impl FromIterator<JobStatus> for JobCounts {
    fn from_iter<I: IntoIterator<Item = JobStatus>>(iter: I) -> Self {
        let mut counts = JobCounts::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_status() {
        let counts: JobCounts = [
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Succeeded,
            JobStatus::Cancelled,
        ]
        .into_iter()
        .collect();

        assert_eq!(counts.running, 1);
        assert_eq!(counts.succeeded, 2);
        assert_eq!(counts.cancelled, 1);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.active(), 1);
    }
}
