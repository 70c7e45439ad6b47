//! Per-registration lifecycle tag, ported from `executor.py`'s
//! `TaskStatus` / `ExecutorStatus` (§3). Serializable so an (excluded)
//! HTTP layer can render [`StatusSnapshot`] as JSON directly.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatusKind {
    Registering,
    FailedToRegister,
    Listening,
    Executing,
    Finished,
    Unregistering,
    Unregistered,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal status transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: TaskStatusKind,
    pub to: TaskStatusKind,
}

/// One registration's status-table row (§3 "TaskStatus per registration").
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub status: TaskStatusKind,
    pub finished_task: u64,
    pub successful_task: u64,
    pub progress: f64,
    pub failed_tasks: HashMap<u64, String>,
    pub info: String,
}

impl TaskStatus {
    pub fn registering() -> Self {
        Self {
            status: TaskStatusKind::Registering,
            finished_task: 0,
            successful_task: 0,
            progress: 0.0,
            failed_tasks: HashMap::new(),
            info: String::new(),
        }
    }

    /// Enforces the two guardrails `executor.py::update_worker_status`
    /// asserts before mutating status: `EXECUTING` requires the prior
    /// status to already be `LISTENING` or `EXECUTING`; `REGISTERING` is
    /// refused unless the prior status is `UNREGISTERED` (a brand-new
    /// registration never calls this — it constructs a fresh `TaskStatus`
    /// via [`TaskStatus::registering`] instead).
    pub fn apply_transition(&mut self, new_status: TaskStatusKind) -> Result<(), TransitionError> {
        let allowed = match new_status {
            TaskStatusKind::Executing => {
                matches!(self.status, TaskStatusKind::Listening | TaskStatusKind::Executing)
            }
            TaskStatusKind::Registering => matches!(self.status, TaskStatusKind::Unregistered),
            _ => true,
        };
        if !allowed {
            return Err(TransitionError {
                from: self.status,
                to: new_status,
            });
        }
        self.status = new_status;
        Ok(())
    }
}

/// Read-only projection returned by [`super::Orchestrator::get_all_task_status`]
/// (§4.7 `StatusView`).
pub type StatusSnapshot = HashMap<String, TaskStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executing_requires_listening_or_executing_prior_status() {
        let mut status = TaskStatus::registering();
        assert_eq!(
            status.apply_transition(TaskStatusKind::Executing),
            Err(TransitionError {
                from: TaskStatusKind::Registering,
                to: TaskStatusKind::Executing
            })
        );
        status.apply_transition(TaskStatusKind::Listening).unwrap();
        assert!(status.apply_transition(TaskStatusKind::Executing).is_ok());
        assert!(status.apply_transition(TaskStatusKind::Executing).is_ok());
    }

    #[test]
    fn registering_requires_unregistered_prior_status() {
        let mut status = TaskStatus::registering();
        status.status = TaskStatusKind::Finished;
        assert!(status.apply_transition(TaskStatusKind::Registering).is_err());
        status.status = TaskStatusKind::Unregistered;
        assert!(status.apply_transition(TaskStatusKind::Registering).is_ok());
    }

    #[test]
    fn progress_invariant_holds_when_execution_count_positive() {
        let mut status = TaskStatus::registering();
        status.apply_transition(TaskStatusKind::Listening).unwrap();
        status.apply_transition(TaskStatusKind::Executing).unwrap();
        let completed = 3u64;
        let execution_count = 5u64;
        status.progress = completed as f64 / execution_count as f64;
        assert!(completed <= execution_count);
        assert_eq!(status.progress, 0.6);
    }
}
