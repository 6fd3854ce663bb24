//! Executor and task records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::resources::Resources;
use crate::util::serde::{ExecutorId, Metadata, SchedulerId, TaskId};

/// Registration status of an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorStatus {
    /// The executor currently provides capacity.
    Registered,
    /// The executor has withdrawn; the record is retained.
    Unregistered,
}

/// Lifecycle phase a task has been declared to be in.
///
/// The declaration order is the phase order: a phase only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// The scheduler has asked for the task to exist.
    Create,
    /// The executor is bringing the task up.
    Creating,
    /// The task is up.
    Created,
    /// The scheduler has asked for the task to die.
    Kill,
    /// The executor is tearing the task down.
    Killing,
}

/// A registered capacity provider owning a set of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executor {
    /// Unique executor identifier.
    pub id: ExecutorId,
    /// Registration status.
    pub status: ExecutorStatus,
    /// Declared capacity.
    pub resources: Resources,
    /// Free-form metadata bag.
    pub metadata: Metadata,
    /// Incremented by one on every metadata mutation.
    pub metadata_version: u64,
    /// Ids of the tasks currently assigned to this executor.
    pub task_ids: BTreeSet<TaskId>,
    /// Incremented by one on every `task_ids` mutation.
    pub task_ids_version: u64,
}

/// A resource reservation against exactly one executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// The executor this task reserves resources on.
    pub executor_id: ExecutorId,
    /// The scheduler that created the task.
    pub scheduler_id: SchedulerId,
    /// Declared lifecycle phase; never regresses.
    pub lifecycle_phase: LifecyclePhase,
    /// Reserved sub-bundle of the executor's capacity.
    pub resources: Resources,
    /// Free-form metadata bag.
    pub metadata: Metadata,
    /// Incremented by one on every metadata mutation.
    pub metadata_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_phase_ordering() {
        assert!(LifecyclePhase::Create < LifecyclePhase::Creating);
        assert!(LifecyclePhase::Creating < LifecyclePhase::Created);
        assert!(LifecyclePhase::Created < LifecyclePhase::Kill);
        assert!(LifecyclePhase::Kill < LifecyclePhase::Killing);
    }

    #[test]
    fn test_lifecycle_phase_serde_names() {
        let phase: LifecyclePhase = serde_json::from_str("\"creating\"").unwrap();
        assert_eq!(phase, LifecyclePhase::Creating);
        assert_eq!(
            serde_json::to_string(&LifecyclePhase::Kill).unwrap(),
            "\"kill\""
        );
    }
}
