//! Point-in-time views of the pool.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::model::{Executor, Task};
use crate::core::resources::Resources;
use crate::util::serde::{ExecutorId, TaskId};

/// An immutable view of `{executors, tasks}` at an instant.
///
/// Snapshots own their data: later pool mutations never alter a snapshot
/// already handed out. The constraint registry is deliberately excluded so
/// scheduler code cannot depend on constraint identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Executors by id.
    pub executors: HashMap<ExecutorId, Executor>,
    /// Tasks by id.
    pub tasks: HashMap<TaskId, Task>,
}

impl Snapshot {
    /// Componentwise sum of the reservations currently assigned to
    /// `executor_id`.
    #[must_use]
    pub fn reserved_resources(&self, executor_id: &str) -> Resources {
        self.tasks
            .values()
            .filter(|task| task.executor_id == executor_id)
            .fold(Resources::new(), |acc, task| acc.plus(&task.resources))
    }
}
