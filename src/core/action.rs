//! Commit actions and the commit record schedulers submit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::resources::Resources;
use crate::util::serde::{ExecutorId, Metadata, SchedulerId, TaskId};

/// The three kinds of mutation a commit can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a new task on an executor.
    Create,
    /// Merge metadata into an existing task.
    Update,
    /// Ask for an existing task to die.
    Kill,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Kill => write!(f, "kill"),
        }
    }
}

/// One intended mutation inside a commit.
///
/// Only `create` actions carry an executor id and a reservation; the three
/// optional version fields are optimistic-locking probes compared against
/// the pre-commit snapshot by the built-in `optimistic-locking` constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Target task id.
    pub id: TaskId,
    /// Mutation kind.
    pub kind: ActionKind,
    /// Target executor (create actions only).
    pub executor_id: Option<ExecutorId>,
    /// Resource reservation (create actions only).
    pub resources: Option<Resources>,
    /// Metadata to attach (create) or merge (update).
    pub metadata: Option<Metadata>,
    /// Probe against the executor's metadata version.
    pub executor_metadata_version: Option<u64>,
    /// Probe against the executor's task-id-set version.
    pub executor_task_ids_version: Option<u64>,
    /// Probe against the task's metadata version.
    pub metadata_version: Option<u64>,
}

impl Action {
    fn new(id: impl Into<TaskId>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            executor_id: None,
            resources: None,
            metadata: None,
            executor_metadata_version: None,
            executor_task_ids_version: None,
            metadata_version: None,
        }
    }

    /// A `create` action reserving `resources` on `executor_id`.
    #[must_use]
    pub fn create(
        id: impl Into<TaskId>,
        executor_id: impl Into<ExecutorId>,
        resources: Resources,
    ) -> Self {
        let mut action = Self::new(id, ActionKind::Create);
        action.executor_id = Some(executor_id.into());
        action.resources = Some(resources);
        action
    }

    /// An `update` action against an existing task.
    #[must_use]
    pub fn update(id: impl Into<TaskId>) -> Self {
        Self::new(id, ActionKind::Update)
    }

    /// A `kill` action against an existing task.
    #[must_use]
    pub fn kill(id: impl Into<TaskId>) -> Self {
        Self::new(id, ActionKind::Kill)
    }

    /// Attach a metadata bag.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Probe the executor's metadata version.
    #[must_use]
    pub fn with_executor_metadata_version(mut self, version: u64) -> Self {
        self.executor_metadata_version = Some(version);
        self
    }

    /// Probe the executor's task-id-set version.
    #[must_use]
    pub fn with_executor_task_ids_version(mut self, version: u64) -> Self {
        self.executor_task_ids_version = Some(version);
        self
    }

    /// Probe the task's metadata version.
    #[must_use]
    pub fn with_metadata_version(mut self, version: u64) -> Self {
        self.metadata_version = Some(version);
        self
    }

    /// Identity used for rejection bookkeeping.
    pub(crate) fn key(&self) -> ActionKey {
        ActionKey {
            id: self.id.clone(),
            kind: self.kind,
        }
    }
}

/// Compound identity of an action within one commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ActionKey {
    pub(crate) id: TaskId,
    pub(crate) kind: ActionKind,
}

/// The atomic unit of change a scheduler submits: an ordered batch of
/// actions plus the partial-accept policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// The submitting scheduler.
    pub scheduler_id: SchedulerId,
    /// Ordered actions; appliers run in this order.
    pub actions: Vec<Action>,
    /// Accept the non-rejected actions instead of failing the whole commit.
    pub allow_partial_commit: bool,
}

impl Commit {
    /// Empty commit for `scheduler_id` with partial accept disabled.
    #[must_use]
    pub fn new(scheduler_id: impl Into<SchedulerId>) -> Self {
        Self {
            scheduler_id: scheduler_id.into(),
            actions: Vec::new(),
            allow_partial_commit: false,
        }
    }

    /// Append one action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions in order.
    #[must_use]
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Set the partial-accept policy.
    #[must_use]
    pub fn with_allow_partial_commit(mut self, allow: bool) -> Self {
        self.allow_partial_commit = allow;
        self
    }
}
