//! Pluggable pre- and post-commit constraints and the built-ins.
//!
//! A constraint is a pure predicate over a commit and one or two snapshots,
//! returning the actions it rejects. Constraints must be side-effect free:
//! the commit engine may invoke them several times while it converges on
//! the final accepted set.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::action::{Action, ActionKind, Commit};
use crate::core::resources::Resources;
use crate::core::snapshot::Snapshot;

/// Name under which the built-in optimistic-locking pre-constraint is
/// installed.
pub const OPTIMISTIC_LOCKING: &str = "optimistic-locking";

/// Name under which the built-in overbooking post-constraint is installed.
pub const NO_RESOURCE_OVERBOOKING: &str = "no-resource-overbooking";

/// A pure predicate evaluated before appliers run.
pub trait PreConstraint: Send + Sync {
    /// Evaluate `commit` against the pre-apply snapshot; return the actions
    /// to reject.
    fn check(&self, commit: &Commit, pre: &Snapshot) -> Vec<Action>;
}

/// A pure predicate evaluated after appliers run.
pub trait PostConstraint: Send + Sync {
    /// Evaluate `commit` against the pre- and post-apply snapshots; return
    /// the actions to reject.
    fn check(&self, commit: &Commit, pre: &Snapshot, post: &Snapshot) -> Vec<Action>;
}

impl<F> PreConstraint for F
where
    F: Fn(&Commit, &Snapshot) -> Vec<Action> + Send + Sync,
{
    fn check(&self, commit: &Commit, pre: &Snapshot) -> Vec<Action> {
        self(commit, pre)
    }
}

impl<F> PostConstraint for F
where
    F: Fn(&Commit, &Snapshot, &Snapshot) -> Vec<Action> + Send + Sync,
{
    fn check(&self, commit: &Commit, pre: &Snapshot, post: &Snapshot) -> Vec<Action> {
        self(commit, pre, post)
    }
}

/// Named pre/post constraint mappings; evaluation order is irrelevant.
#[derive(Clone, Default)]
pub(crate) struct ConstraintRegistry {
    pub(crate) pre: HashMap<String, Arc<dyn PreConstraint>>,
    pub(crate) post: HashMap<String, Arc<dyn PostConstraint>>,
}

impl ConstraintRegistry {
    /// Registry with the two built-ins installed.
    pub(crate) fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry
            .pre
            .insert(OPTIMISTIC_LOCKING.into(), Arc::new(OptimisticLocking));
        registry.post.insert(
            NO_RESOURCE_OVERBOOKING.into(),
            Arc::new(NoResourceOverbooking),
        );
        registry
    }
}

/// Built-in pre-constraint comparing version probes to the pre-snapshot.
///
/// An action carrying no probe is ignored. A probe naming an executor or
/// task absent from the snapshot compares unequal and rejects the action.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimisticLocking;

impl PreConstraint for OptimisticLocking {
    fn check(&self, commit: &Commit, pre: &Snapshot) -> Vec<Action> {
        commit
            .actions
            .iter()
            .filter(|action| is_stale(action, pre))
            .cloned()
            .collect()
    }
}

fn is_stale(action: &Action, pre: &Snapshot) -> bool {
    let executor = action
        .executor_id
        .as_ref()
        .and_then(|id| pre.executors.get(id));
    if let Some(expected) = action.executor_metadata_version {
        if executor.map(|e| e.metadata_version) != Some(expected) {
            return true;
        }
    }
    if let Some(expected) = action.executor_task_ids_version {
        if executor.map(|e| e.task_ids_version) != Some(expected) {
            return true;
        }
    }
    if let Some(expected) = action.metadata_version {
        if pre.tasks.get(&action.id).map(|t| t.metadata_version) != Some(expected) {
            return true;
        }
    }
    false
}

/// Built-in post-constraint forbidding resource overbooking.
///
/// Walks the commit's create actions in submission order, accumulating
/// reservations on top of each executor's pre-existing load, and rejects
/// every create that would push any dimension past capacity. A rejected
/// create does not advance the running total, so once a dimension is
/// saturated the later creates needing it are rejected too.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResourceOverbooking;

impl PostConstraint for NoResourceOverbooking {
    fn check(&self, commit: &Commit, pre: &Snapshot, _post: &Snapshot) -> Vec<Action> {
        let mut running: HashMap<&str, Resources> = HashMap::new();
        let mut rejected = Vec::new();
        for action in &commit.actions {
            if action.kind != ActionKind::Create {
                continue;
            }
            let Some(executor_id) = action.executor_id.as_deref() else {
                continue;
            };
            let Some(executor) = pre.executors.get(executor_id) else {
                continue;
            };
            let reservation = action.resources.clone().unwrap_or_default();
            let base = running
                .entry(executor_id)
                .or_insert_with(|| pre.reserved_resources(executor_id));
            let tentative = base.plus(&reservation);
            if tentative.fits_within(&executor.resources) {
                *base = tentative;
            } else {
                rejected.push(action.clone());
            }
        }
        rejected
    }
}
