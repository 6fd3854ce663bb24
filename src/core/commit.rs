//! The transactional commit pipeline.
//!
//! A commit moves through three phases inside one serialised transaction:
//! syntactic validation against the pre-snapshot, a pre-constraint pass,
//! and application followed by a post-constraint pass. Rejection
//! arbitration decides between aborting the whole commit and accepting the
//! surviving subset; an abort rolls the transaction back entirely.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::action::{Action, ActionKey, ActionKind, Commit};
use crate::core::apply::apply_action;
use crate::core::error::PoolError;
use crate::core::pool::{Pool, PoolState};
use crate::core::snapshot::Snapshot;

/// Per-commit options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Skip both constraint phases (replay mode). Syntactic validation
    /// still runs.
    pub force: bool,
}

impl CommitOptions {
    /// Default options: constraints enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set force mode.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Outcome of a commit: the accepted/rejected partition plus the snapshots
/// the decision was made against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Actions that took effect, in commit-submission order.
    pub accepted_actions: Vec<Action>,
    /// Rejected actions grouped by the name of the constraint that rejected
    /// them.
    pub rejected_actions: HashMap<String, Vec<Action>>,
    /// Pool view the commit was validated against.
    pub pre_snapshot: Snapshot,
    /// Pool view after appliers ran; `None` when the commit aborted in the
    /// pre-constraint phase.
    pub post_snapshot: Option<Snapshot>,
}

impl Pool {
    /// Validate, apply, and constraint-check `commit` atomically.
    ///
    /// # Errors
    ///
    /// [`PoolError::Validation`] when the commit is syntactically invalid;
    /// [`PoolError::Rejected`] when rejection arbitration aborts it. Either
    /// way the pool is left untouched.
    pub fn commit(&self, commit: &Commit) -> Result<CommitResult, PoolError> {
        self.commit_with_options(commit, CommitOptions::default())
    }

    /// [`commit`](Self::commit) with explicit options.
    ///
    /// # Errors
    ///
    /// As [`commit`](Self::commit); under `force` the constraint phases are
    /// skipped, so only validation errors remain.
    pub fn commit_with_options(
        &self,
        commit: &Commit,
        options: CommitOptions,
    ) -> Result<CommitResult, PoolError> {
        tracing::debug!(
            "commit from scheduler {} with {} actions",
            commit.scheduler_id,
            commit.actions.len()
        );
        let outcome = self.mutate(|state| run_commit(state, commit, options));
        match &outcome {
            Ok(result) => {
                tracing::info!(
                    "commit from scheduler {} accepted {} of {} actions",
                    commit.scheduler_id,
                    result.accepted_actions.len(),
                    commit.actions.len()
                );
                self.record_audit(
                    &commit.scheduler_id,
                    &commit.scheduler_id,
                    "commit-accept",
                    Some(format!(
                        "{} accepted, {} rejected",
                        result.accepted_actions.len(),
                        commit.actions.len() - result.accepted_actions.len()
                    )),
                );
            }
            Err(PoolError::Rejected(result)) => {
                tracing::warn!(
                    "commit from scheduler {} rejected by {:?}",
                    commit.scheduler_id,
                    result.rejected_actions.keys().collect::<Vec<_>>()
                );
                self.record_audit(
                    &commit.scheduler_id,
                    &commit.scheduler_id,
                    "commit-reject",
                    None,
                );
            }
            Err(err) => {
                tracing::warn!("commit from scheduler {} failed: {err}", commit.scheduler_id);
            }
        }
        outcome
    }
}

/// Rejection bookkeeping: per-constraint sequences plus the distinct
/// identity set used by arbitration.
struct RejectionSet {
    by_constraint: HashMap<String, Vec<Action>>,
    keys: HashSet<ActionKey>,
    valid_keys: HashSet<ActionKey>,
}

impl RejectionSet {
    fn new(commit: &Commit) -> Self {
        Self {
            by_constraint: HashMap::new(),
            keys: HashSet::new(),
            valid_keys: commit.actions.iter().map(Action::key).collect(),
        }
    }

    /// Union-merge `actions` under `constraint`; returns whether a new
    /// distinct action was rejected. Actions that are not part of the
    /// commit are ignored.
    fn extend(&mut self, constraint: &str, actions: Vec<Action>) -> bool {
        let mut grew = false;
        for action in actions {
            let key = action.key();
            if !self.valid_keys.contains(&key) {
                continue;
            }
            if self.keys.insert(key.clone()) {
                grew = true;
            }
            let entry = self.by_constraint.entry(constraint.to_string()).or_default();
            if !entry.iter().any(|existing| existing.key() == key) {
                entry.push(action);
            }
        }
        grew
    }

    fn distinct(&self) -> usize {
        self.keys.len()
    }

    fn contains(&self, action: &Action) -> bool {
        self.keys.contains(&action.key())
    }
}

/// True when the rejection arbitration rule says to abort.
fn arbitrate(commit: &Commit, rejections: &RejectionSet) -> bool {
    let rejected = rejections.distinct();
    if rejected == 0 {
        return false;
    }
    if commit.allow_partial_commit {
        rejected == commit.actions.len()
    } else {
        true
    }
}

fn run_commit(
    state: &mut PoolState,
    commit: &Commit,
    options: CommitOptions,
) -> Result<CommitResult, PoolError> {
    let pre_snapshot = state.snapshot();
    validate(commit, &pre_snapshot)?;

    let mut rejections = RejectionSet::new(commit);

    if !options.force {
        let pre_constraints: Vec<_> = state
            .constraints
            .pre
            .iter()
            .map(|(name, constraint)| (name.clone(), Arc::clone(constraint)))
            .collect();
        for (name, constraint) in pre_constraints {
            rejections.extend(&name, constraint.check(commit, &pre_snapshot));
        }
        if arbitrate(commit, &rejections) {
            return Err(PoolError::Rejected(Box::new(CommitResult {
                accepted_actions: Vec::new(),
                rejected_actions: rejections.by_constraint,
                pre_snapshot,
                post_snapshot: None,
            })));
        }
    }

    let post_constraints: Vec<_> = state
        .constraints
        .post
        .iter()
        .map(|(name, constraint)| (name.clone(), Arc::clone(constraint)))
        .collect();
    let base = state.clone();

    // Apply the surviving actions and evaluate post-constraints; when a
    // post-constraint rejects more actions under partial commit, rebuild the
    // post state without them and re-evaluate until the set is stable. The
    // rejection set can only grow, so this converges within the action count.
    loop {
        let mut working = base.clone();
        for action in &commit.actions {
            if rejections.contains(action) {
                continue;
            }
            apply_action(&mut working, &commit.scheduler_id, action)?;
        }
        let post_snapshot = working.snapshot();

        let mut grew = false;
        if !options.force {
            for (name, constraint) in &post_constraints {
                grew |= rejections.extend(name, constraint.check(commit, &pre_snapshot, &post_snapshot));
            }
            if arbitrate(commit, &rejections) {
                return Err(PoolError::Rejected(Box::new(CommitResult {
                    accepted_actions: Vec::new(),
                    rejected_actions: rejections.by_constraint,
                    pre_snapshot,
                    post_snapshot: Some(post_snapshot),
                })));
            }
        }
        if !grew {
            let accepted_actions = commit
                .actions
                .iter()
                .filter(|action| !rejections.contains(action))
                .cloned()
                .collect();
            *state = working;
            return Ok(CommitResult {
                accepted_actions,
                rejected_actions: rejections.by_constraint,
                pre_snapshot,
                post_snapshot: Some(post_snapshot),
            });
        }
    }
}

/// Syntactic validation against the pre-snapshot. Any failure fails the
/// whole commit with a stable reason string.
fn validate(commit: &Commit, pre: &Snapshot) -> Result<(), PoolError> {
    let mut seen = HashSet::new();
    for action in &commit.actions {
        if !seen.insert(action.id.as_str()) {
            return Err(PoolError::Validation("Commit contains duplicate tasks".into()));
        }
    }

    for action in &commit.actions {
        if action.kind == ActionKind::Create && pre.tasks.contains_key(&action.id) {
            return Err(PoolError::Validation(
                "Commit contains duplicate create tasks".into(),
            ));
        }
    }

    // The task-side probe (and the scheduler/lifecycle fields, which the
    // type system already forbids) make no sense on a task that does not
    // exist yet.
    for action in &commit.actions {
        if action.kind == ActionKind::Create && action.metadata_version.is_some() {
            return Err(PoolError::Validation(
                "Commit contains illegal properties in create actions".into(),
            ));
        }
    }

    for action in &commit.actions {
        if matches!(action.kind, ActionKind::Update | ActionKind::Kill)
            && !pre.tasks.contains_key(&action.id)
        {
            return Err(PoolError::Validation(format!(
                "Commit contains reference to missing task for {}",
                action.kind
            )));
        }
    }

    for action in &commit.actions {
        if action.kind != ActionKind::Create {
            continue;
        }
        let executor_id = action.executor_id.as_deref().unwrap_or("<unset>");
        if action.executor_id.is_none() || !pre.executors.contains_key(executor_id) {
            return Err(PoolError::Validation(format!(
                "Commit contains reference to missing executor {executor_id}"
            )));
        }
    }

    // Per targeted executor, the create actions must collectively name the
    // executor's declared resource dimensions, no more and no less.
    let mut named_keys: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for action in &commit.actions {
        if action.kind != ActionKind::Create {
            continue;
        }
        let Some(executor_id) = action.executor_id.as_deref() else {
            continue;
        };
        let entry = named_keys.entry(executor_id).or_default();
        if let Some(resources) = &action.resources {
            entry.extend(resources.keys());
        }
    }
    for (executor_id, named) in named_keys {
        let Some(executor) = pre.executors.get(executor_id) else {
            continue;
        };
        let declared: BTreeSet<&str> = executor.resources.keys().collect();
        if named != declared {
            return Err(PoolError::Validation(
                "Commit contains missing resource".into(),
            ));
        }
    }

    Ok(())
}
