//! Action appliers: the three mutation kinds a commit can carry.

use crate::core::action::{Action, ActionKind};
use crate::core::error::PoolError;
use crate::core::model::{LifecyclePhase, Task};
use crate::core::pool::PoolState;
use crate::util::serde::{merge_metadata, SchedulerId};

/// Apply one action to `state` on behalf of `scheduler_id`.
///
/// Syntactic validation has proven referential integrity by the time
/// appliers run; an error here aborts the surrounding transaction.
pub(crate) fn apply_action(
    state: &mut PoolState,
    scheduler_id: &SchedulerId,
    action: &Action,
) -> Result<(), PoolError> {
    match action.kind {
        ActionKind::Create => apply_create(state, scheduler_id, action),
        ActionKind::Update => apply_update(state, action),
        ActionKind::Kill => apply_kill(state, action),
    }
}

fn apply_create(
    state: &mut PoolState,
    scheduler_id: &SchedulerId,
    action: &Action,
) -> Result<(), PoolError> {
    let Some(executor_id) = action.executor_id.clone() else {
        return Err(PoolError::Validation(
            "create action is missing an executor id".into(),
        ));
    };
    let Some(executor) = state.executors.get_mut(&executor_id) else {
        return Err(PoolError::UnknownExecutor(executor_id));
    };
    let task = Task {
        id: action.id.clone(),
        executor_id,
        scheduler_id: scheduler_id.clone(),
        lifecycle_phase: LifecyclePhase::Create,
        resources: action.resources.clone().unwrap_or_default(),
        metadata: action.metadata.clone().unwrap_or_default(),
        metadata_version: 0,
    };
    executor.task_ids.insert(task.id.clone());
    executor.task_ids_version += 1;
    state.tasks.insert(task.id.clone(), task);
    Ok(())
}

fn apply_update(state: &mut PoolState, action: &Action) -> Result<(), PoolError> {
    let Some(task) = state.tasks.get_mut(&action.id) else {
        return Err(PoolError::UnknownTask(action.id.clone()));
    };
    if let Some(patch) = &action.metadata {
        merge_metadata(&mut task.metadata, patch);
    }
    task.metadata_version += 1;
    Ok(())
}

fn apply_kill(state: &mut PoolState, action: &Action) -> Result<(), PoolError> {
    let Some(task) = state.tasks.get_mut(&action.id) else {
        return Err(PoolError::UnknownTask(action.id.clone()));
    };
    // Clamp instead of erroring: a task already past `kill` stays put.
    if task.lifecycle_phase < LifecyclePhase::Kill {
        task.lifecycle_phase = LifecyclePhase::Kill;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Executor, ExecutorStatus};
    use crate::core::resources::Resources;
    use crate::util::serde::{metadata_from_value, Metadata};
    use serde_json::json;

    fn state_with_executor() -> PoolState {
        let mut state = PoolState::default();
        state.executors.insert(
            "e1".into(),
            Executor {
                id: "e1".into(),
                status: ExecutorStatus::Registered,
                resources: Resources::new().with("cpu", 8),
                metadata: Metadata::new(),
                metadata_version: 0,
                task_ids: std::collections::BTreeSet::new(),
                task_ids_version: 0,
            },
        );
        state
    }

    #[test]
    fn test_create_inserts_task_and_bumps_executor() {
        let mut state = state_with_executor();
        let action = Action::create("t1", "e1", Resources::new().with("cpu", 2));

        apply_action(&mut state, &"s1".to_string(), &action).unwrap();

        let task = &state.tasks["t1"];
        assert_eq!(task.lifecycle_phase, LifecyclePhase::Create);
        assert_eq!(task.scheduler_id, "s1");
        assert_eq!(task.metadata_version, 0);
        let executor = &state.executors["e1"];
        assert!(executor.task_ids.contains("t1"));
        assert_eq!(executor.task_ids_version, 1);
    }

    #[test]
    fn test_update_merges_metadata_and_bumps_version() {
        let mut state = state_with_executor();
        let create = Action::create("t1", "e1", Resources::new().with("cpu", 1))
            .with_metadata(metadata_from_value(json!({"a": 1})).unwrap());
        apply_action(&mut state, &"s1".to_string(), &create).unwrap();

        let update = Action::update("t1")
            .with_metadata(metadata_from_value(json!({"b": 2})).unwrap());
        apply_action(&mut state, &"s1".to_string(), &update).unwrap();

        let task = &state.tasks["t1"];
        assert_eq!(task.metadata, metadata_from_value(json!({"a": 1, "b": 2})).unwrap());
        assert_eq!(task.metadata_version, 1);
    }

    #[test]
    fn test_kill_sets_phase_without_deleting() {
        let mut state = state_with_executor();
        let create = Action::create("t1", "e1", Resources::new().with("cpu", 1));
        apply_action(&mut state, &"s1".to_string(), &create).unwrap();

        apply_action(&mut state, &"s1".to_string(), &Action::kill("t1")).unwrap();

        let task = &state.tasks["t1"];
        assert_eq!(task.lifecycle_phase, LifecyclePhase::Kill);
        assert!(state.executors["e1"].task_ids.contains("t1"));
    }

    #[test]
    fn test_kill_never_regresses_phase() {
        let mut state = state_with_executor();
        let create = Action::create("t1", "e1", Resources::new().with("cpu", 1));
        apply_action(&mut state, &"s1".to_string(), &create).unwrap();
        state.tasks.get_mut("t1").unwrap().lifecycle_phase = LifecyclePhase::Killing;

        apply_action(&mut state, &"s1".to_string(), &Action::kill("t1")).unwrap();

        assert_eq!(state.tasks["t1"].lifecycle_phase, LifecyclePhase::Killing);
    }
}
