//! Tests for the constraint registry and user-supplied constraints.

use alphatier::config::PoolConfig;
use alphatier::core::{
    Action, ActionKind, Commit, CommitOptions, Pool, PoolError, PreConstraint, RegisterOptions,
    Resources, Snapshot, NO_RESOURCE_OVERBOOKING,
};

fn pool_with_executor() -> Pool {
    alphatier::util::telemetry::init_tracing();
    let pool = Pool::new();
    pool.register(
        "E1",
        Resources::new().with("cpu", 8),
        RegisterOptions::default(),
    )
    .unwrap();
    pool
}

fn create(id: &str, cpu: u64) -> Action {
    Action::create(id, "E1", Resources::new().with("cpu", cpu))
}

/// Rejects every action whose task id starts with a given prefix.
struct RejectPrefix(&'static str);

impl PreConstraint for RejectPrefix {
    fn check(&self, commit: &Commit, _pre: &Snapshot) -> Vec<Action> {
        commit
            .actions
            .iter()
            .filter(|action| action.id.starts_with(self.0))
            .cloned()
            .collect()
    }
}

#[test]
fn test_custom_pre_constraint_rejects() {
    let pool = pool_with_executor();
    pool.add_pre_constraint("no-tmp-tasks", RejectPrefix("tmp-"));

    let commit = Commit::new("s1")
        .with_actions([create("tmp-1", 1), create("real-1", 1)])
        .with_allow_partial_commit(true);
    let result = pool.commit(&commit).unwrap();

    assert_eq!(result.accepted_actions.len(), 1);
    assert_eq!(result.accepted_actions[0].id, "real-1");
    assert_eq!(result.rejected_actions["no-tmp-tasks"].len(), 1);
}

#[test]
fn test_closure_constraints() {
    let pool = pool_with_executor();
    pool.add_pre_constraint(
        "no-kills",
        |commit: &Commit, _pre: &Snapshot| -> Vec<Action> {
            commit
                .actions
                .iter()
                .filter(|action| action.kind == ActionKind::Kill)
                .cloned()
                .collect()
        },
    );
    pool.add_post_constraint(
        "at-most-two-tasks",
        |commit: &Commit, _pre: &Snapshot, post: &Snapshot| -> Vec<Action> {
            if post.tasks.len() > 2 {
                commit
                    .actions
                    .iter()
                    .filter(|action| action.kind == ActionKind::Create)
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            }
        },
    );

    pool.commit(&Commit::new("s1").with_actions([create("t1", 1), create("t2", 1)]))
        .unwrap();

    // The post closure now sees three tasks and rejects the create.
    let err = pool
        .commit(&Commit::new("s1").with_action(create("t3", 1)))
        .unwrap_err();
    let PoolError::Rejected(result) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(result.rejected_actions.contains_key("at-most-two-tasks"));

    // Kills are rejected by the pre closure.
    let err = pool
        .commit(&Commit::new("s1").with_action(Action::kill("t1")))
        .unwrap_err();
    let PoolError::Rejected(result) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(result.rejected_actions.contains_key("no-kills"));
}

#[test]
fn test_readding_replaces_and_removal_works() {
    let pool = pool_with_executor();
    pool.add_pre_constraint("gate", RejectPrefix("t"));

    // Everything starting with "t" is rejected.
    assert!(pool
        .commit(&Commit::new("s1").with_action(create("t1", 1)))
        .is_err());

    // Re-adding under the same name replaces the predicate.
    pool.add_pre_constraint("gate", RejectPrefix("zzz-"));
    assert!(pool
        .commit(&Commit::new("s1").with_action(create("t1", 1)))
        .is_ok());

    assert!(pool.remove_pre_constraint("gate"));
    assert!(!pool.remove_pre_constraint("gate"));
}

#[test]
fn test_removing_overbooking_constraint_permits_overbooking() {
    let pool = pool_with_executor();
    assert!(pool.remove_post_constraint(NO_RESOURCE_OVERBOOKING));

    let commit = Commit::new("s1").with_actions([create("t1", 8), create("t2", 8)]);
    let result = pool.commit(&commit).unwrap();
    assert_eq!(result.accepted_actions.len(), 2);

    let snapshot = pool.get_snapshot();
    assert_eq!(snapshot.reserved_resources("E1").get("cpu"), 16);
}

#[test]
fn test_pool_without_default_constraints() {
    let config = PoolConfig::new().with_install_default_constraints(false);
    let pool = Pool::with_config(config);
    pool.register(
        "E1",
        Resources::new().with("cpu", 1),
        RegisterOptions::default(),
    )
    .unwrap();

    // Stale probes and overbooking both pass: nothing is installed.
    let commit = Commit::new("s1").with_actions([
        create("t1", 5).with_executor_metadata_version(42),
        create("t2", 5),
    ]);
    let result = pool.commit(&commit).unwrap();
    assert_eq!(result.accepted_actions.len(), 2);
}

#[test]
fn test_force_bypasses_custom_constraints() {
    let pool = pool_with_executor();
    pool.add_pre_constraint(
        "reject-everything",
        |commit: &Commit, _pre: &Snapshot| -> Vec<Action> { commit.actions.clone() },
    );

    assert!(pool
        .commit(&Commit::new("s1").with_action(create("t1", 1)))
        .is_err());

    let result = pool
        .commit_with_options(
            &Commit::new("s1").with_action(create("t1", 1)),
            CommitOptions::new().with_force(true),
        )
        .unwrap();
    assert_eq!(result.accepted_actions.len(), 1);
    assert!(result.rejected_actions.is_empty());
}

#[test]
fn test_rejections_from_unknown_actions_are_ignored() {
    let pool = pool_with_executor();
    pool.add_pre_constraint(
        "confused",
        |_commit: &Commit, _pre: &Snapshot| -> Vec<Action> {
            // Returns an action that is not part of the commit at all.
            vec![Action::kill("some-other-task")]
        },
    );

    let result = pool
        .commit(&Commit::new("s1").with_action(create("t1", 1)))
        .unwrap();
    assert_eq!(result.accepted_actions.len(), 1);
    assert!(result.rejected_actions.is_empty());
}

#[test]
fn test_pre_and_post_rejections_merge_by_name() {
    let pool = pool_with_executor();
    pool.add_pre_constraint("shared-name", RejectPrefix("a-"));
    pool.add_post_constraint(
        "shared-name",
        |commit: &Commit, _pre: &Snapshot, _post: &Snapshot| -> Vec<Action> {
            commit
                .actions
                .iter()
                .filter(|action| action.id.starts_with("b-"))
                .cloned()
                .collect()
        },
    );

    let commit = Commit::new("s1")
        .with_actions([create("a-1", 1), create("b-1", 1), create("c-1", 1)])
        .with_allow_partial_commit(true);
    let result = pool.commit(&commit).unwrap();

    assert_eq!(result.accepted_actions.len(), 1);
    assert_eq!(result.accepted_actions[0].id, "c-1");
    assert_eq!(result.rejected_actions["shared-name"].len(), 2);
}
