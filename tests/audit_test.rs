//! Tests for the audit trail recorded around pool operations.

use std::sync::{Arc, Mutex};

use alphatier::config::PoolConfig;
use alphatier::core::{
    build_audit_event, Action, AuditEvent, AuditSink, Commit, InMemoryAuditSink, Pool,
    RegisterOptions, Resources,
};

/// Sink that shares its event log with the test.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<AuditEvent>>>);

impl AuditSink for SharedSink {
    fn record(&mut self, event: AuditEvent) {
        self.0.lock().unwrap().push(event);
    }
}

impl SharedSink {
    fn actions(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.action.clone())
            .collect()
    }
}

#[test]
fn test_pool_records_lifecycle_events() {
    let sink = SharedSink::default();
    let pool = Pool::new().with_audit(Box::new(sink.clone()));

    pool.register("E1", Resources::new().with("cpu", 4), RegisterOptions::default())
        .unwrap();
    pool.commit(
        &Commit::new("s1").with_action(Action::create("t1", "E1", Resources::new().with("cpu", 1))),
    )
    .unwrap();
    pool.kill_task("t1").unwrap();
    pool.unregister("E1").unwrap();

    assert_eq!(
        sink.actions(),
        ["register", "commit-accept", "kill-task", "unregister"]
    );
}

#[test]
fn test_rejected_commits_are_audited() {
    let sink = SharedSink::default();
    let pool = Pool::new().with_audit(Box::new(sink.clone()));
    pool.register("E1", Resources::new().with("cpu", 4), RegisterOptions::default())
        .unwrap();

    let overbooking =
        Commit::new("s1").with_action(Action::create("t1", "E1", Resources::new().with("cpu", 5)));
    assert!(pool.commit(&overbooking).is_err());

    assert_eq!(sink.actions(), ["register", "commit-reject"]);

    let events = sink.0.lock().unwrap();
    let reject = events.last().unwrap();
    assert_eq!(reject.scheduler_id, "s1");
}

#[test]
fn test_failed_validation_is_not_an_audit_event() {
    let sink = SharedSink::default();
    let pool = Pool::new().with_audit(Box::new(sink.clone()));
    pool.register("E1", Resources::new().with("cpu", 4), RegisterOptions::default())
        .unwrap();

    let invalid = Commit::new("s1").with_actions([
        Action::create("t1", "E1", Resources::new().with("cpu", 1)),
        Action::kill("t1"),
    ]);
    assert!(pool.commit(&invalid).is_err());

    // Only the registration is on record; malformed commits never ran.
    assert_eq!(sink.actions(), ["register"]);
}

#[test]
fn test_sink_bound_comes_from_pool_config() {
    let config = PoolConfig::new().with_audit_buffer_size(2);
    let pool = Pool::with_config(config);

    // The sink backing the pool's audit trail is sized by the pool's own
    // configuration.
    let mut sink = InMemoryAuditSink::from_config(pool.config());
    for i in 0..4 {
        sink.record(build_audit_event(format!("ev-{i}"), "e1", "", "register", None));
    }
    assert_eq!(sink.events().len(), 2);
    assert_eq!(sink.events()[0].event_id, "ev-2");

    let pool = pool.with_audit(Box::new(sink));
    pool.register("E1", Resources::new().with("cpu", 1), RegisterOptions::default())
        .unwrap();
}
