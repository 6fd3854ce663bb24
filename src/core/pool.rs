//! The shared pool: state store, snapshot facility, executor operations.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::PoolConfig;
use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::constraint::{ConstraintRegistry, PostConstraint, PreConstraint};
use crate::core::error::PoolError;
use crate::core::model::{Executor, ExecutorStatus, LifecyclePhase, Task};
use crate::core::resources::Resources;
use crate::core::snapshot::Snapshot;
use crate::util::clock::now_ms;
use crate::util::serde::{merge_metadata, ExecutorId, Metadata, TaskId};

/// Mutable pool state guarded by the handle's lock.
#[derive(Clone, Default)]
pub(crate) struct PoolState {
    pub(crate) executors: HashMap<ExecutorId, Executor>,
    pub(crate) tasks: HashMap<TaskId, Task>,
    pub(crate) constraints: ConstraintRegistry,
}

impl PoolState {
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            executors: self.executors.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

/// Options for executor registration.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Initial metadata bag.
    pub metadata: Option<Metadata>,
    /// Initial metadata version; nonzero when rebuilding from external state.
    pub metadata_version: u64,
    /// Pre-existing tasks inserted verbatim alongside the executor; the
    /// executor's task-id set becomes the set of their ids.
    pub tasks: Vec<Task>,
    /// Initial task-id-set version.
    pub task_ids_version: u64,
}

impl RegisterOptions {
    /// Set the initial metadata bag.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the initial metadata version.
    #[must_use]
    pub fn with_metadata_version(mut self, version: u64) -> Self {
        self.metadata_version = version;
        self
    }

    /// Supply pre-existing tasks to insert verbatim.
    #[must_use]
    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Set the initial task-id-set version.
    #[must_use]
    pub fn with_task_ids_version(mut self, version: u64) -> Self {
        self.task_ids_version = version;
        self
    }
}

/// The shared, in-memory pool of executors and tasks.
///
/// `Pool` is a cloneable handle; clones observe and mutate the same state.
/// Reads take consistent snapshots, and every mutating operation runs as
/// one serialised, all-or-nothing transaction: concurrent callers appear
/// to execute in some total order, and no caller ever observes a
/// half-applied change.
#[derive(Clone)]
pub struct Pool {
    state: Arc<RwLock<PoolState>>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
    config: PoolConfig,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Empty pool with the built-in constraints installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Empty pool configured by `config`.
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        let constraints = if config.install_default_constraints {
            ConstraintRegistry::with_defaults()
        } else {
            ConstraintRegistry::default()
        };
        Self {
            state: Arc::new(RwLock::new(PoolState {
                executors: HashMap::new(),
                tasks: HashMap::new(),
                constraints,
            })),
            audit: None,
            config,
        }
    }

    /// Rebuild a pool from an externally persisted snapshot.
    ///
    /// The `{executors, tasks}` projection is seeded verbatim; only the
    /// default built-in constraints are installed.
    #[must_use]
    pub fn create_with_snapshot(snapshot: Snapshot) -> Self {
        let pool = Self::new();
        {
            let mut state = pool.state.write();
            state.executors = snapshot.executors;
            state.tasks = snapshot.tasks;
        }
        pool
    }

    /// Attach an audit sink recording pool lifecycle events.
    ///
    /// [`InMemoryAuditSink::from_config`](crate::core::audit::InMemoryAuditSink::from_config)
    /// builds a sink whose buffer bound comes from this pool's
    /// [`PoolConfig::audit_buffer_size`].
    #[must_use]
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(sink)));
        self
    }

    /// The configuration this pool was created with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // ---- state store ----------------------------------------------------

    pub(crate) fn read<R>(&self, f: impl FnOnce(&PoolState) -> R) -> R {
        f(&self.state.read())
    }

    /// Run `f` against a working copy of the state under the write lock and
    /// swap it in on `Ok`; an `Err` aborts and rolls back.
    pub(crate) fn mutate<R>(
        &self,
        f: impl FnOnce(&mut PoolState) -> Result<R, PoolError>,
    ) -> Result<R, PoolError> {
        let mut guard = self.state.write();
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }

    // ---- snapshot facility ----------------------------------------------

    /// A consistent point-in-time view of `{executors, tasks}`.
    #[must_use]
    pub fn get_snapshot(&self) -> Snapshot {
        self.read(PoolState::snapshot)
    }

    // ---- constraint registry --------------------------------------------

    /// Install or replace a pre-constraint under `name`.
    pub fn add_pre_constraint(
        &self,
        name: impl Into<String>,
        constraint: impl PreConstraint + 'static,
    ) {
        self.state
            .write()
            .constraints
            .pre
            .insert(name.into(), Arc::new(constraint));
    }

    /// Install or replace a post-constraint under `name`.
    pub fn add_post_constraint(
        &self,
        name: impl Into<String>,
        constraint: impl PostConstraint + 'static,
    ) {
        self.state
            .write()
            .constraints
            .post
            .insert(name.into(), Arc::new(constraint));
    }

    /// Remove the pre-constraint installed under `name`; returns whether one
    /// was present.
    pub fn remove_pre_constraint(&self, name: &str) -> bool {
        self.state.write().constraints.pre.remove(name).is_some()
    }

    /// Remove the post-constraint installed under `name`; returns whether
    /// one was present.
    ///
    /// Removing `no-resource-overbooking` is the documented way to permit
    /// overbooking.
    pub fn remove_post_constraint(&self, name: &str) -> bool {
        self.state.write().constraints.post.remove(name).is_some()
    }

    // ---- executor operations --------------------------------------------

    /// Install or overwrite an executor.
    ///
    /// Re-registering garbage-collects the tasks previously assigned to the
    /// executor before inserting the ones supplied in `options`, so task
    /// ownership stays consistent.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidResources`] when `resources` declares nothing.
    pub fn register(
        &self,
        id: impl Into<ExecutorId>,
        resources: Resources,
        options: RegisterOptions,
    ) -> Result<(), PoolError> {
        let id = id.into();
        if resources.is_empty() {
            return Err(PoolError::InvalidResources(format!(
                "executor {id} declares no resources"
            )));
        }
        self.mutate(|state| {
            state.tasks.retain(|_, task| task.executor_id != id);
            let mut task_ids = BTreeSet::new();
            for task in options.tasks {
                task_ids.insert(task.id.clone());
                state.tasks.insert(task.id.clone(), task);
            }
            state.executors.insert(
                id.clone(),
                Executor {
                    id: id.clone(),
                    status: ExecutorStatus::Registered,
                    resources,
                    metadata: options.metadata.unwrap_or_default(),
                    metadata_version: options.metadata_version,
                    task_ids,
                    task_ids_version: options.task_ids_version,
                },
            );
            Ok(())
        })?;
        tracing::info!("registered executor {id}");
        self.record_audit(&id, "", "register", None);
        Ok(())
    }

    /// Merge `metadata` into the executor's bag and bump its version.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownExecutor`] when `id` is not registered.
    pub fn update(&self, id: &str, metadata: &Metadata) -> Result<(), PoolError> {
        self.mutate(|state| {
            let Some(executor) = state.executors.get_mut(id) else {
                return Err(PoolError::UnknownExecutor(id.to_string()));
            };
            merge_metadata(&mut executor.metadata, metadata);
            executor.metadata_version += 1;
            Ok(())
        })?;
        tracing::debug!("updated executor {id} metadata");
        Ok(())
    }

    /// Mark the executor unregistered; the record is retained.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownExecutor`] when `id` is not registered.
    pub fn unregister(&self, id: &str) -> Result<(), PoolError> {
        self.mutate(|state| {
            let Some(executor) = state.executors.get_mut(id) else {
                return Err(PoolError::UnknownExecutor(id.to_string()));
            };
            executor.status = ExecutorStatus::Unregistered;
            Ok(())
        })?;
        tracing::info!("unregistered executor {id}");
        self.record_audit(id, "", "unregister", None);
        Ok(())
    }

    /// Advance a task's lifecycle phase and/or merge metadata; bumps the
    /// task's metadata version by one.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownTask`] when the task does not exist;
    /// [`PoolError::Validation`] when the phase would regress.
    pub fn update_task(
        &self,
        task_id: &str,
        lifecycle_phase: Option<LifecyclePhase>,
        metadata: Option<&Metadata>,
    ) -> Result<(), PoolError> {
        self.mutate(|state| {
            let Some(task) = state.tasks.get_mut(task_id) else {
                return Err(PoolError::UnknownTask(task_id.to_string()));
            };
            if let Some(phase) = lifecycle_phase {
                if phase < task.lifecycle_phase {
                    return Err(PoolError::Validation(format!(
                        "task {task_id} lifecycle cannot regress from {:?} to {phase:?}",
                        task.lifecycle_phase
                    )));
                }
                task.lifecycle_phase = phase;
            }
            if let Some(patch) = metadata {
                merge_metadata(&mut task.metadata, patch);
            }
            task.metadata_version += 1;
            Ok(())
        })
    }

    /// Remove a task whose kill has been carried out.
    ///
    /// Drops the task record, detaches the id from the owning executor, and
    /// bumps that executor's task-id-set version.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownTask`] when the task does not exist.
    pub fn kill_task(&self, task_id: &str) -> Result<(), PoolError> {
        self.mutate(|state| {
            let Some(task) = state.tasks.remove(task_id) else {
                return Err(PoolError::UnknownTask(task_id.to_string()));
            };
            if let Some(executor) = state.executors.get_mut(&task.executor_id) {
                executor.task_ids.remove(task_id);
                executor.task_ids_version += 1;
            }
            Ok(())
        })?;
        tracing::debug!("killed task {task_id}");
        self.record_audit(task_id, "", "kill-task", None);
        Ok(())
    }

    // ---- audit -----------------------------------------------------------

    pub(crate) fn record_audit(
        &self,
        subject_id: &str,
        scheduler_id: &str,
        action: &str,
        payload: Option<String>,
    ) {
        if let Some(sink) = &self.audit {
            let event = build_audit_event(
                format!("{subject_id}-{action}-{}", now_ms()),
                subject_id,
                scheduler_id,
                action,
                payload,
            );
            sink.lock().record(event);
        }
    }
}
