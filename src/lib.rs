//! # Alphatier
//!
//! An in-memory resource-coordination core that lets multiple independent
//! schedulers mutate a shared pool of executors and the tasks running on
//! them, under configurable consistency constraints.
//!
//! Executors declare named, numeric capacities; tasks reserve sub-bundles
//! of them. Schedulers submit batched change proposals ("commits") that the
//! engine validates, transactionally applies, and constraint-checks with
//! atomic, all-or-nothing or partial-accept semantics.
//!
//! ## Modules
//!
//! - [`core`](crate::core) - Pool state, commit engine, constraints
//! - [`config`](crate::config) - Pool construction configuration
//! - [`util`](crate::util) - Identifiers, metadata bags, clock, telemetry
//!
//! ## Examples
//!
//! ### Registering an executor and committing a task
//!
//! ```
//! use alphatier::core::{Action, Commit, Pool, RegisterOptions, Resources};
//!
//! let pool = Pool::new();
//! pool.register(
//!     "exec-1",
//!     Resources::new().with("cpu", 8).with("memory", 100),
//!     RegisterOptions::default(),
//! )?;
//!
//! let commit = Commit::new("scheduler-1").with_action(Action::create(
//!     "task-1",
//!     "exec-1",
//!     Resources::new().with("cpu", 1).with("memory", 25),
//! ));
//! let result = pool.commit(&commit)?;
//! assert_eq!(result.accepted_actions.len(), 1);
//!
//! let snapshot = pool.get_snapshot();
//! assert!(snapshot.tasks.contains_key("task-1"));
//! # Ok::<(), alphatier::core::PoolError>(())
//! ```
//!
//! ### Partial commits
//!
//! With `allow_partial_commit`, the engine accepts whatever the installed
//! constraints let through and reports the rest per constraint name:
//!
//! ```
//! use alphatier::core::{
//!     Action, Commit, Pool, RegisterOptions, Resources, NO_RESOURCE_OVERBOOKING,
//! };
//!
//! let pool = Pool::new();
//! pool.register("exec-1", Resources::new().with("memory", 100), RegisterOptions::default())?;
//!
//! let commit = Commit::new("scheduler-1")
//!     .with_actions([
//!         Action::create("a", "exec-1", Resources::new().with("memory", 80)),
//!         Action::create("b", "exec-1", Resources::new().with("memory", 80)),
//!     ])
//!     .with_allow_partial_commit(true);
//!
//! let result = pool.commit(&commit)?;
//! assert_eq!(result.accepted_actions.len(), 1);
//! assert_eq!(result.rejected_actions[NO_RESOURCE_OVERBOOKING].len(), 1);
//! # Ok::<(), alphatier::core::PoolError>(())
//! ```
//!
//! ### Optimistic locking
//!
//! Actions may carry version probes; the built-in `optimistic-locking`
//! constraint rejects actions whose probe no longer matches the pool:
//!
//! ```
//! use alphatier::core::{Action, Commit, Pool, PoolError, RegisterOptions, Resources};
//!
//! let pool = Pool::new();
//! pool.register("exec-1", Resources::new().with("cpu", 4), RegisterOptions::default())?;
//!
//! // Someone updates the executor's metadata: version becomes 1.
//! pool.update("exec-1", &alphatier::util::serde::Metadata::new())?;
//!
//! let stale = Commit::new("scheduler-1").with_action(
//!     Action::create("task-1", "exec-1", Resources::new().with("cpu", 1))
//!         .with_executor_metadata_version(0),
//! );
//! assert!(matches!(pool.commit(&stale), Err(PoolError::Rejected(_))));
//! # Ok::<(), alphatier::core::PoolError>(())
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod core;
pub mod util;

// Re-export main types for convenience
pub use crate::config::PoolConfig;
pub use crate::core::{
    Action, ActionKind, Commit, CommitOptions, CommitResult, Executor, ExecutorStatus,
    LifecyclePhase, Pool, PoolError, RegisterOptions, Resources, Snapshot, Task,
};
