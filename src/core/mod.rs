//! Core pool state, commit engine, and constraint machinery.

pub mod action;
mod apply;
pub mod audit;
pub mod commit;
pub mod constraint;
pub mod error;
pub mod model;
pub mod pool;
pub mod resources;
pub mod snapshot;

pub use action::{Action, ActionKind, Commit};
pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use commit::{CommitOptions, CommitResult};
pub use constraint::{
    NoResourceOverbooking, OptimisticLocking, PostConstraint, PreConstraint,
    NO_RESOURCE_OVERBOOKING, OPTIMISTIC_LOCKING,
};
pub use error::{AppResult, PoolError};
pub use model::{Executor, ExecutorStatus, LifecyclePhase, Task};
pub use pool::{Pool, RegisterOptions};
pub use resources::Resources;
pub use snapshot::Snapshot;
