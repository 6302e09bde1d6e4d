// src/dag/mod.rs

//! Task declarations, the task graph and its per-run scheduling.
//!
//! - [`declare`] registers tasks and validates the resulting graph.
//! - [`graph`] keeps adjacency (dependencies and dependents) per task.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready to run, and which ones are blocked by a failure.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod declare;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use declare::{CommandSpec, TaskAction, TaskDecl, TaskGraph, TaskRegistry};
pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
