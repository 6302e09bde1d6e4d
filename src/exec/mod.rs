// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually performing the work behind a
//! scheduled task and reporting back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop which tracks in-flight
//!   task instances and routes cancellation requests.
//! - [`task_runner`] dispatches a single task on its [`TaskAction`](crate::dag::TaskAction).
//! - [`command`] runs external processes through the platform shell.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{ExecutorMessage, spawn_executor};
