use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use docpipe::dag::ScheduledTask;
use docpipe::engine::{RuntimeEvent, TaskName, TaskOutcome};
use docpipe::errors::Result;
use docpipe::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// What the fake executor saw, shared with the test.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    executed: Arc<Mutex<Vec<TaskName>>>,
    cancelled: Arc<Mutex<Vec<TaskName>>>,
}

impl ExecutionLog {
    /// Task names in dispatch order.
    pub fn executed(&self) -> Vec<TaskName> {
        self.executed.lock().unwrap().clone()
    }

    /// Task names the runtime asked to cancel, in order.
    pub fn cancelled(&self) -> Vec<TaskName> {
        self.cancelled.lock().unwrap().clone()
    }
}

/// A fake executor that:
/// - records which tasks were "run" and which were cancelled
/// - immediately reports `TaskCompleted` for each scheduled task, with the
///   scripted outcome (default `Success`), unless created with [`FakeExecutor::holding`]
/// - answers a cancellation with `TaskCompleted(Cancelled)`.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    outcomes: HashMap<TaskName, TaskOutcome>,
    auto_complete: bool,
    log: ExecutionLog,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            outcomes: HashMap::new(),
            auto_complete: true,
            log: ExecutionLog::default(),
        }
    }

    /// Dispatched tasks stay "running" until the test sends their completion.
    pub fn holding(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(runtime_tx)
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = self.log.clone();
        let auto_complete = self.auto_complete;
        let outcomes = self.outcomes.clone();

        Box::pin(async move {
            for t in tasks {
                log.executed.lock().unwrap().push(t.name.clone());

                if auto_complete {
                    let outcome = outcomes
                        .get(&t.name)
                        .copied()
                        .unwrap_or(TaskOutcome::Success);
                    tx.send(RuntimeEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
                }
            }
            Ok(())
        })
    }

    fn cancel_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = self.log.clone();

        Box::pin(async move {
            for name in tasks {
                log.cancelled.lock().unwrap().push(name.clone());
                tx.send(RuntimeEvent::TaskCompleted {
                    task: name,
                    outcome: TaskOutcome::Cancelled,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
