use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use docpipe::dag::{Scheduler, TaskGraph, TaskRunState};
use docpipe::engine::TaskOutcome;
use docpipe_test_utils::builders::GraphBuilder;

/// Random DAG: task N may only depend on tasks 0..N, so there are no cycles.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = (TaskGraph, Vec<Vec<usize>>)> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw| {
            let mut deps_by_task = Vec::with_capacity(num_tasks);
            let mut builder = GraphBuilder::new();
            for (i, potential) in raw.into_iter().enumerate() {
                let deps: BTreeSet<usize> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| d % i).collect()
                };
                let names: Vec<String> = deps.iter().map(|d| name(*d)).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                builder = builder.barrier(&name(i), &refs);
                deps_by_task.push(deps.into_iter().collect());
            }
            (builder.build(), deps_by_task)
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i:02}")
}

proptest! {
    #[test]
    fn runs_terminate_and_respect_barriers(
        (graph, deps) in dag_strategy(10),
        triggers in proptest::collection::vec(0..10usize, 1..5),
        failing in proptest::collection::btree_set(0..10usize, 0..4),
    ) {
        let n = deps.len();
        let mut scheduler = Scheduler::from_graph(&graph);

        let mut pending: Vec<String> = Vec::new();
        for t in triggers.iter().filter(|t| **t < n) {
            pending.extend(scheduler.handle_trigger(&name(*t)).into_iter().map(|s| s.name));
        }

        let mut outcomes: HashMap<String, TaskOutcome> = HashMap::new();
        let mut steps = 0;
        while let Some(task) = pending.pop() {
            steps += 1;
            prop_assert!(steps <= 10 * n, "scheduler did not terminate");

            let idx: usize = task["task_".len()..].parse().unwrap();
            // Barrier: every dependency succeeded before this task started.
            for d in &deps[idx] {
                prop_assert_eq!(outcomes.get(&name(*d)), Some(&TaskOutcome::Success));
            }
            prop_assert!(!outcomes.contains_key(&task), "task dispatched twice in one run");

            let outcome = if failing.contains(&idx) {
                TaskOutcome::Failed(1)
            } else {
                TaskOutcome::Success
            };
            outcomes.insert(task.clone(), outcome);
            pending.extend(
                scheduler
                    .handle_completion(&task, outcome)
                    .into_iter()
                    .map(|s| s.name),
            );
        }

        prop_assert!(scheduler.is_idle());

        // Nothing downstream of a failure ran.
        for (i, task_deps) in deps.iter().enumerate() {
            let upstream_failed = task_deps.iter().any(|d| {
                matches!(scheduler.run_state_of(&name(*d)), Some(TaskRunState::DoneFailed))
            });
            if upstream_failed {
                prop_assert!(!outcomes.contains_key(&name(i)));
            }
        }
    }
}
