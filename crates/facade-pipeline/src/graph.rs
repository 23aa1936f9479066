//! Topological scheduling of task graphs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::task::{BoxError, Task};

/// Errors produced while validating or running a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on unknown task '{dep}'")]
    UnknownDependency { task: String, dep: String },

    #[error("Dependency cycle involving task '{0}'")]
    Cycle(String),

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: BoxError,
    },

    #[error("Task '{0}' panicked")]
    TaskPanicked(String),
}

/// Wall-clock timing for one completed task.
#[derive(Debug, Clone)]
pub struct TaskTiming {
    pub name: String,
    pub duration: Duration,
}

/// Summary of a successful graph run.
#[derive(Debug, Default)]
pub struct GraphReport {
    pub completed: Vec<TaskTiming>,
}

/// A directed acyclic graph of tasks sharing a context of type `C`.
///
/// Edges are declared per task via [`Task::after`]. Tasks inside the same
/// "level" (no path between them) are started concurrently and awaited
/// independently; they must write to disjoint destination paths, which the
/// graph does not enforce.
pub struct TaskGraph<C> {
    tasks: Vec<Task<C>>,
}

impl<C> Default for TaskGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TaskGraph<C> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add a task to the graph.
    pub fn add(mut self, task: Task<C>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Check name uniqueness, edge targets, and acyclicity.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashMap::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if seen.insert(task.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicateTask(task.name().to_string()));
            }
        }

        for task in &self.tasks {
            for dep in task.deps() {
                if !seen.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        task: task.name().to_string(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm over indices; anything left unscheduled is cyclic.
        let (indegree, dependents) = self.edges(&seen);
        let mut indegree = indegree;
        let mut ready: Vec<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut scheduled = 0;

        while let Some(i) = ready.pop() {
            scheduled += 1;
            for &next in &dependents[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if scheduled != self.tasks.len() {
            let stuck = indegree
                .iter()
                .position(|d| *d > 0)
                .map(|i| self.tasks[i].name().to_string())
                .unwrap_or_default();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(())
    }

    fn edges(&self, index: &HashMap<String, usize>) -> (Vec<usize>, Vec<Vec<usize>>) {
        let mut indegree = vec![0usize; self.tasks.len()];
        let mut dependents = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in task.deps() {
                let d = index[dep];
                indegree[i] += 1;
                dependents[d].push(i);
            }
        }
        (indegree, dependents)
    }
}

impl<C: Send + Sync + 'static> TaskGraph<C> {
    /// Run the graph to completion.
    ///
    /// Every task whose dependencies have finished is spawned immediately.
    /// On the first task failure no further tasks are started; tasks already
    /// in flight are awaited before the error is returned, so no task is
    /// interrupted mid-write.
    pub async fn run(&self, ctx: Arc<C>) -> Result<GraphReport, GraphError> {
        self.validate()?;

        let index: HashMap<String, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        let (mut indegree, dependents) = self.edges(&index);

        let mut set: JoinSet<(usize, Result<(), BoxError>, Duration)> = JoinSet::new();
        let mut report = GraphReport::default();
        let mut failure: Option<GraphError> = None;

        for (i, d) in indegree.iter().enumerate() {
            if *d == 0 {
                self.spawn_task(&mut set, i, Arc::clone(&ctx));
            }
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, Ok(()), duration)) => {
                    let name = self.tasks[i].name();
                    tracing::debug!("Task '{}' finished in {}ms", name, duration.as_millis());
                    report.completed.push(TaskTiming {
                        name: name.to_string(),
                        duration,
                    });
                    if failure.is_none() {
                        for &next in &dependents[i] {
                            indegree[next] -= 1;
                            if indegree[next] == 0 {
                                self.spawn_task(&mut set, next, Arc::clone(&ctx));
                            }
                        }
                    }
                }
                Ok((i, Err(source), _)) => {
                    let name = self.tasks[i].name().to_string();
                    tracing::error!("Task '{}' failed: {}", name, source);
                    if failure.is_none() {
                        failure = Some(GraphError::TaskFailed { task: name, source });
                    }
                }
                Err(join_err) => {
                    tracing::error!("Task panicked: {}", join_err);
                    if failure.is_none() {
                        failure = Some(GraphError::TaskPanicked(join_err.to_string()));
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn spawn_task(
        &self,
        set: &mut JoinSet<(usize, Result<(), BoxError>, Duration)>,
        i: usize,
        ctx: Arc<C>,
    ) {
        let run = self.tasks[i].runner();
        let name = self.tasks[i].name().to_string();
        set.spawn(async move {
            tracing::debug!("Task '{}' starting", name);
            let start = Instant::now();
            let result = run(ctx).await;
            (i, result, start.elapsed())
        });
    }
}
