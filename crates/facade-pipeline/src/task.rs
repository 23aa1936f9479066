//! Task definition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed error carried out of a failed task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single task invocation.
pub type TaskResult = Result<(), BoxError>;

/// Boxed future produced by a task's run function.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

/// A named, independently invocable unit of build work.
///
/// The run function receives a shared context (configuration, caches,
/// handles) and returns a future. Tasks hold no state of their own between
/// invocations.
pub struct Task<C> {
    name: String,
    deps: Vec<String>,
    run: Arc<dyn Fn(Arc<C>) -> TaskFuture + Send + Sync>,
}

impl<C> Task<C> {
    /// Create a task with no declared dependencies.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            deps: Vec::new(),
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Declare that this task must not start before the named tasks finished.
    pub fn after(mut self, deps: &[&str]) -> Self {
        self.deps.extend(deps.iter().map(|d| d.to_string()));
        self
    }

    /// Task name (unique within a graph).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency names.
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub(crate) fn runner(&self) -> Arc<dyn Fn(Arc<C>) -> TaskFuture + Send + Sync> {
        Arc::clone(&self.run)
    }
}

impl<C> std::fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}
