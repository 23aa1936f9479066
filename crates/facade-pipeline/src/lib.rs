//! Declarative task graph for build pipelines.
//!
//! Tasks are named units of work with declared dependency edges. The graph
//! schedules them topologically: every task whose dependencies have completed
//! is started immediately and awaited independently, so tasks with no
//! ordering relation run concurrently.

pub mod graph;
pub mod task;

pub use graph::{GraphError, GraphReport, TaskGraph, TaskTiming};
pub use task::{BoxError, Task, TaskFuture, TaskResult};
