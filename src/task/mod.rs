//! Task graph: steps composed with parallel and sequential combinators.
//!
//! ```text
//! build = Sequential(
//!     clean,
//!     Parallel(Sequential(compile, useref), image, font, extra),
//!     measure,
//! )
//! compile = Parallel(style, script, page)
//! ```
//!
//! Graphs are built bottom-up from leaves, so they are finite and acyclic.
//! All composites run on the caller's task; "parallel" means interleaved
//! at await points, not multi-core.

mod named;
mod step;


pub use named::Steps;
pub use step::{Step, StepError, StepResult, TransformStep};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;

use crate::transform::TransformError;
use crate::utils::{format_bytes, plural_count};

/// A node in the task graph.
#[derive(Clone)]
pub enum Task {
    Leaf(Arc<dyn Step>),
    /// Run concurrently; complete when all complete.
    Parallel(Vec<Task>),
    /// Run in order; each waits for the previous one.
    Sequential(Vec<Task>),
}

impl Task {
    pub fn leaf(step: impl Step + 'static) -> Self {
        Self::Leaf(Arc::new(step))
    }

    /// Leaf names in declaration order.
    #[cfg(test)]
    pub fn leaf_names(&self) -> Vec<String> {
        match self {
            Self::Leaf(step) => vec![step.name().to_string()],
            Self::Parallel(tasks) | Self::Sequential(tasks) => {
                tasks.iter().flat_map(Self::leaf_names).collect()
            }
        }
    }
}

/// Failure of a task invocation, attributed to the step that raised it.
#[derive(Debug, Error)]
#[error("step `{step}` failed")]
pub struct TaskError {
    pub step: String,
    #[source]
    pub source: StepError,
}

/// Result of one leaf.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub result: StepResult,
    pub elapsed: Duration,
}

impl StepReport {
    /// One-line summary, e.g. `3 files, 1.2 kB in 14ms`.
    pub fn summary(&self) -> String {
        if let Some(note) = &self.result.note {
            return note.clone();
        }
        if self.result.source_missing {
            return "no matching sources".to_string();
        }
        format!(
            "{}, {} in {}ms",
            plural_count(self.result.files, "file"),
            format_bytes(self.result.bytes_written),
            self.elapsed.as_millis()
        )
    }
}

/// Leaf results of a completed task, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    #[cfg(test)]
    pub fn files(&self) -> usize {
        self.steps.iter().map(|s| s.result.files).sum()
    }

    /// Per-file errors tagged with the step name.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &TransformError)> {
        self.steps
            .iter()
            .flat_map(|s| s.result.errors.iter().map(move |e| (s.name.as_str(), e)))
    }

    fn extend(&mut self, other: Self) {
        self.steps.extend(other.steps);
    }

    /// Log one line per step plus every per-file error.
    pub fn log(&self) {
        for step in &self.steps {
            crate::log!(&step.name; "{}", step.summary());
        }
        for (step, error) in self.errors() {
            crate::log!("warning"; "{}: {}", step, error);
        }
    }
}

/// Run a task to completion.
///
/// Rejects with the first failure. In a `Parallel` composite the rejection
/// is reported only after every sibling has reached a terminal state; in a
/// `Sequential` composite the remaining tasks never start.
pub fn run(task: &Task) -> BoxFuture<'_, Result<RunReport, TaskError>> {
    Box::pin(async move {
        match task {
            Task::Leaf(step) => run_leaf(step.as_ref()).await,
            Task::Sequential(tasks) => {
                let mut report = RunReport::default();
                for task in tasks {
                    report.extend(run(task).await?);
                }
                Ok(report)
            }
            Task::Parallel(tasks) => {
                let mut pending: FuturesUnordered<_> = tasks.iter().map(run).collect();
                let mut report = RunReport::default();
                let mut first_error = None;

                while let Some(outcome) = pending.next().await {
                    match outcome {
                        Ok(sub) => report.extend(sub),
                        Err(e) => {
                            crate::debug!("task"; "{} (waiting for siblings)", e);
                            first_error.get_or_insert(e);
                        }
                    }
                }

                match first_error {
                    Some(e) => Err(e),
                    None => Ok(report),
                }
            }
        }
    })
}

async fn run_leaf(step: &dyn Step) -> Result<RunReport, TaskError> {
    let started = Instant::now();
    crate::debug!(step.name(); "starting");

    let result = step.execute().await.map_err(|source| TaskError {
        step: step.name().to_string(),
        source,
    })?;

    Ok(RunReport {
        steps: vec![StepReport {
            name: step.name().to_string(),
            result,
            elapsed: started.elapsed(),
        }],
    })
}
