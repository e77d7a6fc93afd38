//! Sequential step execution.
//!
//! A [`PipelineRunner`] walks a growable queue of steps with an index cursor.
//! Exactly one step is in flight at any time; the next one starts only after
//! the previous step's future has resolved. A step may push further steps
//! onto the queue while it runs; they execute after every step already
//! queued, in push order.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::ArchitectError;

/// One unit of work in a pipeline over context `C`
#[async_trait]
pub trait Step<C>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Run the step. Resolving the future is the step's single continuation.
    async fn run(&self, ctx: &mut C, queue: &mut StepQueue<C>) -> Result<(), ArchitectError>;
}

/// Ordered, growable list of steps with a cursor
pub struct StepQueue<C> {
    steps: Vec<Arc<dyn Step<C>>>,
    cursor: usize,
}

impl<C> StepQueue<C> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cursor: 0,
        }
    }

    /// Append a step after every step already queued
    pub fn push<S: Step<C> + 'static>(&mut self, step: S) {
        self.steps.push(Arc::new(step));
    }

    pub fn push_arc(&mut self, step: Arc<dyn Step<C>>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 1-based position of the step currently running, 0 before the first
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Steps queued after the current one
    pub fn remaining(&self) -> usize {
        self.steps.len() - self.cursor
    }

    fn advance(&mut self) -> Option<Arc<dyn Step<C>>> {
        let step = self.steps.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(step)
    }
}

impl<C> Default for StepQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline execution states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub executed: usize,
    pub elapsed: Duration,
}

/// Runs steps one at a time, stopping at the first failure
pub struct PipelineRunner<C> {
    label: String,
    queue: StepQueue<C>,
    state: PipelineState,
    step_timeout: Option<Duration>,
}

impl<C> PipelineRunner<C> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            queue: StepQueue::new(),
            state: PipelineState::Pending,
            step_timeout: None,
        }
    }

    /// Fail any single step that takes longer than `timeout`
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn push<S: Step<C> + 'static>(&mut self, step: S) {
        self.queue.push(step);
    }

    pub fn push_arc(&mut self, step: Arc<dyn Step<C>>) {
        self.queue.push_arc(step);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Total steps known, including ones appended while running
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Steps started so far
    pub fn executed(&self) -> usize {
        self.queue.position()
    }

    /// Run every queued step in order.
    ///
    /// A runner runs once; later calls fail with
    /// [`ArchitectError::PipelineFinished`].
    pub async fn run(&mut self, ctx: &mut C) -> Result<PipelineReport, ArchitectError> {
        if self.state != PipelineState::Pending {
            return Err(ArchitectError::PipelineFinished {
                pipeline: self.label.clone(),
            });
        }

        self.state = PipelineState::Running;
        let started = Instant::now();

        while let Some(step) = self.queue.advance() {
            let position = self.queue.position();
            let name = step.name();
            tracing::debug!(pipeline = %self.label, position, step = %name, "Running step");

            if let Err(error) = self.execute(step, ctx, position, name).await {
                self.state = PipelineState::Failed;
                tracing::debug!(pipeline = %self.label, position, "Pipeline stopped: {}", error);
                return Err(error);
            }
        }

        self.state = PipelineState::Completed;
        let report = PipelineReport {
            executed: self.queue.position(),
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            pipeline = %self.label,
            "Pipeline completed {} steps in {:?}",
            report.executed,
            report.elapsed
        );
        Ok(report)
    }

    async fn execute(
        &mut self,
        step: Arc<dyn Step<C>>,
        ctx: &mut C,
        position: usize,
        name: String,
    ) -> Result<(), ArchitectError> {
        let future = AssertUnwindSafe(step.run(ctx, &mut self.queue)).catch_unwind();

        let outcome = match self.step_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, future).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(ArchitectError::StepTimedOut {
                        position,
                        step: name,
                        timeout,
                    })
                }
            },
            None => future.await,
        };

        outcome.unwrap_or_else(|payload| {
            Err(ArchitectError::StepPanicked {
                position,
                step: name,
                message: panic_message(payload.as_ref()),
            })
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
