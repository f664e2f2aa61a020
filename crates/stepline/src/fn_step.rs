//! Closure-backed step definitions.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use stepline_core::{Step, StepId, WorkflowError};

type Hook = Box<dyn Fn() -> Result<(), WorkflowError> + Send + Sync>;
type GuardFuture = Pin<Box<dyn Future<Output = Result<bool, WorkflowError>> + Send>>;
type Guard = Box<dyn Fn() -> GuardFuture + Send + Sync>;

/// A [`Step`] assembled from closures.
///
/// Useful when a step has no state of its own beyond the callbacks it runs.
///
/// # Examples
///
/// ```
/// use stepline::FnStep;
///
/// let step = FnStep::new("email")
///     .on_enter(|| Ok(()))
///     .on_next(|| async { Ok(true) })
///     .optional(true);
/// ```
pub struct FnStep {
    id: StepId,
    optional: bool,
    guard_timeout: Option<Duration>,
    on_enter: Option<Hook>,
    on_exit: Option<Hook>,
    on_next: Option<Guard>,
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("id", &self.id)
            .field("optional", &self.optional)
            .field("guard_timeout", &self.guard_timeout)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .field("on_next", &self.on_next.is_some())
            .finish()
    }
}

impl FnStep {
    /// Creates a step with no callbacks.
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            optional: false,
            guard_timeout: None,
            on_enter: None,
            on_exit: None,
            on_next: None,
        }
    }

    /// Sets the callback run when the step becomes current.
    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), WorkflowError> + Send + Sync + 'static,
    {
        self.on_enter = Some(Box::new(f));
        self
    }

    /// Sets the callback run when the step stops being current.
    pub fn on_exit<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), WorkflowError> + Send + Sync + 'static,
    {
        self.on_exit = Some(Box::new(f));
        self
    }

    /// Sets an asynchronous guard.
    pub fn on_next<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, WorkflowError>> + Send + 'static,
    {
        self.on_next = Some(Box::new(move || -> GuardFuture { Box::pin(f()) }));
        self
    }

    /// Sets a guard that resolves immediately.
    pub fn on_next_sync<F>(self, f: F) -> Self
    where
        F: Fn() -> Result<bool, WorkflowError> + Send + Sync + 'static,
    {
        self.on_next(move || std::future::ready(f()))
    }

    /// Marks the step as skippable.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Bounds how long the guard may run.
    pub fn guard_timeout(mut self, timeout: Duration) -> Self {
        self.guard_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Step for FnStep {
    fn id(&self) -> &StepId {
        &self.id
    }

    fn is_optional(&self) -> bool {
        self.optional
    }

    fn on_enter(&self) -> Result<(), WorkflowError> {
        match &self.on_enter {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn on_exit(&self) -> Result<(), WorkflowError> {
        match &self.on_exit {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    async fn on_next(&self) -> Result<bool, WorkflowError> {
        match &self.on_next {
            Some(guard) => guard().await,
            None => Ok(true),
        }
    }

    fn guard_timeout(&self) -> Option<Duration> {
        self.guard_timeout
    }
}
