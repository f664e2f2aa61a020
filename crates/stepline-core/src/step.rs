//! Step trait and related types.

use crate::error::WorkflowError;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::time::Duration;

/// Type-safe step identifier.
///
/// Uniqueness within a step list is the caller's responsibility; lookups by id
/// resolve to the first matching step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepId(String);

impl StepId {
    /// Creates a new StepId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A single unit of a linear workflow.
///
/// Only [`id`](Step::id) is required. Every hook has a no-op default and the
/// default guard always allows advancement.
///
/// # Examples
///
/// ```
/// use stepline_core::{Step, StepId, WorkflowError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AcceptTerms {
///     id: StepId,
///     accepted: bool,
/// }
///
/// #[async_trait]
/// impl Step for AcceptTerms {
///     fn id(&self) -> &StepId {
///         &self.id
///     }
///
///     async fn on_next(&self) -> Result<bool, WorkflowError> {
///         Ok(self.accepted)
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the step identifier.
    fn id(&self) -> &StepId;

    /// Whether the step may be passed over with `skip` without running its guard.
    fn is_optional(&self) -> bool {
        false
    }

    /// Called when the step becomes current.
    fn on_enter(&self) -> Result<(), WorkflowError> {
        Ok(())
    }

    /// Called when the step stops being current.
    fn on_exit(&self) -> Result<(), WorkflowError> {
        Ok(())
    }

    /// Guard evaluated before advancing past this step.
    ///
    /// - `Ok(true)` - advancement allowed
    /// - `Ok(false)` - advancement blocked
    /// - `Err(error)` - reported, then treated as blocked
    async fn on_next(&self) -> Result<bool, WorkflowError> {
        Ok(true)
    }

    /// Upper bound on how long [`on_next`](Step::on_next) may run.
    ///
    /// `None` (the default) waits for the guard to resolve.
    fn guard_timeout(&self) -> Option<Duration> {
        None
    }
}
