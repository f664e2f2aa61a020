//! Workflow error types.

use crate::step::StepId;
use std::time::Duration;
use thiserror::Error;

/// The lifecycle hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// The step's `on_enter` hook.
    OnEnter,
    /// The step's `on_exit` hook.
    OnExit,
    /// The controller's finish callback.
    OnFinish,
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::OnEnter => write!(f, "on_enter"),
            HookType::OnExit => write!(f, "on_exit"),
            HookType::OnFinish => write!(f, "on_finish"),
        }
    }
}

/// Errors produced by a workflow controller or its steps.
///
/// Guard and hook failures are never returned from navigation calls. The
/// controller reports them through its error channel and keeps going.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WorkflowError {
    /// The controller configuration is invalid.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    /// A step failed. Returned by step authors from their own hooks.
    #[error("Step failed: {step_id}, details: {details}")]
    StepError {
        /// The step that failed.
        step_id: StepId,
        /// Details about the failure.
        details: String,
    },

    /// A guard raised an error; advancement was blocked.
    #[error("Guard failed in step '{step_id}': {details}")]
    GuardFailure {
        /// The step whose guard failed.
        step_id: StepId,
        /// Details about the failure.
        details: String,
    },

    /// A guard did not resolve within the step's timeout; advancement was blocked.
    #[error("Guard timed out in step '{step_id}' after {timeout:?}")]
    GuardTimeout {
        /// The step whose guard timed out.
        step_id: StepId,
        /// The configured timeout.
        timeout: Duration,
    },

    /// A lifecycle hook failed. The position change that triggered it stands.
    #[error("Hook '{hook_type}' failed in step '{step_id}': {details}")]
    HookError {
        /// The step whose hook failed (the terminal step for `on_finish`).
        step_id: StepId,
        /// Which hook failed.
        hook_type: HookType,
        /// Details about the failure.
        details: String,
    },

    /// No step has the requested id. Strict mode only.
    #[error("Step not found: {0}")]
    StepNotFound(StepId),

    /// The requested index is outside the step list. Strict mode only.
    #[error("Step index {index} out of range for {len} steps")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of steps in the workflow.
        len: usize,
    },

    /// `skip` was called on a step that is not optional. Strict mode only.
    #[error("Step '{0}' is not optional and cannot be skipped")]
    NotOptional(StepId),

    /// A navigation call arrived while `next` was evaluating a guard.
    #[error("A transition is already in progress")]
    TransitionInProgress,
}
