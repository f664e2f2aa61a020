//! Serializable view of a controller's read-only state.

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a [`WorkflowController`](crate::WorkflowController).
///
/// Every field is a projection of the current position; taking a snapshot has
/// no side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    /// Current position.
    pub step: usize,
    /// Id of the current step, empty when there are no steps.
    pub step_id: String,
    /// Number of steps in the workflow.
    pub total_steps: usize,
    /// On the first step (or no steps).
    pub is_first: bool,
    /// On the last step (or no steps).
    pub is_last: bool,
    /// A successful `next` would move rather than finish.
    pub can_next: bool,
    /// `back` would move.
    pub can_back: bool,
    /// A navigation call holds the transition lock.
    pub is_transitioning: bool,
}
