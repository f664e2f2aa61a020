//! Navigation targets and results.

use crate::step::StepId;

/// Result of a forward transition (`next` or `skip`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Position moved forward by one.
    Advanced {
        /// Position before the move.
        from: usize,
        /// Position after the move.
        to: usize,
    },
    /// The guard returned `false` or failed. Position unchanged.
    Blocked,
    /// Another `next` is still evaluating its guard. Nothing ran.
    Busy,
    /// Advancement was requested from the last step and the finish callback ran.
    Finished,
    /// The workflow has no steps.
    Empty,
}

impl NextOutcome {
    /// Returns `true` if the position changed.
    pub fn is_advanced(&self) -> bool {
        matches!(self, NextOutcome::Advanced { .. })
    }
}

/// Result of a synchronous navigation (`back`, `go_to`, `reset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Position changed and the exit/enter pair ran.
    Moved {
        /// Position before the move.
        from: usize,
        /// Position after the move.
        to: usize,
    },
    /// Nothing changed and no hooks ran.
    Unchanged,
}

impl Navigation {
    /// Returns `true` if the position changed.
    pub fn is_moved(&self) -> bool {
        matches!(self, Navigation::Moved { .. })
    }
}

/// Destination of a `go_to` jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTarget {
    /// Jump by position.
    Index(usize),
    /// Jump to the first step with this id.
    Id(StepId),
}

impl From<usize> for StepTarget {
    fn from(index: usize) -> Self {
        StepTarget::Index(index)
    }
}

impl From<StepId> for StepTarget {
    fn from(id: StepId) -> Self {
        StepTarget::Id(id)
    }
}

impl From<&StepId> for StepTarget {
    fn from(id: &StepId) -> Self {
        StepTarget::Id(id.clone())
    }
}

impl From<&str> for StepTarget {
    fn from(id: &str) -> Self {
        StepTarget::Id(StepId::new(id))
    }
}

impl From<String> for StepTarget {
    fn from(id: String) -> Self {
        StepTarget::Id(StepId::from(id))
    }
}
