//! A linear step sequencer for wizards and guided flows.
//!
//! A [`WorkflowController`] walks an ordered list of [`Step`]s. Each step can
//! gate advancement with an async guard, run hooks on entry and exit, and be
//! jumped to or skipped out of order.
//!
//! # Example
//!
//! ```rust
//! use stepline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WorkflowError> {
//!     let checkout = WorkflowController::builder()
//!         .step(FnStep::new("cart"))
//!         .step(FnStep::new("shipping").on_next(|| async { Ok(true) }))
//!         .step(FnStep::new("payment"))
//!         .on_finish(|| {
//!             println!("order placed");
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     while checkout.next().await != NextOutcome::Finished {}
//!     assert_eq!(checkout.step_id(), "payment");
//!     Ok(())
//! }
//! ```

mod controller;
mod fn_step;
mod status;

// Re-export core types
pub use stepline_core::*;

pub use controller::{ControllerOptions, ErrorHook, FinishHook, WorkflowBuilder, WorkflowController};
pub use fn_step::FnStep;
pub use status::WorkflowStatus;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ControllerOptions, FnStep, HookType, Navigation, NextOutcome, Step, StepId, StepTarget,
        WorkflowBuilder, WorkflowController, WorkflowError, WorkflowStatus,
    };
}
