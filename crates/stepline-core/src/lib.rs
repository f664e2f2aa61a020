//! Core traits and types for the stepline step sequencer.
//!
//! This crate has no runtime dependencies. Depend on it to implement custom
//! steps without pulling in the controller.
//!
//! # Core Types
//!
//! - [`Step`] - A unit of a linear workflow with enter/exit hooks and an async guard
//! - [`StepId`] - Type-safe step identifier
//! - [`NextOutcome`] / [`Navigation`] - What a navigation call did
//! - [`StepTarget`] - Index or id destination for a jump
//! - [`WorkflowError`] - Error types reported by the controller

mod error;
mod outcome;
mod step;

pub use error::{HookType, WorkflowError};
pub use outcome::{Navigation, NextOutcome, StepTarget};
pub use step::{Step, StepId};
