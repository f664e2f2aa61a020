//! Linear step controller.

use crate::status::WorkflowStatus;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use stepline_core::{HookType, Navigation, NextOutcome, Step, StepId, StepTarget, WorkflowError};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Callback run when advancement is requested from the last step.
pub type FinishHook = Box<dyn Fn() -> Result<(), WorkflowError> + Send + Sync>;

/// Callback receiving every guard and hook failure.
pub type ErrorHook = Box<dyn Fn(&WorkflowError) + Send + Sync>;

/// Options applied when constructing a [`WorkflowController`].
#[derive(Default)]
pub struct ControllerOptions {
    /// Position entered at construction and restored by `reset`.
    pub initial_step: usize,
    /// Runs each time `next` (or `skip`) succeeds on the last step.
    pub on_finish: Option<FinishHook>,
    /// Receives guard and hook failures.
    pub on_error: Option<ErrorHook>,
    /// Turn out-of-range or unknown navigation targets into errors instead of no-ops.
    pub strict: bool,
}

impl fmt::Debug for ControllerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("initial_step", &self.initial_step)
            .field("on_finish", &self.on_finish.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("strict", &self.strict)
            .finish()
    }
}

#[derive(Debug)]
struct Cursor {
    position: usize,
    previous: Option<usize>,
}

/// Single-flight lock held for the whole of every navigation call.
struct TransitionLock<'a>(&'a AtomicBool);

impl<'a> TransitionLock<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TransitionLock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Advances through an ordered list of steps.
///
/// The initial step is entered on construction. Every committed position
/// change runs the old step's `on_exit` followed by the new step's `on_enter`,
/// and dropping the controller exits the current step.
///
/// All methods take `&self`, so a controller can be shared (e.g. behind an
/// `Arc`) between the task awaiting a guard and the code issuing commands.
/// While `next` awaits a guard, further `next` calls return
/// [`NextOutcome::Busy`] and the synchronous commands return
/// [`WorkflowError::TransitionInProgress`]. The same lock covers the
/// synchronous commands, so hooks that call back into the controller are
/// rejected the same way.
///
/// # Examples
///
/// ```
/// use stepline::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), WorkflowError> {
/// let wizard = WorkflowController::builder()
///     .step(FnStep::new("account"))
///     .step(FnStep::new("profile").on_next_sync(|| Ok(false)))
///     .step(FnStep::new("confirm"))
///     .build()?;
///
/// assert_eq!(wizard.next().await, NextOutcome::Advanced { from: 0, to: 1 });
/// assert_eq!(wizard.next().await, NextOutcome::Blocked);
/// assert_eq!(wizard.step_id(), "profile");
///
/// wizard.go_to("confirm")?;
/// assert!(wizard.is_last());
/// # Ok(())
/// # }
/// ```
pub struct WorkflowController {
    steps: Vec<Box<dyn Step>>,
    initial_step: usize,
    cursor: Mutex<Cursor>,
    transitioning: AtomicBool,
    on_finish: Option<FinishHook>,
    on_error: Option<ErrorHook>,
    strict: bool,
    errors: Mutex<Vec<WorkflowError>>,
}

impl fmt::Debug for WorkflowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowController")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("step", &self.step())
            .field("initial_step", &self.initial_step)
            .field("is_transitioning", &self.is_transitioning())
            .field("strict", &self.strict)
            .finish()
    }
}

impl WorkflowController {
    /// Creates a new controller builder.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// Creates a controller and enters its initial step.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Configuration`] if `initial_step` is out of
    /// range for a non-empty step list. An empty list always starts at 0.
    pub fn new(
        steps: Vec<Box<dyn Step>>,
        options: ControllerOptions,
    ) -> Result<Self, WorkflowError> {
        if !steps.is_empty() && options.initial_step >= steps.len() {
            return Err(WorkflowError::Configuration(format!(
                "initial step {} is out of range for {} steps",
                options.initial_step,
                steps.len()
            )));
        }
        let initial_step = if steps.is_empty() {
            0
        } else {
            options.initial_step
        };

        let controller = Self {
            steps,
            initial_step,
            cursor: Mutex::new(Cursor {
                position: initial_step,
                previous: None,
            }),
            transitioning: AtomicBool::new(false),
            on_finish: options.on_finish,
            on_error: options.on_error,
            strict: options.strict,
            errors: Mutex::new(Vec::new()),
        };

        if let Some(step) = controller.steps.get(initial_step) {
            info!("Workflow started at step '{}'", step.id());
            controller.check_hook(step.id(), HookType::OnEnter, step.on_enter());
        }
        Ok(controller)
    }

    /// Current position.
    pub fn step(&self) -> usize {
        self.cursor().position
    }

    /// Id of the current step, or `""` when there are no steps.
    pub fn step_id(&self) -> &str {
        self.current().map(|s| s.id().as_str()).unwrap_or("")
    }

    /// The current step, if any.
    pub fn current(&self) -> Option<&dyn Step> {
        self.steps.get(self.step()).map(|s| &**s)
    }

    /// All steps in order.
    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    /// Number of steps.
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Position restored by [`reset`](Self::reset).
    pub fn initial_step(&self) -> usize {
        self.initial_step
    }

    /// Position held before the most recent committed change.
    pub fn previous_step(&self) -> Option<usize> {
        self.cursor().previous
    }

    /// Index of the first step with the given id.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id().as_str() == id)
    }

    /// `true` on the first step, and for an empty workflow.
    pub fn is_first(&self) -> bool {
        self.step() == 0
    }

    /// `true` on the last step, and for an empty workflow.
    pub fn is_last(&self) -> bool {
        self.steps.is_empty() || self.step() + 1 == self.steps.len()
    }

    /// `true` when `back` would move.
    pub fn can_back(&self) -> bool {
        self.step() > 0
    }

    /// `true` when a successful `next` would move rather than finish.
    pub fn can_next(&self) -> bool {
        self.step() + 1 < self.steps.len()
    }

    /// `true` while a navigation call holds the transition lock.
    pub fn is_transitioning(&self) -> bool {
        self.transitioning.load(Ordering::Acquire)
    }

    /// Snapshot of all read-only projections.
    pub fn status(&self) -> WorkflowStatus {
        let step = self.step();
        let len = self.steps.len();
        let step_id = self
            .steps
            .get(step)
            .map(|s| s.id().to_string())
            .unwrap_or_default();
        WorkflowStatus {
            step,
            step_id,
            total_steps: len,
            is_first: step == 0,
            is_last: len == 0 || step + 1 == len,
            can_next: step + 1 < len,
            can_back: step > 0,
            is_transitioning: self.is_transitioning(),
        }
    }

    /// Drains the failures reported since the last call.
    pub fn take_errors(&self) -> Vec<WorkflowError> {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *errors)
    }

    /// Evaluates the current step's guard and advances by one if it allows.
    ///
    /// On the last step an allowed advancement runs the finish callback and
    /// returns [`NextOutcome::Finished`]; this happens on every such call.
    pub async fn next(&self) -> NextOutcome {
        let Some(_lock) = TransitionLock::acquire(&self.transitioning) else {
            debug!("next() ignored: a transition is already in progress");
            return NextOutcome::Busy;
        };

        let position = self.step();
        let Some(step) = self.steps.get(position) else {
            return NextOutcome::Empty;
        };

        if !self.evaluate_guard(&**step).await {
            debug!("Guard of step '{}' blocked advancement", step.id());
            return NextOutcome::Blocked;
        }

        self.advance(&**step, position)
    }

    /// Moves one step back. Guards are not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::TransitionInProgress`] while `next` is running.
    pub fn back(&self) -> Result<Navigation, WorkflowError> {
        let _lock = self.lock_idle()?;
        match self.step() {
            0 => Ok(Navigation::Unchanged),
            position => Ok(self.commit(position, position - 1)),
        }
    }

    /// Jumps directly to a step by index or id.
    ///
    /// Only the exit/enter pair of the source and destination run; steps in
    /// between are not touched and no guard is consulted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::TransitionInProgress`] while `next` is running.
    /// In strict mode, an unknown target returns [`WorkflowError::IndexOutOfRange`]
    /// or [`WorkflowError::StepNotFound`]; otherwise it is a no-op.
    pub fn go_to(&self, target: impl Into<StepTarget>) -> Result<Navigation, WorkflowError> {
        let _lock = self.lock_idle()?;
        let index = match target.into() {
            StepTarget::Index(index) if index < self.steps.len() => index,
            StepTarget::Index(index) => {
                return self.ignore(WorkflowError::IndexOutOfRange {
                    index,
                    len: self.steps.len(),
                })
            }
            StepTarget::Id(id) => match self.position_of(id.as_str()) {
                Some(index) => index,
                None => return self.ignore(WorkflowError::StepNotFound(id)),
            },
        };
        Ok(self.commit(self.step(), index))
    }

    /// Returns to the initial step.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::TransitionInProgress`] while `next` is running.
    pub fn reset(&self) -> Result<Navigation, WorkflowError> {
        let _lock = self.lock_idle()?;
        Ok(self.commit(self.step(), self.initial_step))
    }

    /// Advances past the current step without running its guard, provided
    /// the step is optional.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::TransitionInProgress`] while `next` is running.
    /// In strict mode, skipping a required step returns
    /// [`WorkflowError::NotOptional`]; otherwise it yields
    /// [`NextOutcome::Blocked`].
    pub fn skip(&self) -> Result<NextOutcome, WorkflowError> {
        let _lock = self.lock_idle()?;
        let position = self.step();
        let Some(step) = self.steps.get(position) else {
            return Ok(NextOutcome::Empty);
        };
        if !step.is_optional() {
            let error = WorkflowError::NotOptional(step.id().clone());
            if self.strict {
                return Err(error);
            }
            debug!("skip() ignored: {}", error);
            return Ok(NextOutcome::Blocked);
        }
        Ok(self.advance(&**step, position))
    }

    fn advance(&self, step: &dyn Step, position: usize) -> NextOutcome {
        if position + 1 == self.steps.len() {
            info!("Workflow finished at step '{}'", step.id());
            if let Some(on_finish) = &self.on_finish {
                self.check_hook(step.id(), HookType::OnFinish, on_finish());
            }
            return NextOutcome::Finished;
        }
        match self.commit(position, position + 1) {
            Navigation::Moved { from, to } => NextOutcome::Advanced { from, to },
            Navigation::Unchanged => {
                debug!("Step '{}' is no longer current; not advancing", step.id());
                NextOutcome::Blocked
            }
        }
    }

    async fn evaluate_guard(&self, step: &dyn Step) -> bool {
        let result = match step.guard_timeout() {
            Some(limit) => match timeout(limit, step.on_next()).await {
                Ok(result) => result,
                Err(_) => {
                    self.report(WorkflowError::GuardTimeout {
                        step_id: step.id().clone(),
                        timeout: limit,
                    });
                    return false;
                }
            },
            None => step.on_next().await,
        };

        match result {
            Ok(allowed) => allowed,
            Err(e) => {
                self.report(WorkflowError::GuardFailure {
                    step_id: step.id().clone(),
                    details: e.to_string(),
                });
                false
            }
        }
    }

    /// Moves the cursor from `from` to `to` and runs the exit/enter pair.
    ///
    /// Nothing happens unless the cursor still sits at `from`. The cursor
    /// lock is released before any hook runs.
    fn commit(&self, from: usize, to: usize) -> Navigation {
        {
            let mut cursor = self.cursor();
            if cursor.position != from || from == to {
                return Navigation::Unchanged;
            }
            cursor.previous = Some(from);
            cursor.position = to;
        }

        if let Some(step) = self.steps.get(from) {
            self.check_hook(step.id(), HookType::OnExit, step.on_exit());
        }
        if let Some(step) = self.steps.get(to) {
            info!("Moved from step {} to step '{}'", from, step.id());
            self.check_hook(step.id(), HookType::OnEnter, step.on_enter());
        }
        Navigation::Moved { from, to }
    }

    fn lock_idle(&self) -> Result<TransitionLock<'_>, WorkflowError> {
        TransitionLock::acquire(&self.transitioning).ok_or_else(|| {
            debug!("Navigation rejected: a transition is already in progress");
            WorkflowError::TransitionInProgress
        })
    }

    fn ignore(&self, error: WorkflowError) -> Result<Navigation, WorkflowError> {
        if self.strict {
            return Err(error);
        }
        debug!("Navigation ignored: {}", error);
        Ok(Navigation::Unchanged)
    }

    fn check_hook(
        &self,
        step_id: &StepId,
        hook_type: HookType,
        result: Result<(), WorkflowError>,
    ) {
        if let Err(e) = result {
            self.report(WorkflowError::HookError {
                step_id: step_id.clone(),
                hook_type,
                details: e.to_string(),
            });
        }
    }

    fn report(&self, error: WorkflowError) {
        warn!("Workflow error: {}", error);
        if let Some(on_error) = &self.on_error {
            on_error(&error);
        }
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        if let Some(step) = self.current() {
            debug!("Workflow dropped at step '{}'", step.id());
            self.check_hook(step.id(), HookType::OnExit, step.on_exit());
        }
    }
}

/// Builder for constructing [`WorkflowController`] instances.
#[derive(Default)]
pub struct WorkflowBuilder {
    steps: Vec<Box<dyn Step>>,
    start: Option<StepTarget>,
    options: ControllerOptions,
}

impl fmt::Debug for WorkflowBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowBuilder")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("start", &self.start)
            .field("options", &self.options)
            .finish()
    }
}

impl WorkflowBuilder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends already boxed steps.
    pub fn steps(mut self, steps: impl IntoIterator<Item = Box<dyn Step>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Sets the initial step by position.
    pub fn initial_step(mut self, index: usize) -> Self {
        self.start = Some(StepTarget::Index(index));
        self
    }

    /// Sets the initial step by id.
    pub fn start_with(mut self, id: impl Into<StepId>) -> Self {
        self.start = Some(StepTarget::Id(id.into()));
        self
    }

    /// Sets the callback run when advancing from the last step.
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), WorkflowError> + Send + Sync + 'static,
    {
        self.options.on_finish = Some(Box::new(f));
        self
    }

    /// Sets the callback receiving guard and hook failures.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkflowError) + Send + Sync + 'static,
    {
        self.options.on_error = Some(Box::new(f));
        self
    }

    /// Enables strict navigation.
    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Builds the controller and enters its initial step.
    pub fn build(self) -> Result<WorkflowController, WorkflowError> {
        let mut options = self.options;
        match self.start {
            Some(StepTarget::Index(index)) => options.initial_step = index,
            Some(StepTarget::Id(id)) => {
                options.initial_step = self
                    .steps
                    .iter()
                    .position(|s| s.id() == &id)
                    .ok_or(WorkflowError::StepNotFound(id))?;
            }
            None => {}
        }
        WorkflowController::new(self.steps, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnStep;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, OnceLock, Weak};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    type Log = Arc<Mutex<Vec<String>>>;
    type Slot = Arc<OnceLock<Weak<WorkflowController>>>;

    fn tracked(id: &'static str, log: &Log) -> FnStep {
        let enter = log.clone();
        let exit = log.clone();
        FnStep::new(id)
            .on_enter(move || {
                enter.lock().expect("log").push(format!("enter:{}", id));
                Ok(())
            })
            .on_exit(move || {
                exit.lock().expect("log").push(format!("exit:{}", id));
                Ok(())
            })
    }

    fn events(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().expect("log"))
    }

    fn failing(id: &str) -> WorkflowError {
        WorkflowError::StepError {
            step_id: StepId::new(id),
            details: "boom".to_string(),
        }
    }

    #[test]
    fn test_construction_enters_initial_step() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .step(tracked("c", &log))
            .initial_step(1)
            .build()
            .expect("valid workflow");

        assert_eq!(events(&log), vec!["enter:b"]);
        assert_eq!(controller.step(), 1);
        assert_eq!(controller.step_id(), "b");
        assert!(!controller.is_first());
        assert!(!controller.is_last());
        assert!(controller.can_back());
        assert!(controller.can_next());
        assert_eq!(controller.previous_step(), None);
    }

    #[test]
    fn test_invalid_initial_step() {
        let result = WorkflowController::builder()
            .step(FnStep::new("a"))
            .initial_step(1)
            .build();
        assert!(matches!(result, Err(WorkflowError::Configuration(_))));
    }

    #[test]
    fn test_start_with_unknown_id() {
        let result = WorkflowController::builder()
            .step(FnStep::new("a"))
            .start_with("missing")
            .build();
        assert!(
            matches!(result, Err(WorkflowError::StepNotFound(id)) if id.as_str() == "missing")
        );
    }

    #[test]
    fn test_start_with_id() {
        let controller = WorkflowController::builder()
            .step(FnStep::new("a"))
            .step(FnStep::new("b"))
            .start_with("b")
            .build()
            .expect("valid workflow");
        assert_eq!(controller.step(), 1);
        assert!(controller.is_last());
    }

    #[tokio::test]
    async fn test_empty_workflow() {
        let controller = WorkflowController::new(Vec::new(), ControllerOptions::default())
            .expect("empty workflow is valid");

        assert_eq!(controller.step_id(), "");
        assert!(controller.is_first());
        assert!(controller.is_last());
        assert!(!controller.can_next());
        assert!(!controller.can_back());
        assert_eq!(controller.next().await, NextOutcome::Empty);
        assert_eq!(controller.back().expect("back"), Navigation::Unchanged);
        assert_eq!(controller.go_to(0_usize).expect("go_to"), Navigation::Unchanged);
        assert_eq!(controller.go_to("a").expect("go_to"), Navigation::Unchanged);
        assert_eq!(controller.reset().expect("reset"), Navigation::Unchanged);
        assert_eq!(controller.skip().expect("skip"), NextOutcome::Empty);
        assert!(!controller.is_transitioning());
    }

    #[test]
    fn test_empty_workflow_ignores_initial_step() {
        let options = ControllerOptions {
            initial_step: 3,
            ..ControllerOptions::default()
        };
        let controller = WorkflowController::new(Vec::new(), options).expect("valid");
        assert_eq!(controller.step(), 0);
        assert_eq!(controller.initial_step(), 0);
    }

    #[tokio::test]
    async fn test_next_runs_exit_then_enter() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .build()
            .expect("valid workflow");
        events(&log);

        assert_eq!(
            controller.next().await,
            NextOutcome::Advanced { from: 0, to: 1 }
        );
        assert_eq!(events(&log), vec!["exit:a", "enter:b"]);
        assert_eq!(controller.previous_step(), Some(0));
    }

    #[test]
    fn test_next_is_single_flight() {
        let release = Arc::new(Notify::new());
        let guard_calls = Arc::new(AtomicU32::new(0));
        let (signal, calls) = (release.clone(), guard_calls.clone());

        let controller = WorkflowController::builder()
            .step(FnStep::new("a").on_next(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let signal = signal.clone();
                async move {
                    signal.notified().await;
                    Ok(true)
                }
            }))
            .step(FnStep::new("b"))
            .build()
            .expect("valid workflow");

        let mut first = task::spawn(controller.next());
        assert_pending!(first.poll());
        assert!(controller.is_transitioning());

        let mut second = task::spawn(controller.next());
        assert_ready_eq!(second.poll(), NextOutcome::Busy);
        assert_eq!(guard_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            controller.back(),
            Err(WorkflowError::TransitionInProgress)
        ));
        assert!(matches!(
            controller.go_to("b"),
            Err(WorkflowError::TransitionInProgress)
        ));
        assert!(matches!(
            controller.reset(),
            Err(WorkflowError::TransitionInProgress)
        ));
        assert!(matches!(
            controller.skip(),
            Err(WorkflowError::TransitionInProgress)
        ));
        assert_eq!(controller.step(), 0);

        release.notify_one();
        assert!(first.is_woken());
        assert_ready_eq!(first.poll(), NextOutcome::Advanced { from: 0, to: 1 });
        assert!(!controller.is_transitioning());
        assert_eq!(guard_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_guard_cannot_jump_during_next() {
        let slot = Slot::default();
        let log = Log::default();
        let (controller_ref, attempts) = (slot.clone(), log.clone());

        let controller = Arc::new(
            WorkflowController::builder()
                .step(FnStep::new("a").on_next_sync(move || {
                    if let Some(controller) = controller_ref.get().and_then(Weak::upgrade) {
                        let result = controller.go_to(2_usize);
                        attempts.lock().expect("log").push(format!("{:?}", result));
                    }
                    Ok(true)
                }))
                .step(FnStep::new("b"))
                .step(FnStep::new("c"))
                .build()
                .expect("valid workflow"),
        );
        slot.set(Arc::downgrade(&controller)).expect("slot is empty");

        assert_eq!(
            controller.next().await,
            NextOutcome::Advanced { from: 0, to: 1 }
        );
        assert_eq!(events(&log), vec!["Err(TransitionInProgress)"]);
        assert_eq!(controller.step_id(), "b");
        assert_eq!(controller.previous_step(), Some(0));
        assert!(!controller.is_transitioning());
    }

    #[test]
    fn test_hooks_cannot_navigate_during_go_to() {
        let slot = Slot::default();
        let log = Log::default();
        let (controller_ref, attempts) = (slot.clone(), log.clone());

        let controller = Arc::new(
            WorkflowController::builder()
                .step(FnStep::new("a"))
                .step(FnStep::new("b").on_enter(move || {
                    if let Some(controller) = controller_ref.get().and_then(Weak::upgrade) {
                        assert!(controller.is_transitioning());
                        let next = tokio_test::block_on(controller.next());
                        let back = controller.back();
                        let mut attempts = attempts.lock().expect("log");
                        attempts.push(format!("{:?}", next));
                        attempts.push(format!("{:?}", back));
                    }
                    Ok(())
                }))
                .step(FnStep::new("c"))
                .build()
                .expect("valid workflow"),
        );
        slot.set(Arc::downgrade(&controller)).expect("slot is empty");

        assert_eq!(
            controller.go_to("b").expect("go_to"),
            Navigation::Moved { from: 0, to: 1 }
        );
        assert_eq!(events(&log), vec!["Busy", "Err(TransitionInProgress)"]);
        assert_eq!(controller.step(), 1);
        assert!(!controller.is_transitioning());

        assert_eq!(
            controller.back().expect("back"),
            Navigation::Moved { from: 1, to: 0 }
        );
    }

    #[test]
    fn test_dropped_next_releases_lock() {
        let controller = WorkflowController::builder()
            .step(
                FnStep::new("a")
                    .on_next(|| std::future::pending::<Result<bool, WorkflowError>>()),
            )
            .step(FnStep::new("b"))
            .build()
            .expect("valid workflow");

        let mut pending = task::spawn(controller.next());
        assert_pending!(pending.poll());
        assert!(controller.is_transitioning());

        drop(pending);
        assert!(!controller.is_transitioning());
        assert_eq!(controller.step(), 0);
    }

    #[tokio::test]
    async fn test_guard_error_blocks_and_reports() {
        let reported = Arc::new(AtomicU32::new(0));
        let counter = reported.clone();
        let controller = WorkflowController::builder()
            .step(FnStep::new("a").on_next_sync(|| Err(failing("a"))))
            .step(FnStep::new("b"))
            .on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .expect("valid workflow");

        assert_eq!(controller.next().await, NextOutcome::Blocked);
        assert_eq!(controller.step(), 0);
        assert!(!controller.is_transitioning());
        assert_eq!(reported.load(Ordering::SeqCst), 1);

        let errors = controller.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            WorkflowError::GuardFailure { step_id, .. } if step_id.as_str() == "a"
        ));
        assert!(controller.take_errors().is_empty());
    }

    #[tokio::test]
    async fn test_guard_timeout_blocks() {
        let controller = WorkflowController::builder()
            .step(
                FnStep::new("slow")
                    .on_next(|| async {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        Ok(true)
                    })
                    .guard_timeout(Duration::from_millis(20)),
            )
            .step(FnStep::new("b"))
            .build()
            .expect("valid workflow");

        assert_eq!(controller.next().await, NextOutcome::Blocked);
        assert_eq!(controller.step(), 0);
        assert!(!controller.is_transitioning());

        let errors = controller.take_errors();
        assert!(matches!(
            &errors[..],
            [WorkflowError::GuardTimeout { step_id, timeout }]
                if step_id.as_str() == "slow" && *timeout == Duration::from_millis(20)
        ));
    }

    #[tokio::test]
    async fn test_hook_failures_do_not_roll_back() {
        let controller = WorkflowController::builder()
            .step(FnStep::new("a").on_exit(|| Err(failing("a"))))
            .step(FnStep::new("b").on_enter(|| Err(failing("b"))))
            .on_finish(|| Err(failing("b")))
            .build()
            .expect("valid workflow");

        assert_eq!(
            controller.next().await,
            NextOutcome::Advanced { from: 0, to: 1 }
        );
        assert_eq!(controller.next().await, NextOutcome::Finished);
        assert_eq!(controller.step(), 1);

        let hooks: Vec<HookType> = controller
            .take_errors()
            .into_iter()
            .filter_map(|e| match e {
                WorkflowError::HookError { hook_type, .. } => Some(hook_type),
                _ => None,
            })
            .collect();
        assert_eq!(
            hooks,
            vec![HookType::OnExit, HookType::OnEnter, HookType::OnFinish]
        );
    }

    #[tokio::test]
    async fn test_finish_runs_on_every_terminal_call() {
        let finished = Arc::new(AtomicU32::new(0));
        let counter = finished.clone();
        let controller = WorkflowController::builder()
            .step(FnStep::new("a"))
            .step(FnStep::new("b"))
            .on_finish(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .expect("valid workflow");

        assert!(controller.next().await.is_advanced());
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(controller.next().await, NextOutcome::Finished);
        assert_eq!(controller.next().await, NextOutcome::Finished);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(controller.step(), 1);
    }

    #[test]
    fn test_back() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .initial_step(1)
            .build()
            .expect("valid workflow");
        events(&log);

        assert_eq!(
            controller.back().expect("back"),
            Navigation::Moved { from: 1, to: 0 }
        );
        assert_eq!(events(&log), vec!["exit:b", "enter:a"]);

        assert_eq!(controller.back().expect("back"), Navigation::Unchanged);
        assert!(events(&log).is_empty());
        assert!(!controller.can_back());
    }

    #[test]
    fn test_go_to_out_of_range_is_noop() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .build()
            .expect("valid workflow");
        events(&log);

        assert_eq!(controller.go_to(2_usize).expect("go_to"), Navigation::Unchanged);
        assert_eq!(controller.go_to("zzz").expect("go_to"), Navigation::Unchanged);
        assert_eq!(controller.go_to(0_usize).expect("go_to"), Navigation::Unchanged);
        assert_eq!(controller.step(), 0);
        assert!(!controller.is_transitioning());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_strict_navigation_errors() {
        let controller = WorkflowController::builder()
            .step(FnStep::new("a"))
            .step(FnStep::new("b"))
            .strict(true)
            .build()
            .expect("valid workflow");

        assert!(matches!(
            controller.go_to(5_usize),
            Err(WorkflowError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(matches!(
            controller.go_to("zzz"),
            Err(WorkflowError::StepNotFound(id)) if id.as_str() == "zzz"
        ));
        assert!(matches!(
            controller.skip(),
            Err(WorkflowError::NotOptional(id)) if id.as_str() == "a"
        ));
        assert_eq!(controller.step(), 0);
    }

    #[test]
    fn test_reset_at_initial_is_noop() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .build()
            .expect("valid workflow");
        events(&log);

        assert_eq!(controller.reset().expect("reset"), Navigation::Unchanged);
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_skip_optional_step() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log).optional(true).on_next_sync(|| Ok(false)))
            .step(tracked("b", &log))
            .step(tracked("c", &log).optional(true))
            .build()
            .expect("valid workflow");
        events(&log);

        assert_eq!(
            controller.skip().expect("skip"),
            NextOutcome::Advanced { from: 0, to: 1 }
        );
        assert_eq!(events(&log), vec!["exit:a", "enter:b"]);

        assert_eq!(controller.skip().expect("skip"), NextOutcome::Blocked);
        assert_eq!(controller.step(), 1);

        controller.go_to("c").expect("go_to");
        events(&log);
        assert_eq!(controller.skip().expect("skip"), NextOutcome::Finished);
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_drop_exits_current_step() {
        let log = Log::default();
        let controller = WorkflowController::builder()
            .step(tracked("a", &log))
            .step(tracked("b", &log))
            .build()
            .expect("valid workflow");
        controller.go_to("b").expect("go_to");
        events(&log);

        drop(controller);
        assert_eq!(events(&log), vec!["exit:b"]);
    }

    #[test]
    fn test_status_snapshot() {
        let controller = WorkflowController::builder()
            .step(FnStep::new("a"))
            .step(FnStep::new("b"))
            .step(FnStep::new("c"))
            .initial_step(1)
            .build()
            .expect("valid workflow");

        let status = controller.status();
        assert_eq!(
            status,
            WorkflowStatus {
                step: 1,
                step_id: "b".to_string(),
                total_steps: 3,
                is_first: false,
                is_last: false,
                can_next: true,
                can_back: true,
                is_transitioning: false,
            }
        );

        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["step_id"], "b");
        assert_eq!(json["can_next"], true);
    }
}
