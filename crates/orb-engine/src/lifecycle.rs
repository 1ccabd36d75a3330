//! Lifecycle state machine: `NotStarted -> Starting -> Started -> Stopped`
//! (terminal), as a single atomic word (spec.md §4.1, §5).

use std::sync::atomic::{AtomicU8, Ordering};

const NOT_STARTED: u8 = 0;
const STARTING: u8 = 1;
const STARTED: u8 = 2;
const STOPPED: u8 = 3;

/// The lifecycle state of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed but not yet started.
    NotStarted,
    /// `start()` is in progress.
    Starting,
    /// Accepting dispatches.
    Started,
    /// Terminal: subscriber channels closed, dispatch refused.
    Stopped,
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            NOT_STARTED => LifecycleState::NotStarted,
            STARTING => LifecycleState::Starting,
            STARTED => LifecycleState::Started,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Compare-and-swap-driven lifecycle word.
///
/// Mirrors `toka-kernel`'s preference for a single atomic guarding
/// deterministic state transitions rather than an async mutex: lifecycle
/// changes are rare and must be observably instantaneous to concurrent
/// dispatchers.
#[derive(Debug, Default)]
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    /// Construct a new lifecycle in the `NotStarted` state.
    pub fn new() -> Self {
        Self(AtomicU8::new(NOT_STARTED))
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.0.load(Ordering::SeqCst).into()
    }

    /// Transition `NotStarted -> Starting -> Started`. Idempotent once
    /// `Started` or beyond is reached (spec.md §4.1: "Start/Stop are
    /// idempotent after reaching their target state").
    pub fn start(&self) {
        if self
            .0
            .compare_exchange(NOT_STARTED, STARTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.0.store(STARTED, Ordering::SeqCst);
        }
    }

    /// Transition to `Stopped`. Idempotent once already `Stopped`.
    pub fn stop(&self) {
        self.0.store(STOPPED, Ordering::SeqCst);
    }

    /// True once `Started` and not yet `Stopped` - the only state in which
    /// dispatch is accepted.
    pub fn is_accepting_dispatch(&self) -> bool {
        self.state() == LifecycleState::Started
    }
}
