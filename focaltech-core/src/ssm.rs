//! Sequential state machine engine
//!
//! A machine is a set of ordered states and a handler per state. Handlers
//! never perform I/O themselves: they return a [`Step`] telling the engine
//! what to do next, and the engine turns that into an [`Effect`] for the
//! caller (submit a transfer, start a timer, or report a terminal outcome).
//! The caller feeds back an [`Event`] when the transfer completes or the
//! timer fires.
//!
//! ```text
//!          start()                    handle(Event)
//!   ┌──────────────┐   Effect   ┌──────────────────────┐
//!   │ run_state(0) │ ─────────▶ │ caller does the I/O  │
//!   └──────────────┘            └──────────┬───────────┘
//!          ▲                               │ Event
//!          └───────────────────────────────┘
//! ```
//!
//! Once a machine completes or fails it never runs another handler; any
//! further event is rejected with [`Error::MachineFinished`].

use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transfer::{Transfer, TransferResult};

/// A state of a sequential machine
///
/// States are identified by a 0-based index; `next` follows index order.
pub trait MachineState: Copy + Eq + fmt::Debug {
    /// Number of states
    const COUNT: usize;

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    /// First state
    fn initial() -> Self {
        match Self::from_index(0) {
            Some(state) => state,
            None => unreachable!("state machine without states"),
        }
    }

    /// Next state in index order, `None` past the last one
    fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

/// What a state handler asks the engine to do
#[derive(Debug)]
pub enum Step<S, O> {
    /// Submit a transfer and suspend until it completes
    Submit(Transfer),

    /// Move to the next state
    Next,

    /// Move to the next state once `Duration` has elapsed
    NextDelayed(Duration),

    /// Move to an arbitrary state
    Jump(S),

    /// Move to an arbitrary state once `Duration` has elapsed
    JumpDelayed(S, Duration),

    /// Terminal success
    Complete(O),

    /// Terminal failure
    Fail(Error),
}

/// A concrete state machine: per-state handlers plus a transfer handler
pub trait Machine {
    type State: MachineState;
    type Output;

    /// Name used in logs and errors
    const NAME: &'static str;

    /// Handler invoked on entering `state`
    fn run_state(&mut self, state: Self::State) -> Step<Self::State, Self::Output>;

    /// Handler invoked when a transfer submitted from `state` completes
    fn transfer_complete(
        &mut self,
        state: Self::State,
        result: TransferResult,
    ) -> Step<Self::State, Self::Output>;
}

/// Input to a running machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The outstanding transfer finished
    TransferComplete(TransferResult),

    /// The outstanding timer fired
    TimerExpired,
}

/// Work the caller must carry out for a machine
#[derive(Debug)]
pub enum Effect<O> {
    /// Perform this transfer, then deliver [`Event::TransferComplete`]
    Submit(Transfer),

    /// Wait this long, then deliver [`Event::TimerExpired`]
    StartTimer(Duration),

    /// Machine completed
    Completed(O),

    /// Machine failed
    Failed(Error),
}

/// Terminal outcome of a machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait<S> {
    NotStarted,
    Transfer,
    Timer(S),
    Finished,
}

/// Engine driving one [`Machine`]
pub struct Ssm<M: Machine> {
    machine: M,
    state: M::State,
    wait: Wait<M::State>,
    outcome: Option<Outcome>,
}

impl<M: Machine> Ssm<M> {
    pub fn new(machine: M) -> Self {
        Self {
            machine,
            state: M::State::initial(),
            wait: Wait::NotStarted,
            outcome: None,
        }
    }

    /// Current state
    pub fn state(&self) -> M::State {
        self.state
    }

    /// Terminal outcome, if reached
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.wait == Wait::Finished
    }

    /// Waiting on a transfer completion
    pub fn is_awaiting_transfer(&self) -> bool {
        self.wait == Wait::Transfer
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Enter the first state
    pub fn start(&mut self) -> Result<Effect<M::Output>> {
        if self.wait != Wait::NotStarted {
            return Err(Error::InvalidMachineState(format!(
                "{} already started",
                M::NAME
            )));
        }

        debug!(machine = M::NAME, "Starting state machine");

        let state = M::State::initial();
        let step = self.enter(state);
        Ok(self.apply(step))
    }

    /// Deliver an event to the machine
    pub fn handle(&mut self, event: Event) -> Result<Effect<M::Output>> {
        let step = match (self.wait, event) {
            (Wait::Finished, _) => return Err(Error::MachineFinished(M::NAME)),
            (Wait::Transfer, Event::TransferComplete(result)) => {
                trace!(
                    machine = M::NAME,
                    state = ?self.state,
                    ok = result.is_ok(),
                    "Transfer complete"
                );
                self.machine.transfer_complete(self.state, result)
            }
            (Wait::Timer(target), Event::TimerExpired) => self.enter(target),
            (wait, event) => {
                return Err(Error::InvalidMachineState(format!(
                    "{} in {:?} cannot accept {:?} while waiting for {:?}",
                    M::NAME,
                    self.state,
                    event,
                    wait
                )));
            }
        };

        Ok(self.apply(step))
    }

    fn enter(&mut self, state: M::State) -> Step<M::State, M::Output> {
        debug!(machine = M::NAME, from = ?self.state, to = ?state, "State transition");
        self.state = state;
        self.machine.run_state(state)
    }

    /// Follow immediate transitions until the machine suspends or terminates
    fn apply(&mut self, mut step: Step<M::State, M::Output>) -> Effect<M::Output> {
        loop {
            step = match step {
                Step::Submit(transfer) => {
                    self.wait = Wait::Transfer;
                    return Effect::Submit(transfer);
                }
                Step::Next => match self.state.next() {
                    Some(next) => self.enter(next),
                    None => Step::Fail(self.past_end()),
                },
                Step::NextDelayed(delay) => match self.state.next() {
                    Some(next) => {
                        self.wait = Wait::Timer(next);
                        return Effect::StartTimer(delay);
                    }
                    None => Step::Fail(self.past_end()),
                },
                Step::Jump(target) => self.enter(target),
                Step::JumpDelayed(target, delay) => {
                    self.wait = Wait::Timer(target);
                    return Effect::StartTimer(delay);
                }
                Step::Complete(output) => {
                    debug!(machine = M::NAME, state = ?self.state, "State machine completed");
                    self.wait = Wait::Finished;
                    self.outcome = Some(Outcome::Completed);
                    return Effect::Completed(output);
                }
                Step::Fail(error) => {
                    debug!(machine = M::NAME, state = ?self.state, %error, "State machine failed");
                    self.wait = Wait::Finished;
                    self.outcome = Some(Outcome::Failed(error.clone()));
                    return Effect::Failed(error);
                }
            };
        }
    }

    fn past_end(&self) -> Error {
        Error::InvalidMachineState(format!(
            "{} advanced past its last state {:?} (of {})",
            M::NAME,
            self.state,
            M::State::COUNT
        ))
    }
}

impl<M: Machine> fmt::Debug for Ssm<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ssm")
            .field("machine", &M::NAME)
            .field("state", &self.state)
            .field("wait", &self.wait)
            .field("outcome", &self.outcome)
            .finish()
    }
}
