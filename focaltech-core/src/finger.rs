//! Finger presence / lift polling
//!
//! Both pollers are the same two-state machine:
//!
//! ```text
//! START ──(poll delay)──▶ WAIT ──write 0x80 02, read 7──┐
//!                          ▲                            │ flag matches target → complete
//!                          └────(poll delay)────────────┘ otherwise
//! ```
//!
//! Byte 4 of the response is the presence flag. A response too short to
//! carry it never matches, so the loop simply polls again.

use tracing::debug;

use crate::command::Command;
use crate::constants::{Endpoints, Timing, FINGER_FLAG_INDEX, FINGER_PRESENT};
use crate::exchange::{Exchange, Progress};
use crate::ssm::{Machine, MachineState, Step};
use crate::transfer::{Completion, TransferResult};

/// Finger condition a poller waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerTarget {
    /// Finger placed on the sensor
    Present,

    /// Finger lifted off the sensor
    Absent,
}

impl FingerTarget {
    /// Check a poll response against the target
    pub fn is_met(self, response: &Completion) -> bool {
        match (self, response.byte(FINGER_FLAG_INDEX)) {
            (Self::Present, Some(flag)) => flag == FINGER_PRESENT,
            (Self::Absent, Some(flag)) => flag != FINGER_PRESENT,
            (_, None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerState {
    Start,
    Wait,
}

impl MachineState for FingerState {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Start),
            1 => Some(Self::Wait),
            _ => None,
        }
    }
}

/// Finger poller; output is the number of polls it took
#[derive(Debug, Clone)]
pub struct FingerPoll {
    target: FingerTarget,
    timing: Timing,
    exchange: Exchange,
    polls: usize,
}

impl FingerPoll {
    pub fn new(target: FingerTarget, endpoints: Endpoints, timing: Timing) -> Self {
        Self {
            target,
            timing,
            exchange: Exchange::new(endpoints, timing),
            polls: 0,
        }
    }

    /// Poller completing once a finger is on the sensor
    pub fn presence(endpoints: Endpoints, timing: Timing) -> Self {
        Self::new(FingerTarget::Present, endpoints, timing)
    }

    /// Poller completing once the finger is lifted
    pub fn lift(endpoints: Endpoints, timing: Timing) -> Self {
        Self::new(FingerTarget::Absent, endpoints, timing)
    }

    pub fn target(&self) -> FingerTarget {
        self.target
    }

    /// Completed poll exchanges so far
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Machine for FingerPoll {
    type State = FingerState;
    type Output = usize;

    const NAME: &'static str = "finger-poll";

    fn run_state(&mut self, state: FingerState) -> Step<FingerState, usize> {
        match state {
            FingerState::Start => Step::NextDelayed(self.timing.poll_delay),
            FingerState::Wait => match self.exchange.begin(&Command::WAIT_FINGER) {
                Ok(transfer) => Step::Submit(transfer),
                Err(e) => Step::Fail(e),
            },
        }
    }

    fn transfer_complete(
        &mut self,
        _state: FingerState,
        result: TransferResult,
    ) -> Step<FingerState, usize> {
        match self.exchange.complete(result) {
            Err(e) => Step::Fail(e),
            Ok(Progress::Read(transfer)) => Step::Submit(transfer),
            Ok(Progress::Response(response)) => {
                self.polls += 1;

                if self.target.is_met(&response) {
                    debug!(target_state = ?self.target, polls = self.polls, "Finger condition met");
                    Step::Complete(self.polls)
                } else {
                    Step::JumpDelayed(FingerState::Wait, self.timing.poll_delay)
                }
            }
        }
    }
}
