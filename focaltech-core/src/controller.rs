//! Scan controller
//!
//! Hands the endpoints from one state machine to the next:
//!
//! ```text
//! Idle ──await_finger──▶ AwaitingFinger ──finger on──▶ Capturing
//!  ▲                                                       │ image
//!  └────────────── finger off ────── AwaitingLift ◀────────┘
//! ```
//!
//! Any machine failure reports a session error and drops back to Idle.
//! The controller performs no I/O; every call returns the [`Action`]s the
//! caller must carry out, in order.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::Capture;
use crate::constants::Timing;
use crate::error::{Error, Result};
use crate::finger::FingerPoll;
use crate::image::Image;
use crate::session::{ScanPhase, Session};
use crate::ssm::{Effect, Event, Ssm};
use crate::transfer::Transfer;

/// Result reported to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// `true` once a finger is detected, `false` once it is lifted
    FingerStatus(bool),

    ImageCaptured(Image),

    /// A machine failed; the scan attempt is over
    SessionError(Error),
}

/// Work the caller must carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Perform the transfer, then call [`Controller::handle`] with its result
    Submit(Transfer),

    /// Sleep, then call [`Controller::handle`] with [`Event::TimerExpired`]
    StartTimer(Duration),

    /// Deliver to the host
    Report(Report),
}

/// The machine currently owning the endpoints
#[derive(Debug)]
enum Active {
    FingerOn(Ssm<FingerPoll>),
    Capture(Ssm<Capture>),
    FingerOff(Ssm<FingerPoll>),
}

enum Drive {
    Pending(Action),
    FingerOn(usize),
    Captured(Image),
    FingerOff(usize),
    Failed(Error),
}

impl Drive {
    fn from_effect<O>(effect: Effect<O>, done: impl FnOnce(O) -> Drive) -> Self {
        match effect {
            Effect::Submit(transfer) => Self::Pending(Action::Submit(transfer)),
            Effect::StartTimer(delay) => Self::Pending(Action::StartTimer(delay)),
            Effect::Completed(output) => done(output),
            Effect::Failed(error) => Self::Failed(error),
        }
    }
}

impl Active {
    fn phase(&self) -> ScanPhase {
        match self {
            Self::FingerOn(_) => ScanPhase::AwaitingFinger,
            Self::Capture(_) => ScanPhase::Capturing,
            Self::FingerOff(_) => ScanPhase::AwaitingLift,
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Self::FingerOn(ssm) | Self::FingerOff(ssm) => ssm.is_finished(),
            Self::Capture(ssm) => ssm.is_finished(),
        }
    }

    fn start(&mut self) -> Result<Drive> {
        Ok(match self {
            Self::FingerOn(ssm) => Drive::from_effect(ssm.start()?, Drive::FingerOn),
            Self::Capture(ssm) => Drive::from_effect(ssm.start()?, Drive::Captured),
            Self::FingerOff(ssm) => Drive::from_effect(ssm.start()?, Drive::FingerOff),
        })
    }

    fn handle(&mut self, event: Event) -> Result<Drive> {
        Ok(match self {
            Self::FingerOn(ssm) => Drive::from_effect(ssm.handle(event)?, Drive::FingerOn),
            Self::Capture(ssm) => Drive::from_effect(ssm.handle(event)?, Drive::Captured),
            Self::FingerOff(ssm) => Drive::from_effect(ssm.handle(event)?, Drive::FingerOff),
        })
    }
}

/// Scan controller for one device session
#[derive(Debug)]
pub struct Controller {
    session: Session,
    timing: Timing,
    active: Option<Active>,
}

impl Controller {
    pub fn new(session: Session, timing: Timing) -> Self {
        Self {
            session,
            timing,
            active: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> ScanPhase {
        self.session.phase()
    }

    /// Start waiting for a finger
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionState`] unless the session is active
    /// and no scan is running.
    pub fn await_finger(&mut self) -> Result<Vec<Action>> {
        if !self.session.is_active() {
            return Err(Error::InvalidSessionState(format!(
                "Cannot await finger from state: {:?}",
                self.session.state()
            )));
        }
        if self.phase() != ScanPhase::Idle {
            return Err(Error::InvalidSessionState(format!(
                "Cannot await finger while {:?}",
                self.phase()
            )));
        }

        info!("Waiting for finger");

        let endpoints = self.session.endpoints();
        let drive = self.hand_off(Active::FingerOn(Ssm::new(FingerPoll::presence(
            endpoints,
            self.timing,
        ))))?;

        let mut actions = Vec::new();
        self.process(drive, &mut actions)?;
        Ok(actions)
    }

    /// Deliver a transfer completion or timer expiry to the running machine
    pub fn handle(&mut self, event: Event) -> Result<Vec<Action>> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| Error::InvalidSessionState("No scan in progress".into()))?;

        let drive = active.handle(event)?;

        let mut actions = Vec::new();
        self.process(drive, &mut actions)?;
        Ok(actions)
    }

    /// Abandon the running machine, if any, and return to idle
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(phase = ?active.phase(), "Discarding running state machine");
        }
        self.session.set_phase(ScanPhase::Idle);
    }

    fn process(&mut self, mut drive: Drive, actions: &mut Vec<Action>) -> Result<()> {
        let endpoints = self.session.endpoints();

        loop {
            drive = match drive {
                Drive::Pending(action) => {
                    actions.push(action);
                    return Ok(());
                }
                Drive::Failed(error) => {
                    warn!(phase = ?self.phase(), %error, "Scan failed");
                    actions.push(Action::Report(Report::SessionError(error)));
                    self.finish();
                    return Ok(());
                }
                Drive::FingerOn(polls) => {
                    info!(polls, "Finger detected");
                    actions.push(Action::Report(Report::FingerStatus(true)));
                    self.hand_off(Active::Capture(Ssm::new(Capture::new(endpoints, self.timing))))?
                }
                Drive::Captured(image) => {
                    info!("Image captured");
                    actions.push(Action::Report(Report::ImageCaptured(image)));
                    self.hand_off(Active::FingerOff(Ssm::new(FingerPoll::lift(
                        endpoints,
                        self.timing,
                    ))))?
                }
                Drive::FingerOff(polls) => {
                    info!(polls, "Finger removed");
                    actions.push(Action::Report(Report::FingerStatus(false)));
                    self.finish();
                    return Ok(());
                }
            };
        }
    }

    /// Replace the active machine; the previous one must have terminated
    fn hand_off(&mut self, mut next: Active) -> Result<Drive> {
        if let Some(previous) = &self.active {
            if !previous.is_finished() {
                return Err(Error::InvalidSessionState(format!(
                    "Cannot start {:?} while {:?} is still running",
                    next.phase(),
                    previous.phase()
                )));
            }
        }

        debug!(phase = ?next.phase(), "Handing off endpoints");

        let drive = next.start()?;
        self.session.set_phase(next.phase());
        self.active = Some(next);
        Ok(drive)
    }

    fn finish(&mut self) {
        self.active = None;
        self.session.set_phase(ScanPhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Opcode};
    use crate::constants::IMAGE_DATA_LENGTH;
    use crate::frame::Frame;
    use crate::transfer::{Completion, TransferError, TransferResult};
    use pretty_assertions::assert_eq;

    fn active_controller() -> Controller {
        let session = Session::default();
        session.open().unwrap();
        session.activate().unwrap();
        Controller::new(session, Timing::default())
    }

    /// Scripted device: answers poll reads from `polls`, image reads with `raw`
    struct Device {
        polls: Vec<u8>,
        raw: Vec<u8>,
        fail_on_transfer: Option<usize>,
        transfers: usize,
        last_write: Option<Frame>,
    }

    impl Device {
        fn new(polls: Vec<u8>, raw: Vec<u8>, fail_on_transfer: Option<usize>) -> Self {
            Self {
                polls,
                raw,
                fail_on_transfer,
                transfers: 0,
                last_write: None,
            }
        }

        fn reply(&mut self, transfer: &Transfer) -> TransferResult {
            self.transfers += 1;
            if Some(self.transfers) == self.fail_on_transfer {
                return Err(TransferError::Stall);
            }
            if transfer.is_out() {
                self.last_write = Some(Frame::decode(&transfer.data).unwrap());
                return Ok(Completion::written(transfer.length));
            }

            let last = self.last_write.take().expect("read without a preceding write");
            if last == Frame::from_command(&Command::WAIT_FINGER) {
                let flag = self.polls.remove(0);
                Ok(Completion::read(vec![0x02, 0x00, 0x03, 0x80, flag, 0x00, 0x00]))
            } else if last.opcode == Opcode::RequestImage {
                assert_eq!(transfer.length, IMAGE_DATA_LENGTH);
                Ok(Completion::read(self.raw.clone()))
            } else {
                Ok(Completion::read(vec![0; 7]))
            }
        }
    }

    /// Run actions to completion, returning every host report
    fn run(
        controller: &mut Controller,
        device: &mut Device,
        mut actions: Vec<Action>,
    ) -> Vec<Report> {
        let mut reports = Vec::new();

        while !actions.is_empty() {
            let mut next = Vec::new();
            for action in actions {
                match action {
                    Action::Submit(transfer) => {
                        let result = device.reply(&transfer);
                        next.extend(controller.handle(Event::TransferComplete(result)).unwrap());
                    }
                    Action::StartTimer(_) => {
                        next.extend(controller.handle(Event::TimerExpired).unwrap());
                    }
                    Action::Report(report) => reports.push(report),
                }
            }
            actions = next;
        }

        reports
    }

    #[test]
    fn test_await_finger_requires_active_session() {
        let mut controller = Controller::new(Session::default(), Timing::default());
        assert!(matches!(
            controller.await_finger(),
            Err(Error::InvalidSessionState(_))
        ));
    }

    #[test]
    fn test_await_finger_starts_with_debounce_timer() {
        let mut controller = active_controller();
        let actions = controller.await_finger().unwrap();

        assert_eq!(actions, vec![Action::StartTimer(Duration::from_millis(50))]);
        assert_eq!(controller.phase(), ScanPhase::AwaitingFinger);

        // a second trigger while scanning is refused
        assert!(controller.await_finger().is_err());
    }

    #[test]
    fn test_full_scan_reports_in_order() {
        let raw: Vec<u8> = (0..IMAGE_DATA_LENGTH).map(|i| (i % 253) as u8).collect();
        // finger on after 2 misses; during lift: still on twice, then off
        let mut device = Device::new(vec![0, 0, 1, 1, 1, 0], raw.clone(), None);

        let mut controller = active_controller();
        let actions = controller.await_finger().unwrap();
        let reports = run(&mut controller, &mut device, actions);

        assert_eq!(
            reports,
            vec![
                Report::FingerStatus(true),
                Report::ImageCaptured(Image::reconstruct(&raw)),
                Report::FingerStatus(false),
            ]
        );
        assert_eq!(controller.phase(), ScanPhase::Idle);
        // 3 presence polls + 4 capture exchanges + 3 lift polls
        assert_eq!(device.transfers, 2 * (3 + 4 + 3));
        assert!(device.polls.is_empty());
    }

    #[test]
    fn test_failure_reports_session_error_and_idles() {
        // fails the second capture write (prepare sensor)
        let mut device = Device::new(vec![1], vec![], Some(5));

        let mut controller = active_controller();
        let actions = controller.await_finger().unwrap();
        let reports = run(&mut controller, &mut device, actions);

        assert_eq!(
            reports,
            vec![
                Report::FingerStatus(true),
                Report::SessionError(Error::Transfer(TransferError::Stall)),
            ]
        );
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(device.transfers, 5);

        // nothing left to drive
        assert!(controller.handle(Event::TimerExpired).is_err());

        // can be re-triggered
        assert!(controller.await_finger().is_ok());
    }

    #[test]
    fn test_reset_discards_running_machine() {
        let mut controller = active_controller();
        controller.await_finger().unwrap();

        controller.reset();
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert!(controller.handle(Event::TimerExpired).is_err());
    }

    #[test]
    fn test_stray_event_is_rejected_without_side_effects() {
        let mut controller = active_controller();
        controller.await_finger().unwrap();

        // waiting on the debounce timer, not on a transfer
        let stray = Event::TransferComplete(Ok(Completion::read(vec![0; 7])));
        assert!(controller.handle(stray).is_err());
        assert_eq!(controller.phase(), ScanPhase::AwaitingFinger);
    }
}
