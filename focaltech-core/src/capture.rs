//! Image capture sequence
//!
//! ```text
//! START → STATUS_CHECK → PREPARE_SENSOR → TRIGGER → REQUEST_IMAGE ⇒ complete
//!                                                   (PROCESS_IMAGE, DONE)
//! ```
//!
//! Every I/O state is one command exchange. REQUEST_IMAGE reads the raw
//! 10246-byte sensor dump, rebuilds the image and completes right there.
//! PROCESS_IMAGE and DONE are never entered in normal flow; entering either
//! completes with whatever raw data is held.

use bytes::Bytes;
use tracing::info;

use crate::command::Command;
use crate::constants::{Endpoints, Timing};
use crate::exchange::{Exchange, Progress};
use crate::image::Image;
use crate::ssm::{Machine, MachineState, Step};
use crate::transfer::TransferResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Start,
    StatusCheck,
    PrepareSensor,
    Trigger,
    RequestImage,
    ProcessImage,
    Done,
}

impl CaptureState {
    const ALL: [Self; 7] = [
        Self::Start,
        Self::StatusCheck,
        Self::PrepareSensor,
        Self::Trigger,
        Self::RequestImage,
        Self::ProcessImage,
        Self::Done,
    ];

    /// Command issued by this state, if any
    pub fn command(self) -> Option<Command> {
        match self {
            Self::StatusCheck => Some(Command::STATUS_CHECK),
            Self::PrepareSensor => Some(Command::PREPARE_SENSOR),
            Self::Trigger => Some(Command::TRIGGER_CAPTURE),
            Self::RequestImage => Some(Command::REQUEST_IMAGE),
            Self::Start | Self::ProcessImage | Self::Done => None,
        }
    }
}

impl MachineState for CaptureState {
    const COUNT: usize = 7;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One-shot image capture
#[derive(Debug, Clone)]
pub struct Capture {
    exchange: Exchange,
    raw: Bytes,
}

impl Capture {
    pub fn new(endpoints: Endpoints, timing: Timing) -> Self {
        Self {
            exchange: Exchange::new(endpoints, timing),
            raw: Bytes::new(),
        }
    }

    /// Raw image response received so far
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

impl Machine for Capture {
    type State = CaptureState;
    type Output = Image;

    const NAME: &'static str = "capture";

    fn run_state(&mut self, state: CaptureState) -> Step<CaptureState, Image> {
        match state.command() {
            Some(command) => match self.exchange.begin(&command) {
                Ok(transfer) => Step::Submit(transfer),
                Err(e) => Step::Fail(e),
            },
            None if state == CaptureState::Start => Step::Next,
            None => Step::Complete(Image::reconstruct(&self.raw)),
        }
    }

    fn transfer_complete(
        &mut self,
        state: CaptureState,
        result: TransferResult,
    ) -> Step<CaptureState, Image> {
        match self.exchange.complete(result) {
            Err(e) => Step::Fail(e),
            Ok(Progress::Read(transfer)) => Step::Submit(transfer),
            Ok(Progress::Response(response)) if state == CaptureState::RequestImage => {
                info!(bytes = response.actual_length, "Image data received");
                self.raw = response.data;
                Step::Complete(Image::reconstruct(&self.raw))
            }
            Ok(Progress::Response(_)) => Step::Next,
        }
    }
}
