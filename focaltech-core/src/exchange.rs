//! Command exchange: one framed write followed by one response read
//!
//! Both halves are transfers submitted through the state machine engine.
//! A failure on either half ends the exchange; there is no partial retry.

use tracing::{trace, warn};

use crate::command::Command;
use crate::constants::{Endpoints, Timing};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::transfer::{Completion, Transfer, TransferResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Idle,
    Writing { frame_len: usize, response_length: usize },
    Reading,
}

/// Progress of an exchange after a transfer completes
#[derive(Debug)]
pub enum Progress {
    /// Write done, submit this read next
    Read(Transfer),

    /// Read done
    Response(Completion),
}

/// Tracks which half of a command exchange is outstanding
#[derive(Debug, Clone)]
pub struct Exchange {
    endpoints: Endpoints,
    timing: Timing,
    half: Half,
    command: Option<Command>,
}

impl Exchange {
    pub fn new(endpoints: Endpoints, timing: Timing) -> Self {
        Self {
            endpoints,
            timing,
            half: Half::Idle,
            command: None,
        }
    }

    /// Frame `command` and return the write transfer
    pub fn begin(&mut self, command: &Command) -> Result<Transfer> {
        let frame = Frame::from_command(command).encode()?;

        trace!(command = %command, frame = %hex::encode(&frame), "Sending command");

        self.half = Half::Writing {
            frame_len: frame.len(),
            response_length: command.response_length,
        };
        self.command = Some(*command);

        Ok(Transfer::bulk_out(
            self.endpoints.bulk_out,
            frame.freeze(),
            self.timing.transfer_timeout,
        ))
    }

    /// Feed a transfer completion into the exchange
    pub fn complete(&mut self, result: TransferResult) -> Result<Progress> {
        let half = self.half;
        let completion = match result {
            Ok(completion) => completion,
            Err(error) => {
                self.half = Half::Idle;
                return Err(error.into());
            }
        };

        match half {
            Half::Writing { frame_len, response_length } => {
                if completion.actual_length != frame_len {
                    warn!(
                        command = ?self.command.map(|c| c.name),
                        written = completion.actual_length,
                        expected = frame_len,
                        "Short command write"
                    );
                }
                self.half = Half::Reading;
                Ok(Progress::Read(Transfer::bulk_in(
                    self.endpoints.bulk_in,
                    response_length,
                    self.timing.transfer_timeout,
                )))
            }
            Half::Reading => {
                trace!(
                    command = ?self.command.map(|c| c.name),
                    received = completion.actual_length,
                    head = %hex::encode(&completion.data[..completion.data.len().min(16)]),
                    "Received response"
                );
                self.half = Half::Idle;
                Ok(Progress::Response(completion))
            }
            Half::Idle => Err(Error::InvalidMachineState(
                "transfer completed with no command exchange in flight".into(),
            )),
        }
    }
}
