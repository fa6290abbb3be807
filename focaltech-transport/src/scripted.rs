//! Scripted transport
//!
//! Replays queued responses for reads, accepts every write and records
//! every submitted transfer. Clones share the same script, so a test can
//! keep one handle for inspection while the device owns another.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use focaltech_core::{
    Completion, Frame, Result as CoreResult, Transfer, TransferError, TransferResult,
};
use parking_lot::Mutex;
use tracing::trace;

use crate::{error::*, Transport};

#[derive(Debug, Default)]
struct Script {
    open: bool,
    responses: VecDeque<TransferResult>,
    failures: Vec<(usize, TransferError)>,
    log: Vec<Transfer>,
}

/// In-memory transport driven by a script
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data for the next unanswered read
    pub fn push_response(&self, data: impl Into<Bytes>) -> &Self {
        self.inner.lock().responses.push_back(Ok(Completion::read(data)));
        self
    }

    /// Queue a failure for the next unanswered read
    pub fn push_read_error(&self, error: TransferError) -> &Self {
        self.inner.lock().responses.push_back(Err(error));
        self
    }

    /// Fail the `n`th submitted transfer (1-based, reads and writes counted)
    pub fn fail_transfer(&self, n: usize, error: TransferError) -> &Self {
        self.inner.lock().failures.push((n, error));
        self
    }

    /// Every transfer submitted so far
    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner.lock().log.clone()
    }

    /// Decoded command frames written so far
    pub fn written_frames(&self) -> CoreResult<Vec<Frame>> {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|t| t.is_out())
            .map(|t| Frame::decode(&t.data))
            .collect()
    }

    /// Queued read responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.inner.lock().responses.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&mut self) -> Result<()> {
        let mut script = self.inner.lock();
        if script.open {
            return Err(Error::AlreadyOpen);
        }
        script.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.lock().open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    async fn submit(&mut self, transfer: &Transfer) -> TransferResult {
        let mut script = self.inner.lock();
        if !script.open {
            return Err(TransferError::NoDevice);
        }

        script.log.push(transfer.clone());
        let n = script.log.len();

        trace!("Scripted transfer #{}: {:?}", n, transfer);

        if let Some(index) = script.failures.iter().position(|(at, _)| *at == n) {
            let (_, error) = script.failures.remove(index);
            return Err(error);
        }

        if transfer.is_out() {
            return Ok(Completion::written(transfer.length));
        }

        // An exhausted script behaves like a silent device
        let mut result = script.responses.pop_front().unwrap_or(Err(TransferError::Timeout))?;
        if result.data.len() > transfer.length {
            return Err(TransferError::Overflow);
        }
        result.actual_length = result.data.len();
        Ok(result)
    }

    fn description(&self) -> String {
        "scripted".into()
    }
}
