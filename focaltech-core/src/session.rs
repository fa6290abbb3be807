//! Device session
//!
//! A session represents one open device and tracks:
//! - Bulk endpoint pair (fixed at construction)
//! - Lifecycle state (closed / open / active)
//! - Scan phase (which state machine, if any, owns the endpoints)

use std::sync::Arc;

use crate::constants::Endpoints;
use crate::error::{Error, Result};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Interface not claimed
    Closed,

    /// Interface claimed, not scanning
    Open,

    /// Activated; scans may run
    Active,
}

/// Scan phase; each phase but `Idle` has exactly one machine running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    AwaitingFinger,
    Capturing,
    AwaitingLift,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally), so the host can
/// observe the phase while a scan task owns the controller.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    endpoints: Endpoints,

    state: parking_lot::RwLock<SessionState>,

    /// Written only by the controller at machine hand-off
    phase: parking_lot::RwLock<ScanPhase>,
}

impl Session {
    /// Create a new closed session
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                endpoints,
                state: parking_lot::RwLock::new(SessionState::Closed),
                phase: parking_lot::RwLock::new(ScanPhase::Idle),
            }),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        self.inner.endpoints
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Get current scan phase
    pub fn phase(&self) -> ScanPhase {
        *self.inner.phase.read()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state(), SessionState::Closed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Active)
    }

    /// Closed → Open
    pub fn open(&self) -> Result<()> {
        self.transition(SessionState::Closed, SessionState::Open, "open")
    }

    /// Open → Active
    pub fn activate(&self) -> Result<()> {
        self.transition(SessionState::Open, SessionState::Active, "activate")
    }

    /// Active → Open; the scan phase returns to idle
    pub fn deactivate(&self) -> Result<()> {
        self.transition(SessionState::Active, SessionState::Open, "deactivate")?;
        self.set_phase(ScanPhase::Idle);
        Ok(())
    }

    /// Close session from any state
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Closed;
        self.set_phase(ScanPhase::Idle);
    }

    pub(crate) fn set_phase(&self, phase: ScanPhase) {
        *self.inner.phase.write() = phase;
    }

    fn transition(&self, from: SessionState, to: SessionState, action: &str) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != from {
            return Err(Error::InvalidSessionState(format!(
                "Cannot {} from state: {:?}",
                action, *state
            )));
        }

        *state = to;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Endpoints::default())
    }
}
