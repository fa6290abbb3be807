//! Signals delivered to the host
//!
//! The device never calls back into the host. Everything it has to say,
//! lifecycle acknowledgements and scan results alike, goes down an
//! unbounded channel the host drains at its own pace.

use focaltech_core::{Image, Report};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Signal from a device to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    OpenComplete,
    CloseComplete,
    ActivateComplete,
    DeactivateComplete,

    /// `true` when a finger is placed, `false` when it is lifted
    FingerStatus(bool),

    ImageCaptured(Image),

    /// The current scan attempt failed; the host must start a new one
    SessionError(focaltech_core::Error),
}

impl From<Report> for HostSignal {
    fn from(report: Report) -> Self {
        match report {
            Report::FingerStatus(present) => Self::FingerStatus(present),
            Report::ImageCaptured(image) => Self::ImageCaptured(image),
            Report::SessionError(error) => Self::SessionError(error),
        }
    }
}

/// Receiving end held by the host
pub type HostSignals = mpsc::UnboundedReceiver<HostSignal>;

/// Sending end held by a device
#[derive(Debug, Clone)]
pub struct Host {
    tx: mpsc::UnboundedSender<HostSignal>,
}

impl Host {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, HostSignals) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a signal; a host that stopped listening is not an error
    pub fn report(&self, signal: impl Into<HostSignal>) {
        let signal = signal.into();
        debug!(?signal, "Reporting to host");

        if self.tx.send(signal).is_err() {
            warn!("Host stopped listening, signal dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focaltech_core::TransferError;

    #[tokio::test]
    async fn test_host_channel_delivers_in_order() {
        let (host, mut signals) = Host::channel();

        host.report(HostSignal::OpenComplete);
        host.report(Report::FingerStatus(true));
        host.report(Report::SessionError(TransferError::Timeout.into()));

        assert_eq!(signals.recv().await, Some(HostSignal::OpenComplete));
        assert_eq!(signals.recv().await, Some(HostSignal::FingerStatus(true)));
        assert_eq!(
            signals.recv().await,
            Some(HostSignal::SessionError(focaltech_core::Error::Transfer(TransferError::Timeout)))
        );
    }

    #[test]
    fn test_report_after_host_dropped() {
        let (host, signals) = Host::channel();
        drop(signals);

        // must not panic
        host.report(HostSignal::CloseComplete);
    }
}
