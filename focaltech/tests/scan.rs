//! End-to-end scans against a scripted sensor

use std::time::Duration;

use focaltech::{
    Error, FocaltechC652, Host, HostSignal, HostSignals, Image, ImageDevice, ImageDeviceState,
    ScanPhase,
};
use focaltech_core::constants::{ACK_LENGTH, IMAGE_DATA_LENGTH};
use focaltech_core::{Command, Frame, SessionState, TransferError};
use focaltech_transport::{self as transport, ScriptedTransport, Transport};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

fn poll_response(flag: u8) -> Vec<u8> {
    let mut response = vec![0u8; ACK_LENGTH];
    response[4] = flag;
    response
}

fn raw_image() -> Vec<u8> {
    let mut raw = vec![0u8; IMAGE_DATA_LENGTH];
    for i in 0..64 * 80 {
        raw[4 + 2 * i] = (i % 251) as u8;
    }
    raw
}

/// Finger placed on the second poll, lifted on the second poll
fn script_full_scan(transport: &ScriptedTransport) {
    transport
        .push_response(poll_response(0))
        .push_response(poll_response(1))
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(raw_image())
        .push_response(poll_response(1))
        .push_response(poll_response(0));
}

async fn active_device(transport: &ScriptedTransport) -> (FocaltechC652, HostSignals) {
    let (host, mut signals) = Host::channel();
    let mut device = FocaltechC652::new(Box::new(transport.clone()), host);

    device.open().await.unwrap();
    device.activate().await.unwrap();

    assert_eq!(signals.recv().await, Some(HostSignal::OpenComplete));
    assert_eq!(signals.recv().await, Some(HostSignal::ActivateComplete));

    (device, signals)
}

fn drain(signals: &mut HostSignals) -> Vec<HostSignal> {
    let mut out = Vec::new();
    while let Ok(signal) = signals.try_recv() {
        out.push(signal);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_full_scan_signals_in_order() {
    let transport = ScriptedTransport::new();
    script_full_scan(&transport);
    let (mut device, mut signals) = active_device(&transport).await;

    device
        .change_state(ImageDeviceState::AwaitFingerOn)
        .await
        .unwrap();

    assert_eq!(
        drain(&mut signals),
        vec![
            HostSignal::FingerStatus(true),
            HostSignal::ImageCaptured(Image::reconstruct(&raw_image())),
            HostSignal::FingerStatus(false),
        ]
    );
    assert_eq!(device.phase(), ScanPhase::Idle);
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_raw_capture_reaches_host() {
    let transport = ScriptedTransport::new();
    script_full_scan(&transport);
    let (mut device, mut signals) = active_device(&transport).await;

    device.scan().await.unwrap();

    let image = drain(&mut signals)
        .into_iter()
        .find_map(|signal| match signal {
            HostSignal::ImageCaptured(image) => Some(image),
            _ => None,
        })
        .unwrap();

    assert_eq!(image.raw(), raw_image().as_slice());

    let mut pgm = Vec::new();
    image.write_raw_pgm16(&mut pgm).unwrap();
    let header = b"P5\n64 80\n65535\n";
    assert_eq!(&pgm[..header.len()], header);
    // pixel 2: high byte from the capture, low byte as received
    assert_eq!(&pgm[header.len() + 4..header.len() + 6], &[2, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_full_scan_command_sequence() {
    let transport = ScriptedTransport::new();
    script_full_scan(&transport);
    let (mut device, _signals) = active_device(&transport).await;

    device.scan().await.unwrap();

    let expected: Vec<Frame> = [
        Command::WAIT_FINGER,
        Command::WAIT_FINGER,
        Command::STATUS_CHECK,
        Command::PREPARE_SENSOR,
        Command::TRIGGER_CAPTURE,
        Command::REQUEST_IMAGE,
        Command::WAIT_FINGER,
        Command::WAIT_FINGER,
    ]
    .iter()
    .map(Frame::from_command)
    .collect();

    assert_eq!(transport.written_frames().unwrap(), expected);

    // every write is followed by exactly one read
    let transfers = transport.transfers();
    assert_eq!(transfers.len(), 16);
    for pair in transfers.chunks(2) {
        assert!(pair[0].is_out());
        assert!(pair[1].is_in());
    }
    assert_eq!(transfers[11].length, IMAGE_DATA_LENGTH);
}

#[tokio::test(start_paused = true)]
async fn test_polls_wait_between_attempts() {
    let transport = ScriptedTransport::new();
    script_full_scan(&transport);
    let (mut device, _signals) = active_device(&transport).await;

    let start = Instant::now();
    device.scan().await.unwrap();
    let elapsed = start.elapsed();

    // two polls per finger phase, each preceded by the 50 ms delay
    assert!(elapsed >= Duration::from_millis(200), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_failure_ends_scan() {
    let transport = ScriptedTransport::new();
    script_full_scan(&transport);
    // 5th transfer is the status check write
    transport.fail_transfer(5, TransferError::Stall);
    let (mut device, mut signals) = active_device(&transport).await;

    device
        .change_state(ImageDeviceState::AwaitFingerOn)
        .await
        .unwrap();

    assert_eq!(
        drain(&mut signals),
        vec![
            HostSignal::FingerStatus(true),
            HostSignal::SessionError(TransferError::Stall.into()),
        ]
    );
    assert_eq!(device.phase(), ScanPhase::Idle);
    assert_eq!(transport.transfers().len(), 5);
    assert_eq!(transport.remaining(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_silent_sensor_reports_timeout() {
    let transport = ScriptedTransport::new();
    let (mut device, mut signals) = active_device(&transport).await;

    device.scan().await.unwrap();

    assert_eq!(
        drain(&mut signals),
        vec![HostSignal::SessionError(TransferError::Timeout.into())]
    );
    assert_eq!(device.phase(), ScanPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_truncated_image_is_zero_filled() {
    let transport = ScriptedTransport::new();
    let mut truncated = raw_image();
    truncated.truncate(1000);

    transport
        .push_response(poll_response(1))
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(vec![0u8; ACK_LENGTH])
        .push_response(truncated.clone())
        .push_response(poll_response(0));
    let (mut device, mut signals) = active_device(&transport).await;

    device.scan().await.unwrap();

    let signals = drain(&mut signals);
    let image = match &signals[1] {
        HostSignal::ImageCaptured(image) => image.clone(),
        other => panic!("expected image, got {:?}", other),
    };

    assert_eq!(image, Image::reconstruct(&truncated));
    assert_eq!(image.pixel(1, 0), Some(1));
    assert_eq!(image.pixel(63, 79), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_cancels_scan() {
    let transport = ScriptedTransport::new();
    for _ in 0..100 {
        transport.push_response(poll_response(0));
    }
    let (mut device, mut signals) = active_device(&transport).await;

    let result = tokio::time::timeout(
        Duration::from_millis(500),
        device.change_state(ImageDeviceState::AwaitFingerOn),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(device.phase(), ScanPhase::AwaitingFinger);

    device.deactivate().await.unwrap();
    assert_eq!(device.phase(), ScanPhase::Idle);
    assert_eq!(device.session().state(), SessionState::Open);
    assert_eq!(drain(&mut signals), vec![HostSignal::DeactivateComplete]);

    // no I/O after deactivation
    let submitted = transport.transfers().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(transport.transfers().len(), submitted);

    device.close().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_order_enforced() {
    let transport = ScriptedTransport::new();
    let (host, _signals) = Host::channel();
    let mut device = FocaltechC652::new(Box::new(transport.clone()), host);

    assert!(matches!(device.activate().await, Err(Error::Core(_))));
    assert!(matches!(device.deactivate().await, Err(Error::Core(_))));

    device.open().await.unwrap();
    assert!(matches!(device.open().await, Err(Error::Core(_))));

    // open but not active
    assert!(matches!(
        device.change_state(ImageDeviceState::AwaitFingerOn).await,
        Err(Error::Core(_))
    ));
    assert!(transport.transfers().is_empty());

    device.close().await.unwrap();
    assert!(!transport.is_open());
}

#[tokio::test]
async fn test_open_failure_leaves_device_closed() {
    let transport = ScriptedTransport::new();
    let mut other = transport.clone();
    other.open().await.unwrap();

    let (host, mut signals) = Host::channel();
    let mut device = FocaltechC652::new(Box::new(transport), host);

    assert!(matches!(
        device.open().await,
        Err(Error::Transport(transport::Error::AlreadyOpen))
    ));
    assert_eq!(device.session().state(), SessionState::Closed);
    assert!(drain(&mut signals).is_empty());
}
