//! Capture fingerprints until Ctrl-C
//!
//! The latest image goes to finger.pgm, its raw 16-bit samples to
//! live_view_16bit.pgm.

use anyhow::Context;
use focaltech::{HostSignal, Host, ImageDeviceState, Registry, UsbId};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG=focaltech=debug for more)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let id: UsbId = std::env::var("FOCALTECH_DEVICE")
        .unwrap_or_else(|_| "2808:c652".to_string())
        .parse()
        .context("FOCALTECH_DEVICE must look like 2808:c652")?;

    let registry = Registry::default();
    let entry = registry
        .find(id)
        .with_context(|| format!("no driver for {}", id))?;
    println!("Using {}", entry.info);

    let (host, mut signals) = Host::channel();
    let mut device = registry.create(id, host)?;

    device.open().await?;
    device.activate().await?;
    println!("✓ Ready, place a finger on the sensor");

    let printer = tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            match signal {
                HostSignal::FingerStatus(true) => println!("Finger detected"),
                HostSignal::FingerStatus(false) => println!("Finger removed"),
                HostSignal::ImageCaptured(image) => {
                    let mut pgm = Vec::new();
                    let mut pgm16 = Vec::new();
                    if let Err(e) = image
                        .write_pgm(&mut pgm)
                        .and_then(|_| image.write_raw_pgm16(&mut pgm16))
                    {
                        eprintln!("Failed to encode image: {}", e);
                        continue;
                    }
                    for (path, data) in [("finger.pgm", pgm), ("live_view_16bit.pgm", pgm16)] {
                        match tokio::fs::write(path, data).await {
                            Ok(()) => println!("✓ Wrote {}", path),
                            Err(e) => eprintln!("Failed to write {}: {}", path, e),
                        }
                    }
                }
                HostSignal::SessionError(e) => eprintln!("Scan failed: {}", e),
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = device.change_state(ImageDeviceState::AwaitFingerOn) => result?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    device.deactivate().await?;
    device.close().await?;
    println!("✓ Closed");

    drop(device);
    printer.await?;

    Ok(())
}
