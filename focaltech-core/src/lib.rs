//! # focaltech-core
//!
//! Core protocol implementation for the FocalTech C652 fingerprint sensor.
//!
//! This crate provides the I/O-free protocol pieces:
//! - Command frame encoding/decoding and BCC checksum
//! - Command definitions
//! - Sequential state machine engine
//! - Finger polling and capture state machines
//! - Image reconstruction
//! - Scan controller sequencing the machines

pub mod capture;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod finger;
pub mod frame;
pub mod image;
pub mod session;
pub mod ssm;
pub mod transfer;

pub use command::{Command, Opcode};
pub use constants::{Endpoints, Timing};
pub use controller::{Action, Controller, Report};
pub use error::{Error, Result};
pub use frame::Frame;
pub use image::Image;
pub use session::{ScanPhase, Session, SessionState};
pub use ssm::{Event, Ssm};
pub use transfer::{Completion, Direction, Transfer, TransferError, TransferResult};
