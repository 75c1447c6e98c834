//! Vendor-specific interrupt USB class with WebUSB and Microsoft OS 2.0
//! auto-configuration, plus the traffic-light application that rides on it.
//!
//! The class state machine, descriptor tables and application logic are
//! plain `no_std` code driven through the [`class::UsbDriver`] trait, so
//! they run unchanged on the host under `cargo test --lib`.
//!
//! The embedded binary (`--features embedded`) binds the class to
//! `embassy-usb` on the nRF52840 through the [`usb`] module.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Host-testable core
// ═══════════════════════════════════════════════════════════════════════════

pub mod class;
pub mod config;
pub mod error;
pub mod traffic_light;

// ═══════════════════════════════════════════════════════════════════════════
// Hardware binding (nRF52840 + embassy-usb)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(feature = "embedded")]
pub mod usb;

pub use class::{ReportInterface, SetupPacket, SetupResponse, TransferState, UsbDriver, VendorClass};
pub use error::Error;
pub use traffic_light::TrafficLight;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
