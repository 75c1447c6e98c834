//! Vendor-specific interrupt class with WebUSB and MS OS 2.0 side-channels.
//!
//! The class exposes one vendor interface with an interrupt IN and an
//! interrupt OUT endpoint carrying 2-byte reports, and answers:
//!
//! - **Standard** requests for its class/report descriptors, status and
//!   alternate setting.
//! - **Class** requests SET/GET_PROTOCOL, SET/GET_IDLE and SET_REPORT.
//! - **Vendor** requests for the WebUSB landing page URL and the Microsoft
//!   OS 2.0 descriptor set (WinUSB auto-binding).
//!
//! All entry points run to completion and never block. The USB stack calls
//! [`VendorClass::activate`]/[`VendorClass::deactivate`] on configuration
//! changes, [`VendorClass::setup`] for every SETUP packet and the
//! `on_*` handlers on transfer completion. The application calls
//! [`VendorClass::send_report`].

pub mod control;
pub mod descriptors;
pub mod driver;
mod lifecycle;
mod report_io;

#[cfg(test)]
mod tests;

pub use control::{Direction, Recipient, RequestKind, SetupPacket, SetupResponse};
pub use descriptors::Speed;
pub use driver::{DeviceState, EndpointType, UsbDriver};

use crate::config::{EP_IN_SIZE, REPORT_DESCRIPTOR_SIZE, REPORT_SIZE};
use crate::error::Error;

/// Application side of the class: lifecycle hooks, OUT event sink and the
/// report descriptor served to the host.
///
/// Exactly one implementation is bound per [`VendorClass`].
pub trait ReportInterface {
    /// Called when the configuration becomes active.
    fn init(&mut self) -> Result<(), Error>;

    /// Called when the configuration is torn down.
    fn deinit(&mut self) -> Result<(), Error>;

    /// A 2-byte report arrived, either on the OUT endpoint or through SET_REPORT.
    fn out_event(&mut self, event_index: u8, state: u8) -> Result<(), Error>;

    fn report_descriptor(&self) -> &[u8; REPORT_DESCRIPTOR_SIZE];
}

/// Interrupt IN endpoint state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// No transfer in flight, a report may be queued.
    Idle,
    /// A transfer is in flight; new reports are rejected until it completes.
    Busy,
}

/// Per-configuration state. Exists only while the configuration is active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassContext {
    /// Landing buffer for OUT reports and SET_REPORT payloads. Valid only
    /// right after an OUT or EP0 data-stage completion.
    pub report_buffer: [u8; REPORT_SIZE],
    pub protocol: u8,
    pub idle_state: u8,
    pub alt_setting: u8,
    /// A SET_REPORT data stage is pending.
    pub is_report_available: bool,
    pub transfer_state: TransferState,
    in_report: [u8; EP_IN_SIZE as usize],
    in_len: usize,
}

impl ClassContext {
    fn new() -> Self {
        Self {
            report_buffer: [0; REPORT_SIZE],
            protocol: 0,
            idle_state: 0,
            alt_setting: 0,
            is_report_available: false,
            transfer_state: TransferState::Idle,
            in_report: [0; EP_IN_SIZE as usize],
            in_len: 0,
        }
    }

    /// The report handed to the driver by the last accepted `send_report`.
    pub fn in_flight_report(&self) -> &[u8] {
        &self.in_report[..self.in_len]
    }
}

/// The class driver: binds one [`ReportInterface`] and owns the
/// per-configuration [`ClassContext`].
pub struct VendorClass<I> {
    interface: I,
    context: Option<ClassContext>,
}

impl<I: ReportInterface> VendorClass<I> {
    pub const fn new(interface: I) -> Self {
        Self {
            interface,
            context: None,
        }
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    /// Per-configuration state, `None` while no configuration is active.
    pub fn context(&self) -> Option<&ClassContext> {
        self.context.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    pub fn transfer_state(&self) -> Option<TransferState> {
        self.context.as_ref().map(|ctx| ctx.transfer_state)
    }
}
