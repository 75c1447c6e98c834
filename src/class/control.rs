//! SETUP packet model and the control request dispatcher.
//!
//! Every SETUP packet routed to the class produces exactly one
//! [`SetupResponse`]. The caller (USB stack) executes it: sends the data
//! stage, acknowledges, arms EP0 for a host-to-device data stage, or
//! stalls.

use core::slice;

use super::descriptors::{self, DESC_TYPE_CLASS, DESC_TYPE_REPORT};
use super::{ReportInterface, UsbDriver, VendorClass};
use crate::config::{MS_OS_20_VENDOR_CODE, REPORT_DESCRIPTOR_SIZE, WEBUSB_VENDOR_CODE};

/// Standard request codes (USB 2.0 table 9-4).
pub mod standard {
    pub const GET_STATUS: u8 = 0x00;
    pub const GET_DESCRIPTOR: u8 = 0x06;
    pub const GET_INTERFACE: u8 = 0x0A;
    pub const SET_INTERFACE: u8 = 0x0B;
}

/// Class request codes.
pub mod class {
    pub const GET_REPORT: u8 = 0x01;
    pub const GET_IDLE: u8 = 0x02;
    pub const GET_PROTOCOL: u8 = 0x03;
    pub const SET_REPORT: u8 = 0x09;
    pub const SET_IDLE: u8 = 0x0A;
    pub const SET_PROTOCOL: u8 = 0x0B;
}

/// `wIndex` selecting the WebUSB GET_URL request.
pub const WEBUSB_REQ_GET_URL: u16 = 0x0002;

/// `wIndex` selecting the MS OS 2.0 descriptor set.
pub const MS_OS_20_DESCRIPTOR_INDEX: u16 = 0x0007;

/// Bits 6..5 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Bit 7 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// Bits 4..0 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved(u8),
}

/// A decoded SETUP packet (USB 2.0 §9.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    /// `wLength`
    pub length: u16,
}

impl SetupPacket {
    pub const fn new(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type,
            request,
            value,
            index,
            length,
        }
    }

    /// Decode the 8 raw bytes of a SETUP packet (little-endian fields).
    pub fn parse(bytes: &[u8; 8]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match (self.request_type >> 5) & 0x03 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.request_type & 0x80 != 0 {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }

    pub fn recipient(&self) -> Recipient {
        match self.request_type & 0x1F {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            n => Recipient::Reserved(n),
        }
    }

    /// High byte of `wValue`, the descriptor type of GET_DESCRIPTOR.
    pub fn descriptor_type(&self) -> u8 {
        self.value_high()
    }

    /// High byte of `wValue`.
    pub fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Low byte of `wValue`.
    pub fn value_low(&self) -> u8 {
        self.value as u8
    }
}

/// The single action a SETUP packet resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupResponse<'a> {
    /// Device-to-host data stage with these bytes, already clamped to `wLength`.
    Send(&'a [u8]),
    /// No data stage, acknowledge in the status stage.
    Accept,
    /// Arm EP0 for a host-to-device data stage of this many bytes; the data
    /// comes back through `VendorClass::on_ep0_rx_ready`.
    Receive(u16),
    /// Unsupported request, stall EP0.
    Stall,
}

/// GET_STATUS payload: not self powered, no remote wakeup.
static STATUS_INFO: [u8; 2] = [0, 0];

impl<I: ReportInterface> VendorClass<I> {
    /// Dispatch one SETUP packet.
    pub fn setup<D: UsbDriver>(&mut self, driver: &D, req: &SetupPacket) -> SetupResponse<'_> {
        let response = match req.kind() {
            RequestKind::Vendor => vendor_request(req),
            RequestKind::Class => self.class_request(req),
            RequestKind::Standard => self.standard_request(driver, req),
            RequestKind::Reserved => SetupResponse::Stall,
        };
        if response == SetupResponse::Stall {
            debug!(
                "Stalling request type={=u8:#x} code={=u8:#x} value={=u16:#x} index={=u16:#x}",
                req.request_type,
                req.request,
                req.value,
                req.index
            );
        }
        response
    }

    fn class_request(&mut self, req: &SetupPacket) -> SetupResponse<'_> {
        let Some(ctx) = self.context.as_mut() else {
            return SetupResponse::Stall;
        };

        match req.request {
            class::SET_PROTOCOL => {
                ctx.protocol = req.value_low();
                SetupResponse::Accept
            }
            class::GET_PROTOCOL => SetupResponse::Send(clamp(slice::from_ref(&ctx.protocol), req)),
            class::SET_IDLE => {
                ctx.idle_state = req.value_high();
                SetupResponse::Accept
            }
            class::GET_IDLE => SetupResponse::Send(clamp(slice::from_ref(&ctx.idle_state), req)),
            class::SET_REPORT => {
                ctx.is_report_available = true;
                SetupResponse::Receive(req.length)
            }
            // GET_REPORT included: reports only travel on the interrupt endpoints.
            _ => SetupResponse::Stall,
        }
    }

    fn standard_request<D: UsbDriver>(&mut self, driver: &D, req: &SetupPacket) -> SetupResponse<'_> {
        let configured = driver.is_configured();

        match req.request {
            standard::GET_STATUS if configured => SetupResponse::Send(clamp(&STATUS_INFO, req)),
            standard::GET_DESCRIPTOR => match req.descriptor_type() {
                DESC_TYPE_REPORT => {
                    let report: &[u8; REPORT_DESCRIPTOR_SIZE] = self.interface.report_descriptor();
                    SetupResponse::Send(clamp(report, req))
                }
                DESC_TYPE_CLASS => SetupResponse::Send(clamp(descriptors::class_descriptor(), req)),
                // Unknown descriptor types get a zero-length data stage, not a stall.
                _ => SetupResponse::Send(&[]),
            },
            standard::GET_INTERFACE if configured => match self.context.as_ref() {
                Some(ctx) => SetupResponse::Send(clamp(slice::from_ref(&ctx.alt_setting), req)),
                None => SetupResponse::Stall,
            },
            standard::SET_INTERFACE if configured => match self.context.as_mut() {
                Some(ctx) => {
                    ctx.alt_setting = req.value_low();
                    SetupResponse::Accept
                }
                None => SetupResponse::Stall,
            },
            _ => SetupResponse::Stall,
        }
    }
}

/// WebUSB and MS OS 2.0 requests. Anything else addressed to the vendor
/// space is stalled.
fn vendor_request(req: &SetupPacket) -> SetupResponse<'static> {
    if req.direction() != Direction::DeviceToHost {
        return SetupResponse::Stall;
    }

    match (req.request, req.index) {
        (WEBUSB_VENDOR_CODE, WEBUSB_REQ_GET_URL) => {
            match descriptors::webusb_url_descriptor(req.value_low()) {
                Some(url) => SetupResponse::Send(clamp(url, req)),
                None => SetupResponse::Stall,
            }
        }
        (MS_OS_20_VENDOR_CODE, MS_OS_20_DESCRIPTOR_INDEX) => {
            SetupResponse::Send(clamp(descriptors::ms_os_20_descriptor_set(), req))
        }
        _ => SetupResponse::Stall,
    }
}

fn clamp<'a>(table: &'a [u8], req: &SetupPacket) -> &'a [u8] {
    descriptors::truncate(table, req.length)
}
