//! Bridge between [`VendorClass`] and `embassy-usb`.
//!
//! `embassy-usb` owns enumeration and the endpoints; the class owns the
//! request semantics and report state. The two meet here:
//!
//! - [`ControlHandler`] is registered with the builder and forwards SETUP
//!   packets and configuration changes to the class.
//! - [`EndpointPort`] is the class's view of the driver. It records what
//!   the class asked for (transmit, re-arm) and [`VendorDevice`] hands those
//!   requests to the endpoint pumps once the class lock is released.
//! - [`run_in_pump`] / [`run_out_pump`] own the endpoints and report
//!   completions back to the class.
//!
//! Every class entry point runs inside one critical-section mutex, so the
//! application task and the USB task never see a half-updated context.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::{Direction, Endpoint, EndpointIn, EndpointOut};
use embassy_usb::types::InterfaceNumber;
use embassy_usb::Handler;
use heapless::Vec;

use crate::class::control::standard;
use crate::class::{
    DeviceState, EndpointType, ReportInterface, SetupPacket, SetupResponse, UsbDriver, VendorClass,
};
use crate::config::{EP_IN_SIZE, EP_OUT_SIZE, MS_OS_20_VENDOR_CODE, WEBUSB_VENDOR_CODE};
use crate::error::Error;

/// embassy-usb exposes a single configuration.
const CONFIG_INDEX: u8 = 1;

/// One interrupt IN packet.
pub type InPacket = Vec<u8, { EP_IN_SIZE as usize }>;

/// Driver state as seen by the class.
pub struct EndpointPort {
    state: DeviceState,
    resume_state: DeviceState,
    in_pending: Option<InPacket>,
    out_armed: bool,
}

impl EndpointPort {
    const fn new() -> Self {
        Self {
            state: DeviceState::Default,
            resume_state: DeviceState::Default,
            in_pending: None,
            out_armed: false,
        }
    }

    fn set_state(&mut self, state: DeviceState) {
        self.state = state;
        self.resume_state = state;
    }
}

impl UsbDriver for EndpointPort {
    fn device_state(&self) -> DeviceState {
        self.state
    }

    // Endpoints are allocated by the builder and enabled by the stack on
    // SET_CONFIGURATION, so open/close only leave a trace.
    fn open_endpoint(&mut self, address: u8, ep_type: EndpointType, max_packet_size: u16) {
        trace!("EP {=u8:#x} open ({}, {} bytes)", address, ep_type as u8, max_packet_size);
    }

    fn close_endpoint(&mut self, address: u8) {
        trace!("EP {=u8:#x} closed", address);
    }

    fn set_endpoint_used(&mut self, _address: u8, _used: bool) {}

    fn transmit(&mut self, _address: u8, data: &[u8]) {
        match Vec::from_slice(data) {
            Ok(packet) => self.in_pending = Some(packet),
            Err(()) => warn!("IN report of {} bytes dropped", data.len()),
        }
    }

    fn prepare_receive(&mut self, _address: u8, _len: usize) {
        self.out_armed = true;
    }
}

struct Shared<I> {
    class: VendorClass<I>,
    port: EndpointPort,
}

/// The class instance together with the signals that drive the endpoint pumps.
pub struct VendorDevice<I> {
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared<I>>>,
    in_report: Signal<CriticalSectionRawMutex, InPacket>,
    out_armed: Signal<CriticalSectionRawMutex, ()>,
    app_event: Signal<CriticalSectionRawMutex, ()>,
}

impl<I: ReportInterface> VendorDevice<I> {
    pub const fn new(interface: I) -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                class: VendorClass::new(interface),
                port: EndpointPort::new(),
            })),
            in_report: Signal::new(),
            out_armed: Signal::new(),
            app_event: Signal::new(),
        }
    }

    /// Queue a report on the interrupt IN endpoint. See
    /// [`VendorClass::send_report`].
    pub fn send_report(&self, report: &[u8]) -> Result<(), Error> {
        self.with_class(|class, port| class.send_report(port, report))
    }

    /// Run `f` against the bound application.
    pub fn with_app<R>(&self, f: impl FnOnce(&mut I) -> R) -> R {
        self.with_class(|class, _| f(class.interface_mut()))
    }

    /// Resolves after the application saw an OUT event or a lifecycle change.
    pub async fn app_event(&self) {
        self.app_event.wait().await;
    }

    /// Lock the class, run `f`, then release whatever the class asked the
    /// driver to do to the pumps.
    fn with_class<R>(&self, f: impl FnOnce(&mut VendorClass<I>, &mut EndpointPort) -> R) -> R {
        let (result, in_packet, arm) = self.shared.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Shared { class, port } = &mut *guard;
            let result = f(class, port);
            (result, port.in_pending.take(), core::mem::take(&mut port.out_armed))
        });

        if let Some(packet) = in_packet {
            self.in_report.signal(packet);
        }
        if arm {
            self.out_armed.signal(());
        }
        result
    }

    fn set_device_state(&self, state: DeviceState) {
        self.with_class(|_, port| port.set_state(state));
    }
}

/// `embassy-usb` control handler for one [`VendorDevice`].
pub struct ControlHandler<I: 'static> {
    device: &'static VendorDevice<I>,
    interface: InterfaceNumber,
}

impl<I: ReportInterface + 'static> ControlHandler<I> {
    pub fn new(device: &'static VendorDevice<I>, interface: InterfaceNumber) -> Self {
        Self { device, interface }
    }

    /// Requests this handler answers: vendor codes of the two extensions and
    /// anything addressed to our interface. The rest goes to other handlers.
    fn owns(&self, req: &Request) -> bool {
        match (req.request_type, req.recipient) {
            (RequestType::Vendor, _) => matches!(req.request, WEBUSB_VENDOR_CODE | MS_OS_20_VENDOR_CODE),
            (RequestType::Standard | RequestType::Class, Recipient::Interface) => {
                req.index as u8 == u8::from(self.interface)
            }
            _ => false,
        }
    }
}

fn setup_packet(req: &Request) -> SetupPacket {
    let direction = match req.direction {
        Direction::Out => 0x00,
        Direction::In => 0x80,
    };
    let kind = match req.request_type {
        RequestType::Standard => 0,
        RequestType::Class => 1,
        RequestType::Vendor => 2,
        RequestType::Reserved => 3,
    };
    let recipient = match req.recipient {
        Recipient::Device => 0,
        Recipient::Interface => 1,
        Recipient::Endpoint => 2,
        Recipient::Other => 3,
        Recipient::Reserved => 0x1F,
    };
    SetupPacket::new(direction | (kind << 5) | recipient, req.request, req.value, req.index, req.length)
}

impl<I: ReportInterface + 'static> Handler for ControlHandler<I> {
    fn enabled(&mut self, enabled: bool) {
        debug!("USB enabled: {}", enabled);
        if !enabled {
            self.device.set_device_state(DeviceState::Default);
        }
    }

    fn reset(&mut self) {
        self.device.set_device_state(DeviceState::Default);
    }

    fn addressed(&mut self, addr: u8) {
        debug!("USB address {}", addr);
        self.device.set_device_state(DeviceState::Addressed);
    }

    fn configured(&mut self, configured: bool) {
        let device = self.device;
        if configured {
            device.set_device_state(DeviceState::Configured);
            if device
                .with_class(|class, port| class.activate(port, CONFIG_INDEX))
                .is_err()
            {
                warn!("Vendor class activated with a failed application init");
            }
        } else {
            device.in_report.reset();
            device.out_armed.reset();
            device.with_class(|class, port| class.deactivate(port, CONFIG_INDEX));
            device.set_device_state(DeviceState::Addressed);
        }
        device.app_event.signal(());
    }

    fn suspended(&mut self, suspended: bool) {
        debug!("USB suspended: {}", suspended);
        self.device.with_class(|_, port| {
            if suspended {
                port.state = DeviceState::Suspended;
            } else {
                port.state = port.resume_state;
            }
        });
    }

    fn set_alternate_setting(&mut self, iface: InterfaceNumber, alternate_setting: u8) {
        if iface != self.interface {
            return;
        }
        // The stack answers SET_INTERFACE itself; replay it so the class
        // context tracks the alternate setting.
        let req = SetupPacket::new(
            0x01,
            standard::SET_INTERFACE,
            u16::from(alternate_setting),
            u16::from(u8::from(iface)),
            0,
        );
        self.device.with_class(|class, port| {
            if class.setup(port, &req) == SetupResponse::Stall {
                warn!("Alternate setting {} rejected", alternate_setting);
            }
        });
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if !self.owns(&req) {
            return None;
        }
        let setup = setup_packet(&req);

        let accepted = self.device.with_class(|class, port| match class.setup(port, &setup) {
            SetupResponse::Accept => true,
            SetupResponse::Receive(_) => {
                // The stack has already collected the data stage.
                class.on_ep0_rx_ready(data);
                true
            }
            SetupResponse::Send(_) | SetupResponse::Stall => false,
        });

        if accepted {
            self.device.app_event.signal(());
            Some(OutResponse::Accepted)
        } else {
            Some(OutResponse::Rejected)
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if !self.owns(&req) {
            return None;
        }
        let setup = setup_packet(&req);

        let sent = self.device.with_class(|class, port| match class.setup(port, &setup) {
            SetupResponse::Send(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Some(n)
            }
            _ => None,
        });

        match sent {
            Some(n) => Some(InResponse::Accepted(&buf[..n])),
            None => Some(InResponse::Rejected),
        }
    }
}

/// Interrupt IN pump: writes each queued report and signals completion.
pub async fn run_in_pump<I: ReportInterface, E: EndpointIn>(device: &VendorDevice<I>, mut ep: E) -> ! {
    loop {
        let packet = device.in_report.wait().await;
        ep.wait_enabled().await;

        if let Err(e) = ep.write(&packet).await.map_err(|_| Error::Usb) {
            warn!("Interrupt IN write failed: {}", e);
        }
        device.with_class(|class, _| class.on_data_in());
    }
}

/// Interrupt OUT pump: waits until the class arms the endpoint, reads one
/// report and hands it over. The class re-arms from `on_data_out`.
pub async fn run_out_pump<I: ReportInterface, E: EndpointOut>(device: &VendorDevice<I>, mut ep: E) -> ! {
    let mut buf = [0u8; EP_OUT_SIZE as usize];
    loop {
        device.out_armed.wait().await;
        ep.wait_enabled().await;

        match ep.read(&mut buf).await {
            Ok(n) => {
                device.with_class(|class, port| class.on_data_out(port, &buf[..n]));
                device.app_event.signal(());
            }
            // Disabled by a configuration change; activation arms again.
            Err(_) => debug!("Interrupt OUT read aborted"),
        }
    }
}
