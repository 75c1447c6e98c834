//! Scenario tests for the vendor class state machine.
//!
//! These run on the host against a recording driver and verify the
//! dispatcher table, the IN busy/idle machine and the OUT receive loop.

use super::control::{class as class_req, standard, MS_OS_20_DESCRIPTOR_INDEX, WEBUSB_REQ_GET_URL};
use super::*;
use crate::config::{
    EP_IN_ADDRESS, EP_OUT_ADDRESS, MS_OS_20_VENDOR_CODE, REPORT_DESCRIPTOR_SIZE,
    WEBUSB_VENDOR_CODE,
};
use heapless::Vec as HVec;

// ═══════════════════════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Open(u8, EndpointType, u16),
    Close(u8),
    Used(u8, bool),
    Transmit(u8, HVec<u8, 8>),
    Arm(u8, usize),
}

struct MockDriver {
    state: DeviceState,
    calls: HVec<Call, 64>,
}

impl MockDriver {
    fn configured() -> Self {
        Self {
            state: DeviceState::Configured,
            calls: HVec::new(),
        }
    }

    fn addressed() -> Self {
        Self {
            state: DeviceState::Addressed,
            calls: HVec::new(),
        }
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call).expect("call log full");
    }

    fn transmits(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Transmit(..)))
            .count()
    }

    fn out_arms(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == Call::Arm(EP_OUT_ADDRESS, 2))
            .count()
    }
}

impl UsbDriver for MockDriver {
    fn device_state(&self) -> DeviceState {
        self.state
    }

    fn open_endpoint(&mut self, address: u8, ep_type: EndpointType, max_packet_size: u16) {
        self.record(Call::Open(address, ep_type, max_packet_size));
    }

    fn close_endpoint(&mut self, address: u8) {
        self.record(Call::Close(address));
    }

    fn set_endpoint_used(&mut self, address: u8, used: bool) {
        self.record(Call::Used(address, used));
    }

    fn transmit(&mut self, address: u8, data: &[u8]) {
        let data = HVec::from_slice(data).expect("report too long for log");
        self.record(Call::Transmit(address, data));
    }

    fn prepare_receive(&mut self, address: u8, len: usize) {
        self.record(Call::Arm(address, len));
    }
}

static TEST_REPORT_DESCRIPTOR: [u8; REPORT_DESCRIPTOR_SIZE] = {
    let mut desc = [0u8; REPORT_DESCRIPTOR_SIZE];
    let mut i = 0;
    while i < REPORT_DESCRIPTOR_SIZE {
        desc[i] = i as u8;
        i += 1;
    }
    desc
};

#[derive(Default)]
struct Recorder {
    inits: usize,
    deinits: usize,
    events: Vec<(u8, u8)>,
    fail_init: bool,
}

impl ReportInterface for Recorder {
    fn init(&mut self) -> Result<(), Error> {
        self.inits += 1;
        if self.fail_init {
            Err(Error::Application)
        } else {
            Ok(())
        }
    }

    fn deinit(&mut self) -> Result<(), Error> {
        self.deinits += 1;
        Ok(())
    }

    fn out_event(&mut self, event_index: u8, state: u8) -> Result<(), Error> {
        self.events.push((event_index, state));
        Ok(())
    }

    fn report_descriptor(&self) -> &[u8; REPORT_DESCRIPTOR_SIZE] {
        &TEST_REPORT_DESCRIPTOR
    }
}

fn active_class(driver: &mut MockDriver) -> VendorClass<Recorder> {
    let mut class = VendorClass::new(Recorder::default());
    class.activate(driver, 1).unwrap();
    driver.calls.clear();
    class
}

fn vendor_in(request: u8, value: u16, index: u16, length: u16) -> SetupPacket {
    SetupPacket::new(0xC0, request, value, index, length)
}

fn class_out(request: u8, value: u16, length: u16) -> SetupPacket {
    SetupPacket::new(0x21, request, value, 0, length)
}

fn class_in(request: u8, length: u16) -> SetupPacket {
    SetupPacket::new(0xA1, request, 0, 0, length)
}

fn get_descriptor(descriptor_type: u8, length: u16) -> SetupPacket {
    SetupPacket::new(0x81, standard::GET_DESCRIPTOR, u16::from(descriptor_type) << 8, 0, length)
}

// ═══════════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn activate_opens_endpoints_and_arms_out() {
    let mut driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder::default());

    class.activate(&mut driver, 1).unwrap();

    assert_eq!(
        driver.calls.as_slice(),
        &[
            Call::Open(EP_IN_ADDRESS, EndpointType::Interrupt, 2),
            Call::Used(EP_IN_ADDRESS, true),
            Call::Open(EP_OUT_ADDRESS, EndpointType::Interrupt, 2),
            Call::Used(EP_OUT_ADDRESS, true),
            Call::Arm(EP_OUT_ADDRESS, 2),
        ]
    );
    assert_eq!(class.interface().inits, 1);
    assert_eq!(class.transfer_state(), Some(TransferState::Idle));
}

#[test]
fn activate_reports_init_failure_but_stays_active() {
    let mut driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder {
        fail_init: true,
        ..Recorder::default()
    });

    assert_eq!(class.activate(&mut driver, 1), Err(Error::Application));
    assert!(class.is_active());
    assert_eq!(driver.out_arms(), 1);
}

#[test]
fn reactivation_starts_from_fresh_context() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);
    class.send_report(&mut driver, &[1, 2]).unwrap();

    class.activate(&mut driver, 1).unwrap();

    let ctx = class.context().unwrap();
    assert_eq!(ctx.transfer_state, TransferState::Idle);
    assert!(ctx.in_flight_report().is_empty());
}

#[test]
fn deactivate_closes_endpoints_and_releases_context() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    class.deactivate(&mut driver, 1);

    assert_eq!(
        driver.calls.as_slice(),
        &[
            Call::Close(EP_IN_ADDRESS),
            Call::Used(EP_IN_ADDRESS, false),
            Call::Close(EP_OUT_ADDRESS),
            Call::Used(EP_OUT_ADDRESS, false),
        ]
    );
    assert_eq!(class.interface().deinits, 1);
    assert!(class.context().is_none());
}

#[test]
fn deactivate_without_context_skips_deinit() {
    let mut driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder::default());

    class.deactivate(&mut driver, 1);
    class.deactivate(&mut driver, 1);

    assert_eq!(class.interface().deinits, 0);
    assert_eq!(driver.calls.len(), 8);
}

// ═══════════════════════════════════════════════════════════════════════════
// Vendor requests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn webusb_url_is_sent_in_full() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let resp = class.setup(&driver, &vendor_in(WEBUSB_VENDOR_CODE, 1, WEBUSB_REQ_GET_URL, 255));
    assert_eq!(resp, SetupResponse::Send(descriptors::webusb_url_descriptor(1).unwrap()));
}

#[test]
fn webusb_url_truncated_to_w_length() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let resp = class.setup(&driver, &vendor_in(WEBUSB_VENDOR_CODE, 1, WEBUSB_REQ_GET_URL, 5));
    match resp {
        SetupResponse::Send(data) => {
            assert_eq!(data.len(), 5);
            assert_eq!(data, &[12, 0x03, 0x01, b'e', b'l']);
        }
        other => panic!("expected data stage, got {:?}", other),
    }
}

#[test]
fn webusb_unknown_url_index_is_stalled() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let resp = class.setup(&driver, &vendor_in(WEBUSB_VENDOR_CODE, 2, WEBUSB_REQ_GET_URL, 64));
    assert_eq!(resp, SetupResponse::Stall);
}

#[test]
fn ms_os_20_set_is_never_padded() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let req = vendor_in(MS_OS_20_VENDOR_CODE, 0, MS_OS_20_DESCRIPTOR_INDEX, 1000);
    match class.setup(&driver, &req) {
        SetupResponse::Send(data) => {
            assert_eq!(data.len(), 162);
            assert_eq!(data, descriptors::ms_os_20_descriptor_set());
        }
        other => panic!("expected data stage, got {:?}", other),
    }
}

#[test]
fn ms_os_20_set_truncated_to_header() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let req = vendor_in(MS_OS_20_VENDOR_CODE, 0, MS_OS_20_DESCRIPTOR_INDEX, 10);
    assert_eq!(
        class.setup(&driver, &req),
        SetupResponse::Send(&descriptors::ms_os_20_descriptor_set()[..10])
    );
}

#[test]
fn vendor_extensions_work_without_active_configuration() {
    let driver = MockDriver::addressed();
    let mut class = VendorClass::new(Recorder::default());

    let req = vendor_in(MS_OS_20_VENDOR_CODE, 0, MS_OS_20_DESCRIPTOR_INDEX, 1000);
    assert!(matches!(class.setup(&driver, &req), SetupResponse::Send(d) if d.len() == 162));
}

#[test]
fn unknown_vendor_request_is_stalled() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let resp = class.setup(&driver, &vendor_in(0x42, 0, WEBUSB_REQ_GET_URL, 64));
    assert_eq!(resp, SetupResponse::Stall);
    assert!(driver.calls.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Class requests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn protocol_round_trip_uses_low_byte() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let set = class_out(class_req::SET_PROTOCOL, 0xAB01, 0);
    assert_eq!(class.setup(&driver, &set), SetupResponse::Accept);
    assert_eq!(
        class.setup(&driver, &class_in(class_req::GET_PROTOCOL, 1)),
        SetupResponse::Send(&[0x01])
    );
}

#[test]
fn idle_round_trip_uses_high_byte() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let set = class_out(class_req::SET_IDLE, 0x7D00, 0);
    assert_eq!(class.setup(&driver, &set), SetupResponse::Accept);
    assert_eq!(
        class.setup(&driver, &class_in(class_req::GET_IDLE, 1)),
        SetupResponse::Send(&[0x7D])
    );
    assert_eq!(class.context().unwrap().idle_state, 0x7D);
}

#[test]
fn set_report_round_trip_delivers_one_event() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    let resp = class.setup(&driver, &class_out(class_req::SET_REPORT, 0x0200, 2));
    assert_eq!(resp, SetupResponse::Receive(2));
    assert!(class.context().unwrap().is_report_available);

    class.on_ep0_rx_ready(&[0x02, 0x01]);
    assert_eq!(class.interface().events, [(0x02, 0x01)]);
    assert!(!class.context().unwrap().is_report_available);

    // A stray data stage without a pending SET_REPORT is ignored.
    class.on_ep0_rx_ready(&[0x05, 0x05]);
    assert_eq!(class.interface().events.len(), 1);
}

#[test]
fn set_report_payload_is_clamped_and_short_packet_keeps_tail() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);
    let set_report = class_out(class_req::SET_REPORT, 0x0200, 5);

    assert_eq!(class.setup(&driver, &set_report), SetupResponse::Receive(5));
    class.on_ep0_rx_ready(&[1, 2, 3, 4, 5]);
    assert_eq!(class.context().unwrap().report_buffer, [1, 2]);

    class.setup(&driver, &set_report);
    class.on_ep0_rx_ready(&[9]);
    assert_eq!(class.context().unwrap().report_buffer, [9, 2]);

    assert_eq!(class.interface().events, [(1, 2), (9, 2)]);
    assert!(!class.context().unwrap().is_report_available);
}

#[test]
fn get_report_is_unsupported() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    assert_eq!(
        class.setup(&driver, &class_in(class_req::GET_REPORT, 2)),
        SetupResponse::Stall
    );
}

#[test]
fn class_requests_stall_without_context() {
    let driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder::default());

    for req in [
        class_out(class_req::SET_PROTOCOL, 1, 0),
        class_in(class_req::GET_PROTOCOL, 1),
        class_out(class_req::SET_IDLE, 0x0100, 0),
        class_in(class_req::GET_IDLE, 1),
        class_out(class_req::SET_REPORT, 0x0200, 2),
    ] {
        assert_eq!(class.setup(&driver, &req), SetupResponse::Stall);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Standard requests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn get_status_requires_configured_state() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);
    let req = SetupPacket::new(0x81, standard::GET_STATUS, 0, 0, 2);

    assert_eq!(class.setup(&driver, &req), SetupResponse::Send(&[0, 0]));

    driver.state = DeviceState::Addressed;
    assert_eq!(class.setup(&driver, &req), SetupResponse::Stall);
}

#[test]
fn report_descriptor_is_served_in_full() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    match class.setup(&driver, &get_descriptor(0x22, 163)) {
        SetupResponse::Send(data) => {
            assert_eq!(data.len(), 163);
            assert_eq!(data, &TEST_REPORT_DESCRIPTOR[..]);
        }
        other => panic!("expected data stage, got {:?}", other),
    }
}

#[test]
fn report_descriptor_truncated_to_w_length() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    assert_eq!(
        class.setup(&driver, &get_descriptor(0x22, 64)),
        SetupResponse::Send(&TEST_REPORT_DESCRIPTOR[..64])
    );
    assert_eq!(
        class.setup(&driver, &get_descriptor(0x22, 1000)),
        SetupResponse::Send(&TEST_REPORT_DESCRIPTOR[..])
    );
}

#[test]
fn class_descriptor_is_served() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    assert_eq!(
        class.setup(&driver, &get_descriptor(0x21, 255)),
        SetupResponse::Send(descriptors::class_descriptor())
    );
}

#[test]
fn unknown_descriptor_type_sends_zero_length() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    assert_eq!(
        class.setup(&driver, &get_descriptor(0x23, 64)),
        SetupResponse::Send(&[])
    );
}

#[test]
fn interface_requests_require_configured_state() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);
    let get = SetupPacket::new(0x81, standard::GET_INTERFACE, 0, 0, 1);
    let set = SetupPacket::new(0x01, standard::SET_INTERFACE, 0x0000, 0, 0);

    assert_eq!(class.setup(&driver, &set), SetupResponse::Accept);
    assert_eq!(class.setup(&driver, &get), SetupResponse::Send(&[0]));

    driver.state = DeviceState::Suspended;
    assert_eq!(class.setup(&driver, &set), SetupResponse::Stall);
    assert_eq!(class.setup(&driver, &get), SetupResponse::Stall);
}

#[test]
fn set_interface_stores_low_byte_of_value() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);
    let set = SetupPacket::new(0x01, standard::SET_INTERFACE, 0xAB03, 0, 0);
    let get = SetupPacket::new(0x81, standard::GET_INTERFACE, 0, 0, 1);

    assert_eq!(class.setup(&driver, &set), SetupResponse::Accept);
    assert_eq!(class.context().unwrap().alt_setting, 3);
    assert_eq!(class.setup(&driver, &get), SetupResponse::Send(&[3]));
}

#[test]
fn unsupported_standard_and_reserved_requests_stall() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    // SET_FEATURE
    let set_feature = SetupPacket::new(0x01, 0x03, 0, 0, 0);
    assert_eq!(class.setup(&driver, &set_feature), SetupResponse::Stall);

    let reserved = SetupPacket::new(0xE0, 0x00, 0, 0, 0);
    assert_eq!(class.setup(&driver, &reserved), SetupResponse::Stall);
}

// ═══════════════════════════════════════════════════════════════════════════
// Report I/O
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn send_report_busy_idle_cycle() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    class.send_report(&mut driver, &[0x01, 0x02]).unwrap();
    assert_eq!(class.transfer_state(), Some(TransferState::Busy));
    assert_eq!(
        driver.calls.as_slice(),
        &[Call::Transmit(EP_IN_ADDRESS, HVec::from_slice(&[0x01, 0x02]).unwrap())]
    );

    class.on_data_in();
    assert_eq!(class.transfer_state(), Some(TransferState::Idle));

    class.send_report(&mut driver, &[0x03, 0x04]).unwrap();
    assert_eq!(driver.transmits(), 2);
}

#[test]
fn send_report_rejected_while_busy_keeps_in_flight_report() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    class.send_report(&mut driver, &[0xAA, 0xBB]).unwrap();
    for _ in 0..5 {
        assert_eq!(class.send_report(&mut driver, &[0x11, 0x22]), Err(Error::Busy));
        let ctx = class.context().unwrap();
        assert_eq!(ctx.transfer_state, TransferState::Busy);
        assert_eq!(ctx.in_flight_report(), &[0xAA, 0xBB]);
    }
    assert_eq!(driver.transmits(), 1);
}

#[test]
fn send_report_unconfigured_is_silent_success() {
    let mut driver = MockDriver::addressed();
    let mut class = VendorClass::new(Recorder::default());

    assert_eq!(class.send_report(&mut driver, &[0x01, 0x02]), Ok(()));
    assert!(driver.calls.is_empty());
}

#[test]
fn send_report_configured_without_context_is_inactive() {
    let mut driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder::default());

    assert_eq!(class.send_report(&mut driver, &[0x01]), Err(Error::Inactive));
}

#[test]
fn send_report_longer_than_packet_is_rejected() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    assert_eq!(
        class.send_report(&mut driver, &[1, 2, 3]),
        Err(Error::ReportTooLong)
    );
    assert_eq!(class.transfer_state(), Some(TransferState::Idle));
}

#[test]
fn out_completion_delivers_event_and_rearms() {
    let mut driver = MockDriver::configured();
    let mut class = active_class(&mut driver);

    for i in 0..10u8 {
        class.on_data_out(&mut driver, &[i, i ^ 0xFF]);
        // Re-armed before the next packet can arrive.
        assert_eq!(driver.calls.last(), Some(&Call::Arm(EP_OUT_ADDRESS, 2)));
    }

    assert_eq!(driver.out_arms(), 10);
    assert_eq!(class.interface().events.len(), 10);
    assert_eq!(class.interface().events[3], (3, 0xFC));
    assert_eq!(class.context().unwrap().report_buffer, [9, 0xF6]);
}

#[test]
fn completions_without_context_are_ignored() {
    let mut driver = MockDriver::configured();
    let mut class = VendorClass::new(Recorder::default());

    class.on_data_in();
    class.on_data_out(&mut driver, &[1, 1]);
    class.on_ep0_rx_ready(&[1, 1]);

    assert!(class.interface().events.is_empty());
    assert!(driver.calls.is_empty());
}
