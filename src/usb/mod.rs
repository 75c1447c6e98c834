//! USB device subsystem - presents the vendor interface to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The device has a single vendor-specific interface
//! (class 0xFF) with one interrupt IN and one interrupt OUT endpoint.
//! Request semantics live in [`crate::class`]; [`vendor_device`] adapts
//! them to the embassy stack.

pub mod vendor_device;

use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use crate::class::descriptors;
use crate::config;
use crate::traffic_light::TrafficLight;
use vendor_device::{ControlHandler, VendorDevice};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type NrfUsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;
pub type NrfEndpointIn = <NrfUsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;
pub type NrfEndpointOut = <NrfUsbDriver as embassy_usb::driver::Driver<'static>>::EndpointOut;

/// Vendor interface class / subclass / protocol.
const VENDOR_CLASS: u8 = 0xFF;
const VENDOR_SUBCLASS: u8 = 0x00;
const VENDOR_PROTOCOL: u8 = 0x00;

static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_HANDLER: StaticCell<ControlHandler<TrafficLight>> = StaticCell::new();

/// Build result: the device runner and the two interrupt endpoints.
pub struct UsbVendorDevice {
    pub device: UsbDevice<'static, NrfUsbDriver>,
    pub ep_in: NrfEndpointIn,
    pub ep_out: NrfEndpointOut,
}

/// Initialise the USB stack and register the vendor interface.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, vendor: &'static VendorDevice<TrafficLight>) -> UsbVendorDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;
    // Single function, no interface association.
    usb_config.device_class = 0x00;
    usb_config.device_sub_class = 0x00;
    usb_config.device_protocol = 0x00;
    usb_config.composite_with_iads = false;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 256]);

    let mut builder = Builder::new(driver, usb_config, config_desc, bos_desc, msos_desc, ctrl_buf);

    let (interface_number, ep_in, ep_out) = {
        let mut func = builder.function(VENDOR_CLASS, VENDOR_SUBCLASS, VENDOR_PROTOCOL);
        let mut iface = func.interface();
        let interface_number = iface.interface_number();
        let mut alt = iface.alt_setting(VENDOR_CLASS, VENDOR_SUBCLASS, VENDOR_PROTOCOL, None);

        // The builder writes bLength and bDescriptorType itself.
        let class_desc = descriptors::class_descriptor();
        alt.descriptor(descriptors::DESC_TYPE_CLASS, &class_desc[2..]);

        let ep_in = alt.endpoint_interrupt_in(config::EP_IN_SIZE, config::FS_BINTERVAL);
        let ep_out = alt.endpoint_interrupt_out(config::EP_OUT_SIZE, config::FS_BINTERVAL);

        // Platform capabilities tell Windows and browsers which vendor codes
        // fetch the MS OS 2.0 set and the WebUSB landing page.
        for body in descriptors::platform_capability_bodies() {
            alt.bos_capability(descriptors::DEV_CAPABILITY_PLATFORM, body);
        }
        (interface_number, ep_in, ep_out)
    };

    let handler = CONTROL_HANDLER.init(ControlHandler::new(vendor, interface_number));
    builder.handler(handler);

    let device = builder.build();

    info!("USB vendor device initialised (interface {})", u8::from(interface_number));

    UsbVendorDevice {
        device,
        ep_in,
        ep_out,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, NrfUsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}
