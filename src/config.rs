//! Application-wide constants and compile-time configuration.
//!
//! Endpoint layout, descriptor sizes, vendor request codes and the
//! auto-configuration payloads live here so they can be tuned in one place.

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "elmot";
pub const USB_PRODUCT: &str = "Traffic Light";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// Interrupt IN endpoint (device to host).
pub const EP_IN_ADDRESS: u8 = 0x81;
/// Interrupt OUT endpoint (host to device).
pub const EP_OUT_ADDRESS: u8 = 0x01;

/// Max packet size of both interrupt endpoints.
pub const EP_IN_SIZE: u16 = 2;
pub const EP_OUT_SIZE: u16 = 2;

/// Polling interval (`bInterval`) per bus speed.
/// Full speed counts frames (ms), high speed counts 2^(n-1) microframes.
pub const FS_BINTERVAL: u8 = 0x05;
pub const HS_BINTERVAL: u8 = 0x05;

/// Size of the OUT / SET_REPORT payload: `[event_index, state]`.
pub const REPORT_SIZE: usize = 2;

/// Length of the application report descriptor, advertised in the class
/// descriptor's `wItemLength`.
pub const REPORT_DESCRIPTOR_SIZE: usize = 163;

// WebUSB

/// `bRequest` of the WebUSB vendor request. Must match the WebUSB BOS
/// platform capability.
pub const WEBUSB_VENDOR_CODE: u8 = 0x22;

/// Landing page URL index advertised in the BOS capability.
pub const WEBUSB_LANDING_PAGE_INDEX: u8 = 1;

/// URL scheme prefix: 0x00 = `http://`, 0x01 = `https://`.
pub const WEBUSB_URL_SCHEME: u8 = 0x01;

/// Landing page, without the scheme prefix.
pub const WEBUSB_URL: &str = "elmot.xyz";

// MS OS 2.0

/// `bRequest` of the MS OS 2.0 descriptor-set request. Must match the
/// MS OS 2.0 BOS platform capability.
pub const MS_OS_20_VENDOR_CODE: u8 = 0x20;

/// Minimum Windows version the descriptor set applies to (Windows 8.1).
pub const MS_OS_20_WINDOWS_VERSION: u32 = 0x0603_0000;

/// Device interface GUID registered for WinUSB clients.
pub const DEVICE_INTERFACE_GUID: &str = "{8D3C6D1A-7E0F-4B52-9C3A-5F2E1B7A4C10}";

// Application

/// Number of lamps driven by OUT events.
pub const LAMP_COUNT: usize = 3;

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
