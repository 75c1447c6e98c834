//! Descriptor repository - immutable, byte-exact tables contributed by the class.
//!
//! Layout of the configuration descriptor (41 bytes):
//! ```text
//! Offset  0: Configuration descriptor (9)
//! Offset  9: Interface descriptor, vendor class 0xFF, 2 endpoints (9)
//! Offset 18: Class descriptor, one 163-byte report descriptor (9)
//! Offset 27: Endpoint 0x81, interrupt IN, 2 bytes (7)
//! Offset 34: Endpoint 0x01, interrupt OUT, 2 bytes (7)
//! ```
//!
//! The two vendor extensions (WebUSB URL, MS OS 2.0 set) and the BOS
//! platform capabilities that advertise them are built at compile time
//! from the strings in [`crate::config`].

use crate::config::{
    DEVICE_INTERFACE_GUID, EP_IN_ADDRESS, EP_IN_SIZE, EP_OUT_ADDRESS, EP_OUT_SIZE, FS_BINTERVAL,
    HS_BINTERVAL, MS_OS_20_VENDOR_CODE, MS_OS_20_WINDOWS_VERSION, REPORT_DESCRIPTOR_SIZE,
    WEBUSB_LANDING_PAGE_INDEX, WEBUSB_URL, WEBUSB_URL_SCHEME, WEBUSB_VENDOR_CODE,
};

// Standard descriptor types (USB 2.0 table 9-5)

pub const DESC_TYPE_CONFIGURATION: u8 = 0x02;
pub const DESC_TYPE_INTERFACE: u8 = 0x04;
pub const DESC_TYPE_ENDPOINT: u8 = 0x05;
pub const DESC_TYPE_DEVICE_QUALIFIER: u8 = 0x06;
pub const DESC_TYPE_OTHER_SPEED_CONFIGURATION: u8 = 0x07;
pub const DESC_TYPE_DEVICE_CAPABILITY: u8 = 0x10;

/// `bDevCapabilityType` of a BOS platform capability.
pub const DEV_CAPABILITY_PLATFORM: u8 = 0x05;

/// Class descriptor type, requested via GET_DESCRIPTOR high byte 0x21.
pub const DESC_TYPE_CLASS: u8 = 0x21;
/// Report descriptor type, requested via GET_DESCRIPTOR high byte 0x22.
pub const DESC_TYPE_REPORT: u8 = 0x22;

/// WebUSB URL descriptor type.
pub const DESC_TYPE_WEBUSB_URL: u8 = 0x03;

const ENDPOINT_ATTR_INTERRUPT: u8 = 0x03;
const INTERFACE_CLASS_VENDOR: u8 = 0xFF;

pub const CONFIG_DESC_SIZE: usize = 41;
pub const CLASS_DESC_SIZE: usize = 9;
pub const DEVICE_QUALIFIER_DESC_SIZE: usize = 10;
pub const WEBUSB_URL_DESC_SIZE: usize = 3 + WEBUSB_URL.len();
pub const MS_OS_20_SET_SIZE: usize = 162;
const WEBUSB_CAPABILITY_SIZE: usize = 24;
const MS_OS_20_CAPABILITY_SIZE: usize = 28;
/// bLength, bDescriptorType and bDevCapabilityType.
const CAPABILITY_HEADER_SIZE: usize = 3;
pub const BOS_PLATFORM_CAPABILITIES_SIZE: usize = WEBUSB_CAPABILITY_SIZE + MS_OS_20_CAPABILITY_SIZE;

const _: () = assert!(WEBUSB_URL_DESC_SIZE <= u8::MAX as usize);
const _: () = assert!(DEVICE_INTERFACE_GUID.len() == 38);
const _: () = assert!(REPORT_DESCRIPTOR_SIZE <= u16::MAX as usize);

/// Bus speed selector for the configuration descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Full,
    High,
}

const fn lo(v: u16) -> u8 {
    (v & 0xFF) as u8
}

const fn hi(v: u16) -> u8 {
    (v >> 8) as u8
}

const fn class_descriptor_bytes() -> [u8; CLASS_DESC_SIZE] {
    let report_len = REPORT_DESCRIPTOR_SIZE as u16;
    [
        0x09,            // bLength
        DESC_TYPE_CLASS, // bDescriptorType
        0x11,            // bcdClass 1.11
        0x01,
        0x00,             // bCountryCode
        0x01,             // bNumDescriptors
        DESC_TYPE_REPORT, // bDescriptorType (report)
        lo(report_len),   // wItemLength
        hi(report_len),
    ]
}

const fn configuration_descriptor_bytes(descriptor_type: u8, interval: u8) -> [u8; CONFIG_DESC_SIZE] {
    let total = CONFIG_DESC_SIZE as u16;
    let class = class_descriptor_bytes();
    [
        // - Configuration -
        0x09,
        descriptor_type,
        lo(total), // wTotalLength
        hi(total),
        0x01, // bNumInterfaces
        0x01, // bConfigurationValue
        0x00, // iConfiguration
        0x80, // bmAttributes: bus powered
        0x32, // bMaxPower: 100 mA
        //
        // - Vendor-specific interface -
        0x09,
        DESC_TYPE_INTERFACE,
        0x00, // bInterfaceNumber
        0x00, // bAlternateSetting
        0x02, // bNumEndpoints
        INTERFACE_CLASS_VENDOR,
        0x00, // bInterfaceSubClass
        0x00, // bInterfaceProtocol
        0x00, // iInterface
        //
        // - Class descriptor -
        class[0],
        class[1],
        class[2],
        class[3],
        class[4],
        class[5],
        class[6],
        class[7],
        class[8],
        //
        // - Endpoint IN -
        0x07,
        DESC_TYPE_ENDPOINT,
        EP_IN_ADDRESS,
        ENDPOINT_ATTR_INTERRUPT,
        lo(EP_IN_SIZE),
        hi(EP_IN_SIZE),
        interval,
        //
        // - Endpoint OUT -
        0x07,
        DESC_TYPE_ENDPOINT,
        EP_OUT_ADDRESS,
        ENDPOINT_ATTR_INTERRUPT,
        lo(EP_OUT_SIZE),
        hi(EP_OUT_SIZE),
        interval,
    ]
}

const fn webusb_url_descriptor_bytes(scheme: u8, url: &str) -> [u8; WEBUSB_URL_DESC_SIZE] {
    let url = url.as_bytes();
    let mut out = [0u8; WEBUSB_URL_DESC_SIZE];
    out[0] = WEBUSB_URL_DESC_SIZE as u8;
    out[1] = DESC_TYPE_WEBUSB_URL;
    out[2] = scheme;
    let mut i = 0;
    while i < url.len() {
        out[3 + i] = url[i];
        i += 1;
    }
    out
}

/// Builds the MS OS 2.0 descriptor set:
///
/// ```text
/// Offset   0: Set header (10)              wTotalLength = 162
/// Offset  10: Compatible ID feature (20)   "WINUSB"
/// Offset  30: Registry property (132)      DeviceInterfaceGUIDs, REG_MULTI_SZ
/// ```
const fn ms_os_20_descriptor_set_bytes(windows_version: u32, guid: &str) -> [u8; MS_OS_20_SET_SIZE] {
    const SET_HEADER: u16 = 0x00;
    const FEATURE_COMPATIBLE_ID: u16 = 0x03;
    const FEATURE_REG_PROPERTY: u16 = 0x04;
    const REG_MULTI_SZ: u16 = 0x07;
    const PROPERTY_NAME: &[u8] = b"DeviceInterfaceGUIDs";

    let mut out = [0u8; MS_OS_20_SET_SIZE];
    let version = windows_version.to_le_bytes();

    // Set header
    out[0] = 10;
    out[2] = lo(SET_HEADER);
    out[3] = hi(SET_HEADER);
    out[4] = version[0];
    out[5] = version[1];
    out[6] = version[2];
    out[7] = version[3];
    out[8] = lo(MS_OS_20_SET_SIZE as u16);
    out[9] = hi(MS_OS_20_SET_SIZE as u16);

    // Compatible ID: 8-byte CompatibleID + 8-byte SubCompatibleID, NUL padded
    out[10] = 20;
    out[12] = lo(FEATURE_COMPATIBLE_ID);
    out[13] = hi(FEATURE_COMPATIBLE_ID);
    let compat = b"WINUSB";
    let mut i = 0;
    while i < compat.len() {
        out[14 + i] = compat[i];
        i += 1;
    }

    // Registry property: name and data are NUL-terminated UTF-16LE, the
    // data additionally ends the multi-string with a second NUL.
    let name_len = (PROPERTY_NAME.len() + 1) * 2;
    let data_len = (guid.len() + 2) * 2;
    let feature_len = 10 + name_len + data_len;
    out[30] = lo(feature_len as u16);
    out[31] = hi(feature_len as u16);
    out[32] = lo(FEATURE_REG_PROPERTY);
    out[33] = hi(FEATURE_REG_PROPERTY);
    out[34] = lo(REG_MULTI_SZ);
    out[35] = hi(REG_MULTI_SZ);
    out[36] = lo(name_len as u16);
    out[37] = hi(name_len as u16);
    let mut at = 38;
    i = 0;
    while i < PROPERTY_NAME.len() {
        out[at] = PROPERTY_NAME[i];
        at += 2;
        i += 1;
    }
    at += 2;
    out[at] = lo(data_len as u16);
    out[at + 1] = hi(data_len as u16);
    at += 2;
    let guid = guid.as_bytes();
    i = 0;
    while i < guid.len() {
        out[at] = guid[i];
        at += 2;
        i += 1;
    }
    assert!(at + 4 == MS_OS_20_SET_SIZE);
    out
}

const fn bos_platform_capabilities_bytes() -> [u8; BOS_PLATFORM_CAPABILITIES_SIZE] {
    // {3408B638-09A9-47A0-8BFD-A0768815B665}
    const WEBUSB_UUID: [u8; 16] = [
        0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09, 0xA0, 0x47, 0x8B, 0xFD, 0xA0, 0x76, 0x88, 0x15, 0xB6, 0x65,
    ];
    // {D8DD60DF-4589-4CC7-9CD2-659D9E648A9F}
    const MS_OS_20_UUID: [u8; 16] = [
        0xDF, 0x60, 0xDD, 0xD8, 0x89, 0x45, 0xC7, 0x4C, 0x9C, 0xD2, 0x65, 0x9D, 0x9E, 0x64, 0x8A, 0x9F,
    ];

    let mut out = [0u8; BOS_PLATFORM_CAPABILITIES_SIZE];

    // WebUSB platform capability (24)
    out[0] = 24;
    out[1] = DESC_TYPE_DEVICE_CAPABILITY;
    out[2] = DEV_CAPABILITY_PLATFORM;
    let mut i = 0;
    while i < 16 {
        out[4 + i] = WEBUSB_UUID[i];
        i += 1;
    }
    out[20] = 0x00; // bcdVersion 1.0
    out[21] = 0x01;
    out[22] = WEBUSB_VENDOR_CODE;
    out[23] = WEBUSB_LANDING_PAGE_INDEX;

    // MS OS 2.0 platform capability (28)
    out[24] = 28;
    out[25] = DESC_TYPE_DEVICE_CAPABILITY;
    out[26] = DEV_CAPABILITY_PLATFORM;
    i = 0;
    while i < 16 {
        out[28 + i] = MS_OS_20_UUID[i];
        i += 1;
    }
    let version = MS_OS_20_WINDOWS_VERSION.to_le_bytes();
    out[44] = version[0];
    out[45] = version[1];
    out[46] = version[2];
    out[47] = version[3];
    out[48] = lo(MS_OS_20_SET_SIZE as u16);
    out[49] = hi(MS_OS_20_SET_SIZE as u16);
    out[50] = MS_OS_20_VENDOR_CODE;
    out[51] = 0x00; // bAltEnumCode
    out
}

static CONFIG_FS_DESC: [u8; CONFIG_DESC_SIZE] =
    configuration_descriptor_bytes(DESC_TYPE_CONFIGURATION, FS_BINTERVAL);

static CONFIG_HS_DESC: [u8; CONFIG_DESC_SIZE] =
    configuration_descriptor_bytes(DESC_TYPE_CONFIGURATION, HS_BINTERVAL);

static OTHER_SPEED_CONFIG_DESC: [u8; CONFIG_DESC_SIZE] =
    configuration_descriptor_bytes(DESC_TYPE_OTHER_SPEED_CONFIGURATION, FS_BINTERVAL);

static CLASS_DESC: [u8; CLASS_DESC_SIZE] = class_descriptor_bytes();

static DEVICE_QUALIFIER_DESC: [u8; DEVICE_QUALIFIER_DESC_SIZE] = [
    DEVICE_QUALIFIER_DESC_SIZE as u8,
    DESC_TYPE_DEVICE_QUALIFIER,
    0x00, // bcdUSB 2.00
    0x02,
    0x00, // bDeviceClass
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    0x40, // bMaxPacketSize0
    0x01, // bNumConfigurations
    0x00, // bReserved
];

static WEBUSB_URL_DESC: [u8; WEBUSB_URL_DESC_SIZE] =
    webusb_url_descriptor_bytes(WEBUSB_URL_SCHEME, WEBUSB_URL);

static MS_OS_20_SET: [u8; MS_OS_20_SET_SIZE] =
    ms_os_20_descriptor_set_bytes(MS_OS_20_WINDOWS_VERSION, DEVICE_INTERFACE_GUID);

static BOS_PLATFORM_CAPABILITIES: [u8; BOS_PLATFORM_CAPABILITIES_SIZE] =
    bos_platform_capabilities_bytes();

/// Configuration descriptor for the given bus speed.
pub fn configuration_descriptor(speed: Speed) -> &'static [u8] {
    match speed {
        Speed::Full => &CONFIG_FS_DESC,
        Speed::High => &CONFIG_HS_DESC,
    }
}

/// Other-speed configuration descriptor. Uses the full-speed interval.
pub fn other_speed_configuration_descriptor() -> &'static [u8] {
    &OTHER_SPEED_CONFIG_DESC
}

pub fn device_qualifier_descriptor() -> &'static [u8] {
    &DEVICE_QUALIFIER_DESC
}

/// The 9-byte class descriptor embedded in the configuration descriptor.
pub fn class_descriptor() -> &'static [u8] {
    &CLASS_DESC
}

/// WebUSB URL descriptor for `url_index`. Only the landing page is populated.
pub fn webusb_url_descriptor(url_index: u8) -> Option<&'static [u8]> {
    (url_index == WEBUSB_LANDING_PAGE_INDEX).then_some(&WEBUSB_URL_DESC[..])
}

pub fn ms_os_20_descriptor_set() -> &'static [u8] {
    &MS_OS_20_SET
}

/// WebUSB and MS OS 2.0 platform capabilities, to be appended to the
/// device's BOS descriptor by whoever assembles it.
pub fn bos_platform_capabilities() -> &'static [u8] {
    &BOS_PLATFORM_CAPABILITIES
}

/// The WebUSB and MS OS 2.0 platform capabilities without their 3-byte
/// header, for BOS writers that emit bLength, bDescriptorType and
/// bDevCapabilityType themselves.
pub fn platform_capability_bodies() -> [&'static [u8]; 2] {
    let caps = &BOS_PLATFORM_CAPABILITIES;
    [
        &caps[CAPABILITY_HEADER_SIZE..WEBUSB_CAPABILITY_SIZE],
        &caps[WEBUSB_CAPABILITY_SIZE + CAPABILITY_HEADER_SIZE..],
    ]
}

/// Clamp `table` to what the host asked for in `wLength`.
pub fn truncate(table: &[u8], requested: u16) -> &[u8] {
    let len = table.len().min(usize::from(requested));
    &table[..len]
}
