//! Traffic light application - the report consumer/producer bound to the class.
//!
//! Report layout:
//! ```text
//! OUT (2 bytes): Byte 0 = lamp index (0 red, 1 yellow, 2 green)
//!                Byte 1 = lamp state (0 off, anything else on)
//! IN  (2 bytes): Byte 0 = button bitmask
//!                Byte 1 = lamp bitmask (bit n = lamp n lit)
//! ```

use crate::class::ReportInterface;
use crate::config::{LAMP_COUNT, REPORT_DESCRIPTOR_SIZE, REPORT_SIZE};
use crate::error::Error;

/// Lamp positions, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Lamp {
    Red = 0,
    Yellow = 1,
    Green = 2,
}

impl Lamp {
    pub const ALL: [Lamp; LAMP_COUNT] = [Lamp::Red, Lamp::Yellow, Lamp::Green];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

/// Lamp state driven by host OUT events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrafficLight {
    lamps: [bool; LAMP_COUNT],
    running: bool,
    changed: bool,
}

impl TrafficLight {
    pub const fn new() -> Self {
        Self {
            lamps: [false; LAMP_COUNT],
            running: false,
            changed: false,
        }
    }

    pub fn is_lit(&self, lamp: Lamp) -> bool {
        self.lamps[lamp as usize]
    }

    /// `true` between `init()` and `deinit()`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Bit n set when lamp n is lit.
    pub fn lamp_mask(&self) -> u8 {
        self.lamps
            .iter()
            .enumerate()
            .fold(0, |mask, (i, &lit)| mask | (u8::from(lit) << i))
    }

    /// Returns `true` once after any lamp changed.
    pub fn take_changed(&mut self) -> bool {
        core::mem::take(&mut self.changed)
    }

    /// Build the IN report for the current button state.
    pub fn input_report(&self, buttons: u8) -> [u8; REPORT_SIZE] {
        [buttons, self.lamp_mask()]
    }

    fn set_all(&mut self, lit: bool) {
        if self.lamps.iter().any(|&l| l != lit) {
            self.lamps = [lit; LAMP_COUNT];
            self.changed = true;
        }
    }
}

impl ReportInterface for TrafficLight {
    fn init(&mut self) -> Result<(), Error> {
        self.set_all(false);
        self.running = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Error> {
        self.set_all(false);
        self.running = false;
        Ok(())
    }

    fn out_event(&mut self, event_index: u8, state: u8) -> Result<(), Error> {
        let lamp = Lamp::from_index(event_index).ok_or(Error::Application)?;
        let lit = state != 0;
        if self.lamps[lamp as usize] != lit {
            self.lamps[lamp as usize] = lit;
            self.changed = true;
        }
        Ok(())
    }

    fn report_descriptor(&self) -> &[u8; REPORT_DESCRIPTOR_SIZE] {
        &TRAFFIC_LIGHT_REPORT_DESCRIPTOR
    }
}

/// Report descriptor advertised through GET_DESCRIPTOR (0x22).
///
/// Vendor usage page with one input report (buttons, lamps), one output
/// collection per lamp and a per-lamp phase duration feature.
pub static TRAFFIC_LIGHT_REPORT_DESCRIPTOR: [u8; REPORT_DESCRIPTOR_SIZE] = [
    0x06, 0x00, 0xFF,               // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01,                     // Usage (Traffic Light)
    0xA1, 0x01,                     // Collection (Application)
    0x15, 0x00,                     //   Logical Minimum (0)
    0x26, 0xFF, 0x00,               //   Logical Maximum (255)
    0x75, 0x08,                     //   Report Size (8)
    0x95, 0x01,                     //   Report Count (1)
    0x09, 0x10,                     //   Usage (Button Mask)
    0x81, 0x02,                     //   Input (Data, Variable, Absolute)
    0x09, 0x11,                     //   Usage (Lamp Mask)
    0x81, 0x02,                     //   Input (Data, Variable, Absolute)
    0x09, 0x20,                     //   Usage (Red Lamp)
    0xA1, 0x02,                     //   Collection (Logical)
    0x09, 0x30,                     //     Usage (Lamp Index)
    0x15, 0x00,                     //     Logical Minimum (0)
    0x25, 0x00,                     //     Logical Maximum (0)
    0x75, 0x08,                     //     Report Size (8)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x31,                     //     Usage (Lamp State)
    0x15, 0x00,                     //     Logical Minimum (0)
    0x25, 0x01,                     //     Logical Maximum (1)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x32,                     //     Usage (Phase Duration)
    0x27, 0xFF, 0xFF, 0x00, 0x00,   //     Logical Maximum (65535)
    0x75, 0x10,                     //     Report Size (16)
    0x55, 0x0D,                     //     Unit Exponent (-3)
    0x66, 0x01, 0x10,               //     Unit (Seconds)
    0xB1, 0x02,                     //     Feature (Data, Variable, Absolute)
    0x65, 0x00,                     //     Unit (None)
    0x55, 0x00,                     //     Unit Exponent (0)
    0xC0,                           //   End Collection
    0x09, 0x21,                     //   Usage (Yellow Lamp)
    0xA1, 0x02,                     //   Collection (Logical)
    0x09, 0x30,                     //     Usage (Lamp Index)
    0x15, 0x01,                     //     Logical Minimum (1)
    0x25, 0x01,                     //     Logical Maximum (1)
    0x75, 0x08,                     //     Report Size (8)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x31,                     //     Usage (Lamp State)
    0x15, 0x00,                     //     Logical Minimum (0)
    0x25, 0x01,                     //     Logical Maximum (1)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x32,                     //     Usage (Phase Duration)
    0x27, 0xFF, 0xFF, 0x00, 0x00,   //     Logical Maximum (65535)
    0x75, 0x10,                     //     Report Size (16)
    0x55, 0x0D,                     //     Unit Exponent (-3)
    0x66, 0x01, 0x10,               //     Unit (Seconds)
    0xB1, 0x02,                     //     Feature (Data, Variable, Absolute)
    0x65, 0x00,                     //     Unit (None)
    0x55, 0x00,                     //     Unit Exponent (0)
    0xC0,                           //   End Collection
    0x09, 0x22,                     //   Usage (Green Lamp)
    0xA1, 0x02,                     //   Collection (Logical)
    0x09, 0x30,                     //     Usage (Lamp Index)
    0x15, 0x02,                     //     Logical Minimum (2)
    0x25, 0x02,                     //     Logical Maximum (2)
    0x75, 0x08,                     //     Report Size (8)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x31,                     //     Usage (Lamp State)
    0x15, 0x00,                     //     Logical Minimum (0)
    0x25, 0x01,                     //     Logical Maximum (1)
    0x91, 0x02,                     //     Output (Data, Variable, Absolute)
    0x09, 0x32,                     //     Usage (Phase Duration)
    0x27, 0xFF, 0xFF, 0x00, 0x00,   //     Logical Maximum (65535)
    0x75, 0x10,                     //     Report Size (16)
    0x55, 0x0D,                     //     Unit Exponent (-3)
    0x66, 0x01, 0x10,               //     Unit (Seconds)
    0xB1, 0x02,                     //     Feature (Data, Variable, Absolute)
    0x65, 0x00,                     //     Unit (None)
    0x55, 0x00,                     //     Unit Exponent (0)
    0xC0,                           //   End Collection
    0x09, 0x40,                     //   Usage (Firmware Version)
    0x26, 0xFF, 0x00,               //   Logical Maximum (255)
    0x75, 0x08,                     //   Report Size (8)
    0xB1, 0x03,                     //   Feature (Constant, Variable, Absolute)
    0xC0,                           // End Collection
];
