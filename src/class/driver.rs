//! Boundary to the USB peripheral driver.
//!
//! The class never touches hardware directly. Endpoint management and
//! transfer submission go through [`UsbDriver`]; completions come back as
//! calls into [`VendorClass`](super::VendorClass).

/// Device state as tracked by the USB stack (USB 2.0 §9.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Default,
    Addressed,
    Configured,
    Suspended,
}

/// Endpoint transfer type, encoded as in `bmAttributes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EndpointType {
    Control = 0x00,
    Isochronous = 0x01,
    Bulk = 0x02,
    Interrupt = 0x03,
}

/// Operations the class needs from the underlying USB device driver.
///
/// Implementations must copy `data` in [`transmit`](UsbDriver::transmit)
/// if the transfer outlives the call. Received bytes are handed back
/// through `VendorClass::on_data_out`.
pub trait UsbDriver {
    fn device_state(&self) -> DeviceState;

    fn open_endpoint(&mut self, address: u8, ep_type: EndpointType, max_packet_size: u16);

    fn close_endpoint(&mut self, address: u8);

    /// Record endpoint ownership in the device's endpoint table.
    fn set_endpoint_used(&mut self, address: u8, used: bool);

    /// Start an IN transfer on `address`.
    fn transmit(&mut self, address: u8, data: &[u8]);

    /// Arm `address` to receive up to `len` bytes.
    fn prepare_receive(&mut self, address: u8, len: usize);

    fn is_configured(&self) -> bool {
        self.device_state() == DeviceState::Configured
    }
}
