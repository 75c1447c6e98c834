//! Configuration activation and teardown.

use super::{ClassContext, EndpointType, ReportInterface, UsbDriver, VendorClass};
use crate::config::{EP_IN_ADDRESS, EP_IN_SIZE, EP_OUT_ADDRESS, EP_OUT_SIZE, REPORT_SIZE};
use crate::error::Error;

impl<I: ReportInterface> VendorClass<I> {
    /// Bring the class up for configuration `config_index`.
    ///
    /// Opens both interrupt endpoints, creates a fresh context, runs the
    /// application's `init()` and arms the OUT endpoint for the first
    /// report. The class is active when this returns, even if `init()`
    /// failed; the failure is reported as [`Error::Application`].
    pub fn activate<D: UsbDriver>(&mut self, driver: &mut D, config_index: u8) -> Result<(), Error> {
        driver.open_endpoint(EP_IN_ADDRESS, EndpointType::Interrupt, EP_IN_SIZE);
        driver.set_endpoint_used(EP_IN_ADDRESS, true);

        driver.open_endpoint(EP_OUT_ADDRESS, EndpointType::Interrupt, EP_OUT_SIZE);
        driver.set_endpoint_used(EP_OUT_ADDRESS, true);

        if self.context.is_some() {
            warn!("Configuration {} activated twice, resetting class state", config_index);
        }
        self.context = Some(ClassContext::new());

        let init = self.interface.init();
        if init.is_err() {
            warn!("Application init failed");
        }

        driver.prepare_receive(EP_OUT_ADDRESS, REPORT_SIZE);

        info!("Vendor class active (configuration {})", config_index);
        init
    }

    /// Tear the class down. Safe to call when no configuration is active.
    pub fn deactivate<D: UsbDriver>(&mut self, driver: &mut D, config_index: u8) {
        driver.close_endpoint(EP_IN_ADDRESS);
        driver.set_endpoint_used(EP_IN_ADDRESS, false);

        driver.close_endpoint(EP_OUT_ADDRESS);
        driver.set_endpoint_used(EP_OUT_ADDRESS, false);

        if self.context.take().is_some() {
            if self.interface.deinit().is_err() {
                warn!("Application deinit failed");
            }
            info!("Vendor class inactive (configuration {})", config_index);
        }
    }
}
