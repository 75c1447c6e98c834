//! Report I/O: the interrupt IN busy/idle machine, the self-rearming OUT
//! receive loop and the SET_REPORT data-stage path.

use super::{ClassContext, ReportInterface, TransferState, UsbDriver, VendorClass};
use crate::config::{EP_IN_ADDRESS, EP_IN_SIZE, EP_OUT_ADDRESS, REPORT_SIZE};
use crate::error::Error;

impl<I: ReportInterface> VendorClass<I> {
    /// Queue `report` on the interrupt IN endpoint.
    ///
    /// - Not configured: nothing is sent and `Ok(())` is returned, there
    ///   is no channel yet.
    /// - Idle: the report is copied, submitted and the endpoint becomes busy.
    /// - Busy: [`Error::Busy`], the caller retries after the IN completion.
    pub fn send_report<D: UsbDriver>(&mut self, driver: &mut D, report: &[u8]) -> Result<(), Error> {
        if !driver.is_configured() {
            trace!("send_report while unconfigured, dropped");
            return Ok(());
        }

        let ctx = self.context.as_mut().ok_or(Error::Inactive)?;
        if report.len() > usize::from(EP_IN_SIZE) {
            return Err(Error::ReportTooLong);
        }

        match ctx.transfer_state {
            TransferState::Busy => {
                trace!("send_report rejected, IN transfer in flight");
                Err(Error::Busy)
            }
            TransferState::Idle => {
                ctx.transfer_state = TransferState::Busy;
                ctx.in_report[..report.len()].copy_from_slice(report);
                ctx.in_len = report.len();
                driver.transmit(EP_IN_ADDRESS, ctx.in_flight_report());
                Ok(())
            }
        }
    }

    /// Interrupt IN transfer completed. The only way back to idle.
    pub fn on_data_in(&mut self) {
        match self.context.as_mut() {
            Some(ctx) => ctx.transfer_state = TransferState::Idle,
            None => warn!("IN completion with no active configuration"),
        }
    }

    /// Interrupt OUT transfer completed with `data`.
    ///
    /// Delivers `(report[0], report[1])` to the application and re-arms the
    /// endpoint before returning.
    pub fn on_data_out<D: UsbDriver>(&mut self, driver: &mut D, data: &[u8]) {
        let Some(ctx) = self.context.as_mut() else {
            warn!("OUT completion with no active configuration");
            return;
        };

        let [event_index, state] = land(ctx, data);
        debug!("OUT event {} = {}", event_index, state);
        if self.interface.out_event(event_index, state).is_err() {
            warn!("Application rejected OUT event {}", event_index);
        }

        driver.prepare_receive(EP_OUT_ADDRESS, REPORT_SIZE);
    }

    /// EP0 host-to-device data stage completed with `data`.
    ///
    /// Only a pending SET_REPORT consumes it.
    pub fn on_ep0_rx_ready(&mut self, data: &[u8]) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if !ctx.is_report_available {
            return;
        }

        let [event_index, state] = land(ctx, data);
        debug!("SET_REPORT event {} = {}", event_index, state);
        if self.interface.out_event(event_index, state).is_err() {
            warn!("Application rejected SET_REPORT event {}", event_index);
        }
        ctx.is_report_available = false;
    }
}

/// Copy received bytes into the report buffer. A short packet leaves the
/// tail of the buffer as it was.
fn land(ctx: &mut ClassContext, data: &[u8]) -> [u8; REPORT_SIZE] {
    let n = data.len().min(REPORT_SIZE);
    ctx.report_buffer[..n].copy_from_slice(&data[..n]);
    ctx.report_buffer
}
