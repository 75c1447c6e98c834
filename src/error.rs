//! Unified error type for vendor-usb.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Control-request failures are not errors here: the dispatcher answers
//! them with a stall (see `class::control::SetupResponse`).

use core::fmt;

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An interrupt IN transfer is still in flight. Retry after it completes.
    Busy,

    /// The class has no active configuration (no instance context).
    Inactive,

    /// The report does not fit in one interrupt IN packet.
    ReportTooLong,

    /// The application callback reported a failure.
    Application,

    /// USB endpoint I/O failed (endpoint disabled or buffer overflow).
    Usb,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Busy => f.write_str("interrupt IN transfer in flight"),
            Error::Inactive => f.write_str("configuration not active"),
            Error::ReportTooLong => f.write_str("report exceeds IN packet size"),
            Error::Application => f.write_str("application callback failed"),
            Error::Usb => f.write_str("USB endpoint error"),
        }
    }
}
