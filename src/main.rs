//! Traffic light firmware for the nRF52840-DK.
//!
//! The host drives the three lamps (LED1..LED3) through 2-byte OUT reports
//! or SET_REPORT, and receives a 2-byte IN report whenever a button
//! (BUTTON1, BUTTON2) changes state.

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::select;
use embassy_nrf::config::{Config as NrfConfig, HfclkSource};
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_time::Timer;
use embassy_usb::UsbDevice;
use {defmt_rtt as _, panic_probe as _};

use vendor_usb::config::{BUTTON_DEBOUNCE_MS, LAMP_COUNT};
use vendor_usb::usb::vendor_device::{run_in_pump, run_out_pump, VendorDevice};
use vendor_usb::usb::{self, NrfEndpointIn, NrfEndpointOut, NrfUsbDriver};
use vendor_usb::{Error, TrafficLight};

static VENDOR: VendorDevice<TrafficLight> = VendorDevice::new(TrafficLight::new());

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // USB needs the external crystal.
    let mut nrf_config = NrfConfig::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    info!("vendor-usb starting");

    // DK LEDs are active low.
    let lamps = [
        Output::new(p.P0_13, Level::High, OutputDrive::Standard),
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_15, Level::High, OutputDrive::Standard),
    ];
    let button1 = Input::new(p.P0_11, Pull::Up);
    let button2 = Input::new(p.P0_12, Pull::Up);

    let usb = usb::init(p.USBD, &VENDOR);

    spawner.must_spawn(usb_task(usb.device));
    spawner.must_spawn(in_pump_task(usb.ep_in));
    spawner.must_spawn(out_pump_task(usb.ep_out));
    spawner.must_spawn(lamp_task(lamps));
    spawner.must_spawn(button_task(button1, button2));
}

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, NrfUsbDriver>) -> ! {
    usb::run_usb_device(device).await
}

#[embassy_executor::task]
async fn in_pump_task(ep: NrfEndpointIn) -> ! {
    run_in_pump(&VENDOR, ep).await
}

#[embassy_executor::task]
async fn out_pump_task(ep: NrfEndpointOut) -> ! {
    run_out_pump(&VENDOR, ep).await
}

/// Mirror the application's lamp state onto the LEDs.
#[embassy_executor::task]
async fn lamp_task(mut leds: [Output<'static>; LAMP_COUNT]) -> ! {
    loop {
        VENDOR.app_event().await;

        let (changed, mask) = VENDOR.with_app(|app| (app.take_changed(), app.lamp_mask()));
        if !changed {
            continue;
        }
        for (i, led) in leds.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                led.set_low();
            } else {
                led.set_high();
            }
        }
    }
}

/// Report button changes to the host.
#[embassy_executor::task]
async fn button_task(mut button1: Input<'static>, mut button2: Input<'static>) -> ! {
    let mut last = 0u8;
    loop {
        select(button1.wait_for_any_edge(), button2.wait_for_any_edge()).await;
        Timer::after_millis(BUTTON_DEBOUNCE_MS).await;

        let buttons = u8::from(button1.is_low()) | (u8::from(button2.is_low()) << 1);
        if buttons == last {
            continue;
        }
        last = buttons;

        let report = VENDOR.with_app(|app| app.input_report(buttons));
        send_report(&report).await;
    }
}

/// Submit `report`, waiting out an in-flight transfer.
async fn send_report(report: &[u8]) {
    loop {
        match VENDOR.send_report(report) {
            Ok(()) => return,
            Err(Error::Busy) => Timer::after_millis(1).await,
            Err(e) => {
                warn!("Button report dropped: {}", e);
                return;
            }
        }
    }
}
