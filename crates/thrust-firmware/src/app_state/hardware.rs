//! Hardware initialization for the test stand
//!
//! Pin assignments match the stand's wiring harness: HX711 data on GPIO17,
//! HX711 clock on GPIO18, ignition gate on GPIO3.

use embassy_time::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig};
use esp_hal::peripherals::{GPIO3, GPIO17, GPIO18};
use log::info;
use static_cell::StaticCell;

use thrust_core::app_state::{SharedStand, StandError, TestStand};
use thrust_core::config::StandConfig;
use thrust_core::sensors::{Calibration, Hx711, LoadCell};

pub type StandHx711 = Hx711<Input<'static>, Output<'static>, Delay>;
pub type StandLoadCell = LoadCell<StandHx711>;
pub type FirmwareStand = SharedStand<Output<'static>>;

/// Configure the HX711 pins and wrap the converter in the stand calibration.
///
/// SCK idles low; holding it high for more than 60 µs powers the HX711 down.
pub fn init_load_cell(
    dout: GPIO17<'static>,
    sck: GPIO18<'static>,
    config: &StandConfig,
) -> Result<StandLoadCell, StandError> {
    let dout = Input::new(dout, InputConfig::default());
    let sck = Output::new(sck, Level::Low, OutputConfig::default());

    let hx711 = Hx711::new(dout, sck, Delay)?;
    info!("HX711 ready (DOUT=GPIO17, SCK=GPIO18)");

    Ok(LoadCell::new(
        hx711,
        Calibration::new(config.calibration_factor),
    ))
}

/// Build the one shared stand around the ignition gate.
///
/// The gate starts low and stays low until an ignite command arrives.
pub fn init_stand(
    ignite: GPIO3<'static>,
    config: &StandConfig,
) -> Result<&'static FirmwareStand, StandError> {
    static STAND: StaticCell<FirmwareStand> = StaticCell::new();

    let gate = Output::new(ignite, Level::Low, OutputConfig::default());
    let stand = TestStand::new(gate, config.log_policy)?;
    info!("Ignition gate on GPIO3, log policy {:?}", config.log_policy);

    Ok(STAND.init(SharedStand::new(stand)))
}
