//! HX711 24-bit bridge ADC driver
//!
//! Bit-banged over two GPIO lines: DOUT (data out of the converter) and SCK
//! (clock driven by the MCU). A conversion is complete when DOUT goes low;
//! 24 clock pulses then shift the two's-complement result out MSB first, and
//! 1-3 extra pulses select the channel and gain for the next conversion.
//!
//! SCK must not stay high for more than 60 µs or the converter powers down,
//! so the shift-out runs inside a critical section with blocking delays. The
//! wait for DOUT uses the async delay and yields to the executor.

use embedded_hal::delay::DelayNs as BlockingDelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

use super::{Sensor, SensorError};

const SENSOR_NAME: &str = "HX711";

/// Default time to wait for a conversion. At the 10 SPS rate a conversion
/// completes every 100 ms, so this covers several periods.
const DEFAULT_READY_TIMEOUT_MS: u32 = 500;

/// Poll period while waiting for DOUT to go low
const READY_POLL_MS: u32 = 1;

/// Half-period of the shift clock
const CLOCK_HALF_PERIOD_US: u32 = 1;

const RAW_MAX: i32 = 0x7F_FFFF;
const RAW_MIN: i32 = -0x80_0000;

/// Input channel and gain selected for the next conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128
    #[default]
    A128,
    /// Channel B, gain 32
    B32,
    /// Channel A, gain 64
    A64,
}

impl Gain {
    /// Extra clock pulses after the 24 data bits
    const fn extra_pulses(self) -> u8 {
        match self {
            Self::A128 => 1,
            Self::B32 => 2,
            Self::A64 => 3,
        }
    }
}

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    gain: Gain,
    ready_timeout_ms: u32,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: BlockingDelayNs + AsyncDelayNs,
{
    /// Creates the driver and drives SCK low so the converter stays powered.
    pub fn new(dout: DOUT, mut sck: SCK, delay: D) -> Result<Self, SensorError> {
        sck.set_low().map_err(|_| pin_error())?;

        Ok(Self {
            dout,
            sck,
            delay,
            gain: Gain::default(),
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
        })
    }

    /// Gain applies from the conversion after the next read.
    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_ready_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.ready_timeout_ms = timeout_ms;
        self
    }

    /// A conversion is waiting when DOUT is low.
    pub fn is_ready(&mut self) -> Result<bool, SensorError> {
        self.dout.is_low().map_err(|_| pin_error())
    }

    async fn wait_ready(&mut self) -> Result<(), SensorError> {
        let mut waited_ms = 0;
        while !self.is_ready()? {
            if waited_ms >= self.ready_timeout_ms {
                return Err(SensorError::NotReady {
                    sensor: SENSOR_NAME,
                    waited_ms,
                });
            }
            AsyncDelayNs::delay_ms(&mut self.delay, READY_POLL_MS).await;
            waited_ms += READY_POLL_MS;
        }
        Ok(())
    }

    /// Clocks out one conversion. Must only be called once DOUT is low.
    fn shift_in(&mut self) -> Result<i32, SensorError> {
        let Self {
            dout,
            sck,
            delay,
            gain,
            ..
        } = self;

        critical_section::with(|_| {
            let mut value: u32 = 0;
            for _ in 0..24 {
                sck.set_high().map_err(|_| pin_error())?;
                BlockingDelayNs::delay_us(delay, CLOCK_HALF_PERIOD_US);
                let bit = dout.is_high().map_err(|_| pin_error())?;
                sck.set_low().map_err(|_| pin_error())?;
                BlockingDelayNs::delay_us(delay, CLOCK_HALF_PERIOD_US);
                value = (value << 1) | bit as u32;
            }

            for _ in 0..gain.extra_pulses() {
                sck.set_high().map_err(|_| pin_error())?;
                BlockingDelayNs::delay_us(delay, CLOCK_HALF_PERIOD_US);
                sck.set_low().map_err(|_| pin_error())?;
                BlockingDelayNs::delay_us(delay, CLOCK_HALF_PERIOD_US);
            }

            Ok(sign_extend_24(value))
        })
    }
}

impl<DOUT, SCK, D> Sensor for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: BlockingDelayNs + AsyncDelayNs,
{
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        self.wait_ready().await?;
        let raw = self.shift_in()?;

        if raw == RAW_MAX || raw == RAW_MIN {
            return Err(SensorError::Saturated {
                sensor: SENSOR_NAME,
                raw,
            });
        }
        Ok(raw)
    }
}

const fn pin_error() -> SensorError {
    SensorError::Pin {
        sensor: SENSOR_NAME,
    }
}

const fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}
