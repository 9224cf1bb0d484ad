mod hx711;
mod load_cell;

pub use hx711::{Gain, Hx711};
pub use load_cell::{Calibration, LoadCell};

use thiserror_no_std::Error;

/// Errors raised while reading the thrust transducer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The converter never signalled a completed conversion
    #[error("{sensor} not ready after {waited_ms} ms")]
    NotReady {
        sensor: &'static str,
        waited_ms: u32,
    },
    /// The converter returned a full-scale code (open bridge or overload)
    #[error("{sensor} reading saturated at {raw}")]
    Saturated { sensor: &'static str, raw: i32 },
    /// A GPIO line to the converter reported an error
    #[error("{sensor} pin error")]
    Pin { sensor: &'static str },
    /// Taring needs at least one reading
    #[error("{sensor} tare requested with zero samples")]
    EmptyTare { sensor: &'static str },
}

impl SensorError {
    /// Short machine-readable name used in status payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotReady { .. } => "not_ready",
            Self::Saturated { .. } => "saturated",
            Self::Pin { .. } => "pin",
            Self::EmptyTare { .. } => "empty_tare",
        }
    }
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Reading;

    /// Read the sensor and return one reading.
    fn read(&mut self) -> impl Future<Output = Result<Self::Reading, SensorError>>;
}
