//! Thrust sample model and in-memory log.

pub mod thrust_log;

pub use thrust_log::*;

use core::fmt;

use serde::{Serialize, Serializer};

/// Number of weight units per kilogram (four decimal places).
pub const UNITS_PER_KG: i32 = 10_000;

/// A load expressed in fixed-point kilograms with four decimal places.
///
/// The inner value counts 1e-4 kg (0.1 g). Keeping readings as integers means
/// the rendered CSV/JSON text never drifts from the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Weight(i32);

impl Weight {
    pub const ZERO: Self = Self(0);

    /// Creates a weight from a raw count of 1e-4 kg.
    pub const fn from_units(units: i32) -> Self {
        Self(units)
    }

    /// Converts kilograms to fixed point, rounding half away from zero.
    ///
    /// Values beyond the `i32` range saturate; NaN maps to zero.
    pub fn from_kg(kg: f32) -> Self {
        let scaled = kg * UNITS_PER_KG as f32;
        let rounded = if scaled >= 0.0 {
            scaled + 0.5
        } else {
            scaled - 0.5
        };
        // `as` saturates at the integer bounds and maps NaN to 0
        Self(rounded as i32)
    }

    pub const fn units(self) -> i32 {
        self.0
    }

    pub fn as_kg(self) -> f64 {
        self.0 as f64 / UNITS_PER_KG as f64
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_kg = UNITS_PER_KG as u32;
        write!(f, "{}{}.{:04}", sign, magnitude / per_kg, magnitude % per_kg)
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_kg())
    }
}

/// One thrust measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Milliseconds since boot (monotonic)
    #[serde(rename = "time")]
    pub timestamp_ms: u64,
    /// Measured load
    pub weight: Weight,
}

impl Sample {
    pub const fn new(timestamp_ms: u64, weight: Weight) -> Self {
        Self {
            timestamp_ms,
            weight,
        }
    }

    /// Writes this sample as one CSV row, including the trailing newline.
    pub fn write_csv_row<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "{},{}", self.timestamp_ms, self.weight)
    }
}
