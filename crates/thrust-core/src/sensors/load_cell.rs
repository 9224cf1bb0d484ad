//! Linear load-cell calibration on top of a raw ADC source

use log::info;

use super::{Sensor, SensorError};
use crate::storage::Weight;

/// Converts raw converter counts to kilograms: `(raw - offset) / factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw counts per kilogram
    pub factor: f32,
    /// Zero-load raw reading
    pub offset: i32,
}

impl Calibration {
    pub const fn new(factor: f32) -> Self {
        Self { factor, offset: 0 }
    }

    pub fn to_weight(&self, raw: i32) -> Weight {
        let counts = raw as i64 - self.offset as i64;
        Weight::from_kg(counts as f32 / self.factor)
    }
}

/// A raw-count sensor with a fixed linear calibration applied.
pub struct LoadCell<S> {
    source: S,
    calibration: Calibration,
}

impl<S> LoadCell<S>
where
    S: Sensor<Reading = i32>,
{
    pub fn new(source: S, calibration: Calibration) -> Self {
        Self {
            source,
            calibration,
        }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Averages `samples` unloaded readings and stores the result as the
    /// zero offset. Must run with no load on the stand.
    pub async fn tare(&mut self, samples: u8) -> Result<i32, SensorError> {
        if samples == 0 {
            return Err(SensorError::EmptyTare { sensor: "load cell" });
        }

        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += self.source.read().await? as i64;
        }
        let offset = (sum / samples as i64) as i32;

        self.calibration.offset = offset;
        info!("Tare offset set to {} ({} samples)", offset, samples);
        Ok(offset)
    }
}

impl<S> Sensor for LoadCell<S>
where
    S: Sensor<Reading = i32>,
{
    type Reading = Weight;

    async fn read(&mut self) -> Result<Weight, SensorError> {
        let raw = self.source.read().await?;
        Ok(self.calibration.to_weight(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    struct ScriptedSource(VecDeque<Result<i32, SensorError>>);

    impl Sensor for ScriptedSource {
        type Reading = i32;

        async fn read(&mut self) -> Result<i32, SensorError> {
            self.0.pop_front().unwrap_or(Ok(0))
        }
    }

    fn cell(readings: &[Result<i32, SensorError>]) -> LoadCell<ScriptedSource> {
        LoadCell::new(
            ScriptedSource(readings.iter().copied().collect()),
            Calibration::new(6600.0),
        )
    }

    #[test]
    fn test_scale_factor_applied() {
        let mut cell = cell(&[Ok(6600), Ok(-3300), Ok(0)]);
        assert_eq!(block_on(cell.read()), Ok(Weight::from_units(10_000)));
        assert_eq!(block_on(cell.read()), Ok(Weight::from_units(-5_000)));
        assert_eq!(block_on(cell.read()), Ok(Weight::ZERO));
    }

    #[test]
    fn test_tare_averages_and_offsets() {
        let mut cell = cell(&[Ok(1000), Ok(1010), Ok(1020), Ok(1000 + 13_200)]);
        assert_eq!(block_on(cell.tare(3)), Ok(1010));
        assert_eq!(cell.calibration().offset, 1010);
        // 13_190 counts above zero at 6600 counts/kg
        assert_eq!(block_on(cell.read()), Ok(Weight::from_units(19_985)));
    }

    #[test]
    fn test_tare_propagates_read_failure() {
        let fault = SensorError::NotReady {
            sensor: "HX711",
            waited_ms: 500,
        };
        let mut cell = cell(&[Ok(5), Err(fault)]);
        assert_eq!(block_on(cell.tare(2)), Err(fault));
        assert_eq!(cell.calibration().offset, 0);
    }

    #[test]
    fn test_tare_rejects_zero_samples() {
        let mut cell = cell(&[]);
        assert!(matches!(
            block_on(cell.tare(0)),
            Err(SensorError::EmptyTare { .. })
        ));
    }
}
