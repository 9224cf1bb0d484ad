//! Application-wide state and error types for the test stand

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embedded_hal::digital::OutputPin;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::ignition::{IgnitionController, IgnitionState};
use crate::sensors::SensorError;
use crate::storage::{Appended, LogPolicy, Sample, ThrustLog, Weight};

/// Count and kind of failed transducer reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorHealth {
    pub faults: u32,
    pub last_fault: Option<SensorError>,
}

/// Everything the sampler and the control surface share.
///
/// There is exactly one instance, kept behind [`SharedStand`] so a request
/// handler always sees it between whole sampling ticks.
pub struct TestStand<P> {
    latest: Sample,
    log: ThrustLog,
    ignition: IgnitionController<P>,
    health: SensorHealth,
}

impl<P: OutputPin> TestStand<P> {
    /// Takes the ignition gate pin (driven low here) and an empty log.
    pub fn new(ignition_pin: P, log_policy: LogPolicy) -> Result<Self, StandError> {
        let ignition = IgnitionController::new(ignition_pin).map_err(|_| StandError::IgnitionPin)?;

        Ok(Self {
            latest: Sample::default(),
            log: ThrustLog::new(log_policy),
            ignition,
            health: SensorHealth::default(),
        })
    }

    /// Most recent successful sample; zero-valued before the first one
    pub fn latest(&self) -> Sample {
        self.latest
    }

    pub fn log(&self) -> &ThrustLog {
        &self.log
    }

    pub fn health(&self) -> SensorHealth {
        self.health
    }

    pub fn ignition_state(&self) -> IgnitionState {
        self.ignition.state()
    }

    pub fn ignition(&self) -> &IgnitionController<P> {
        &self.ignition
    }

    /// Stores the outcome of one sampling tick.
    ///
    /// A failed read appends nothing and leaves the latest reading untouched.
    pub fn record(&mut self, timestamp_ms: u64, reading: Result<Weight, SensorError>) {
        match reading {
            Ok(weight) => {
                let sample = Sample::new(timestamp_ms, weight);
                self.latest = sample;
                match self.log.append(sample) {
                    Appended::Stored | Appended::Evicted => {}
                    Appended::OutOfMemory => {
                        warn!(
                            "Thrust log full, dropped sample at {} ms ({} dropped)",
                            timestamp_ms,
                            self.log.dropped()
                        );
                    }
                }
            }
            Err(e) => {
                self.health.faults = self.health.faults.saturating_add(1);
                self.health.last_fault = Some(e);
                warn!("Sensor read failed at {} ms: {}", timestamp_ms, e);
            }
        }
    }

    /// Sets the ignition state and drives the gate pin immediately.
    pub fn set_ignition(&mut self, state: IgnitionState) -> Result<(), StandError> {
        match state {
            IgnitionState::Armed => info!("IGNITION command received"),
            IgnitionState::Idle => info!("EXTINGUISH command received"),
        }
        self.ignition
            .set(state)
            .map_err(|_| StandError::IgnitionPin)
    }

    /// Re-asserts the ignition state on the gate pin.
    pub fn mirror_ignition(&mut self) -> Result<(), StandError> {
        self.ignition.apply().map_err(|_| StandError::IgnitionPin)
    }
}

pub type SharedStand<P> = AsyncMutex<CriticalSectionRawMutex, TestStand<P>>;

#[derive(Error, Debug)]
pub enum StandError {
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Ignition pin could not be driven")]
    IgnitionPin,
}

impl From<SensorError> for StandError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignition::test_pin::RecordingPin;
    use embassy_futures::block_on;

    fn stand() -> TestStand<RecordingPin> {
        TestStand::new(RecordingPin::default(), LogPolicy::Unbounded).unwrap()
    }

    #[test]
    fn test_latest_defaults_to_zero() {
        let stand = stand();
        assert_eq!(stand.latest(), Sample::default());
        assert!(stand.log().is_empty());
    }

    #[test]
    fn test_record_updates_latest_and_log() {
        let mut stand = stand();
        stand.record(100, Ok(Weight::from_units(1)));
        stand.record(200, Ok(Weight::from_units(2)));

        assert_eq!(stand.latest(), Sample::new(200, Weight::from_units(2)));
        assert_eq!(stand.log().len(), 2);
    }

    #[test]
    fn test_failed_read_is_counted_not_logged() {
        let mut stand = stand();
        stand.record(100, Ok(Weight::from_units(7)));
        let fault = SensorError::NotReady {
            sensor: "HX711",
            waited_ms: 500,
        };
        stand.record(200, Err(fault));

        assert_eq!(stand.log().len(), 1);
        assert_eq!(stand.latest().timestamp_ms, 100);
        assert_eq!(
            stand.health(),
            SensorHealth {
                faults: 1,
                last_fault: Some(fault)
            }
        );
    }

    #[test]
    fn test_ignition_drives_pin() {
        let mut stand = stand();
        stand.set_ignition(IgnitionState::Armed).unwrap();
        assert!(stand.ignition().pin().high);
        stand.set_ignition(IgnitionState::Idle).unwrap();
        assert!(!stand.ignition().pin().high);
    }

    #[test]
    fn test_shared_stand_lock() {
        let shared: SharedStand<RecordingPin> = AsyncMutex::new(stand());
        block_on(async {
            shared.lock().await.record(100, Ok(Weight::from_units(3)));
            assert_eq!(shared.lock().await.log().len(), 1);
        });
    }
}
