use serde::{Deserialize, Serialize};

use crate::sampler::DEFAULT_SAMPLE_INTERVAL_MS;
use crate::storage::LogPolicy;

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub access_point: AccessPointConfig<'a>,
    #[serde(default)]
    pub stand: StandConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AccessPointConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Measurement settings, fixed for the lifetime of the process
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct StandConfig {
    pub sample_interval_ms: u64,
    /// Raw load-cell counts per kilogram
    pub calibration_factor: f32,
    /// Unloaded readings averaged for the zero offset
    pub tare_samples: u8,
    /// Pause after taring before sampling starts
    pub settle_ms: u64,
    pub log_policy: LogPolicy,
}

impl Default for StandConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            calibration_factor: 6600.0,
            tare_samples: 10,
            settle_ms: 1000,
            log_policy: LogPolicy::Unbounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_stand_config_keeps_defaults() {
        let config: StandConfig =
            serde_json::from_str(r#"{"calibration_factor": 7125.5, "log_policy": {"kind": "ring", "capacity": 36000}}"#)
                .unwrap();

        assert_eq!(config.calibration_factor, 7125.5);
        assert_eq!(config.log_policy, LogPolicy::Ring { capacity: 36_000 });
        assert_eq!(config.sample_interval_ms, 100);
        assert_eq!(config.tare_samples, 10);
    }

    #[test]
    fn test_full_config_borrows_strings() {
        let text = r#"{"access_point": {"ssid": "ThrustStand", "password": "12345678"}}"#;
        let config: Config<'_> = serde_json::from_str(text).unwrap();

        assert_eq!(config.access_point.ssid, "ThrustStand");
        assert_eq!(config.stand, StandConfig::default());
    }
}
