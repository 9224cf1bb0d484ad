//! Desktop simulator for the thrust-rs test stand.
//!
//! Serves the same control surface as the firmware on a local TCP port, backed
//! by a synthetic load cell. Pressing IGNITE on the dashboard lights a fake
//! motor whose thrust curve shows up in `/data` and `/download`.
//!
//! # Environment
//!
//! | Variable            | Default          | Meaning                          |
//! |---------------------|------------------|----------------------------------|
//! | `THRUST_SIM_ADDR`   | `127.0.0.1:8080` | Listen address                   |
//! | `THRUST_SIM_CONFIG` | unset            | Path to a JSON `StandConfig`     |
//! | `RUST_LOG`          | unset            | `env_logger` filter              |

use std::time::{Duration, Instant};

use log::{error, info};

use thrust_core::config::StandConfig;
use thrust_simulator::SimulatedStand;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Loop pacing; well below the sample interval.
const LOOP_PERIOD: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn load_config() -> StandConfig {
    let Ok(path) = std::env::var("THRUST_SIM_CONFIG") else {
        return StandConfig::default();
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(config) => {
            info!("Loaded stand configuration from {}", path);
            config
        }
        Err(e) => {
            error!("Ignoring {}: {}", path, e);
            StandConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let config = load_config();
    info!(
        "Sampling every {} ms, calibration factor {}",
        config.sample_interval_ms, config.calibration_factor
    );

    let mut sim = match SimulatedStand::new(&config) {
        Ok(sim) => sim,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    std::thread::sleep(Duration::from_millis(config.settle_ms));

    let addr = std::env::var("THRUST_SIM_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into());
    if let Err(e) = sim.bind(addr.as_str()) {
        error!("Could not listen on {}: {}", addr, e);
        std::process::exit(1);
    }

    let start = Instant::now();
    loop {
        sim.poll(start.elapsed().as_millis() as u64);
        std::thread::sleep(LOOP_PERIOD);
    }
}
