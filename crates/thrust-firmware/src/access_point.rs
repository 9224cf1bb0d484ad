//! Build-time access point settings
//!
//! `build.rs` validates these and passes them in as `rustc-env` values, so they
//! are plain string literals here.

use core::net::Ipv4Addr;

use log::warn;
use thrust_core::config::{AccessPointConfig, Config, StandConfig};
use thrust_core::storage::LogPolicy;

pub const AP_SSID: &str = env!("THRUST_AP_SSID");
pub const AP_PASSWORD: &str = env!("THRUST_AP_PASSWORD");
const AP_IP: &str = env!("THRUST_AP_IP");
const LOG_CAPACITY: &str = env!("THRUST_LOG_CAPACITY");

/// Prefix length of the access point subnet
pub const AP_PREFIX_LEN: u8 = 24;

/// Fallback when the baked address cannot be parsed
const DEFAULT_AP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Address of the stand on its own network; also the DHCP gateway.
pub fn ap_address() -> Ipv4Addr {
    AP_IP.parse().unwrap_or_else(|_| {
        warn!("Invalid THRUST_AP_IP {}, using {}", AP_IP, DEFAULT_AP_IP);
        DEFAULT_AP_IP
    })
}

fn log_policy() -> LogPolicy {
    match LOG_CAPACITY.parse::<usize>() {
        Ok(0) | Err(_) => LogPolicy::Unbounded,
        Ok(capacity) => LogPolicy::Ring { capacity },
    }
}

/// Full firmware configuration with the fixed measurement settings.
pub fn config() -> Config<'static> {
    Config {
        access_point: AccessPointConfig {
            ssid: AP_SSID,
            password: AP_PASSWORD,
        },
        stand: StandConfig {
            log_policy: log_policy(),
            ..StandConfig::default()
        },
    }
}
