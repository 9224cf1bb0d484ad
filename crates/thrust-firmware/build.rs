//! Bakes the access point settings into the binary.
//!
//! Values come from the process environment or a `.env` file next to this
//! crate. Anything unset falls back to the stand defaults.

const SETTINGS: &[(&str, &str)] = &[
    ("THRUST_AP_SSID", "ThrustStand"),
    ("THRUST_AP_PASSWORD", "12345678"),
    ("THRUST_AP_IP", "192.168.4.1"),
    // 0 keeps every sample until the heap runs out
    ("THRUST_LOG_CAPACITY", "0"),
];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=.env");

    // A missing .env is fine; the environment or the defaults apply
    let _ = dotenvy::dotenv();

    for (key, default) in SETTINGS {
        println!("cargo:rerun-if-env-changed={}", key);
        let value = std::env::var(key).unwrap_or_else(|_| (*default).into());
        validate(key, &value);
        println!("cargo:rustc-env={}={}", key, value);
    }
}

fn validate(key: &str, value: &str) {
    match key {
        "THRUST_AP_PASSWORD" if !(8..=63).contains(&value.len()) => {
            panic!("THRUST_AP_PASSWORD must be 8 to 63 characters for WPA2");
        }
        "THRUST_AP_SSID" if value.is_empty() || value.len() > 32 => {
            panic!("THRUST_AP_SSID must be 1 to 32 bytes");
        }
        "THRUST_AP_IP" if value.parse::<std::net::Ipv4Addr>().is_err() => {
            panic!("THRUST_AP_IP is not an IPv4 address: {}", value);
        }
        "THRUST_LOG_CAPACITY" if value.parse::<usize>().is_err() => {
            panic!("THRUST_LOG_CAPACITY must be a sample count: {}", value);
        }
        _ => {}
    }
}
