//! ESP32-S3 firmware-specific modules for thrust-rs
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: GPIO and HX711 wiring, the Wi-Fi access point, the DHCP server
//! for joining stations, and the HTTP workers serving the control surface.

#![no_std]

extern crate alloc;

pub mod access_point;
pub mod app_state;
pub mod net;
