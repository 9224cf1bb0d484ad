//! Hardware-independent core library for thrust-rs
//!
//! This crate contains all platform-agnostic logic for the rocket motor test
//! stand: the thrust sample model and log, the fixed-rate sampler, the ignition
//! controller, the HX711 load-cell driver, and the HTTP control surface.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod control;
pub mod ignition;
pub mod sampler;
pub mod sensors;
pub mod storage;
