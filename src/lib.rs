//! Fanitizer: intake/exhaust fan pair with tacho feedback, temperature
//! sensor and OLED status screen on an ESP32-S3.

#![no_std]

pub mod config;
pub mod display;
pub mod error;
pub mod fan;
pub mod hardware;
pub mod logic;
pub mod model;
pub mod sensor;
pub mod tacho;
pub mod traits;

pub use config::FanConfig;
pub use error::ConfigError;
