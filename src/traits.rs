//! Hardware abstraction traits

use crate::fan::{Duty, FanRole};

/// Trait for temperature sensors
pub trait TemperatureSensor {
    /// Initialize the sensor
    fn init(&mut self) -> Result<(), &'static str>;

    /// Read temperature in Celsius
    fn read_temperature(&mut self) -> Result<f32, &'static str>;
}

/// Trait for display devices
pub trait Display {
    /// Initialize the display
    fn init(&mut self) -> Result<(), &'static str>;

    /// Clear the display
    fn clear(&mut self) -> Result<(), &'static str>;

    /// Draw text at specified position
    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<(), &'static str>;

    /// Update/flush the display (show the buffer)
    fn update(&mut self) -> Result<(), &'static str>;
}

/// PWM output driving one fan
pub trait FanOutput {
    fn set_duty(&mut self, duty: Duty) -> Result<(), &'static str>;
}

/// Free running 16 bit tacho pulse counter, one per fan
pub trait PulseCounter {
    fn pulse_count(&self, role: FanRole) -> u16;
}
