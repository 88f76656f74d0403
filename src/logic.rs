//! Business logic layer (hardware-independent)

use core::fmt::Write;

use heapless::String;

use crate::config::TempThresholds;
use crate::fan::FanRole;
use crate::model::Model;
use crate::traits::{Display, TemperatureSensor};

/// Characters per row with the 6x10 font on a 128 pixel wide panel
pub const LINE_WIDTH: usize = 21;
pub const LINE_HEIGHT: i32 = 12;
pub const STATUS_LINES: usize = 5;

pub type Line = String<LINE_WIDTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    NoData,
    /// Below the fan power-on threshold
    Cool,
    Warm,
    /// At or above the max PWM threshold
    Hot,
}

impl TemperatureBand {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoData => "No data",
            Self::Cool => "Cool",
            Self::Warm => "Warm",
            Self::Hot => "Hot",
        }
    }
}

/// Application state for testable business logic
pub struct AppLogic {
    temperature_readings: [Option<f32>; 5],
    reading_index: usize,
    thresholds: TempThresholds,
}

impl AppLogic {
    pub fn new(thresholds: TempThresholds) -> Self {
        Self {
            temperature_readings: [None; 5],
            reading_index: 0,
            thresholds,
        }
    }

    /// Record a temperature reading
    pub fn record_temperature(&mut self, temp: f32) {
        self.temperature_readings[self.reading_index] = Some(temp);
        self.reading_index = (self.reading_index + 1) % self.temperature_readings.len();
    }

    /// Calculate average temperature from recorded readings
    pub fn average_temperature(&self) -> Option<f32> {
        let (sum, count) = self
            .temperature_readings
            .iter()
            .flatten()
            .fold((0.0, 0), |(sum, count), temp| (sum + temp, count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }

    pub fn temperature_band(&self) -> TemperatureBand {
        match self.average_temperature() {
            None => TemperatureBand::NoData,
            Some(temp) if temp < self.thresholds.min as f32 => TemperatureBand::Cool,
            Some(temp) if temp < self.thresholds.max as f32 => TemperatureBand::Warm,
            Some(_) => TemperatureBand::Hot,
        }
    }

    /// Text rows for the status screen
    pub fn status_lines(&self, model: &Model) -> [Line; STATUS_LINES] {
        let mut lines: [Line; STATUS_LINES] = Default::default();

        let _ = lines[0].push_str(truncate(model.node_name, LINE_WIDTH));

        let _ = match model.temperature {
            Some(temp) => write!(lines[1], "T {:.1}C {}", temp, self.temperature_band().label()),
            None => write!(lines[1], "T --.-C {}", TemperatureBand::NoData.label()),
        };

        for (line, role) in lines[2..4].iter_mut().zip(FanRole::ALL) {
            let _ = write!(
                line,
                "{} {:>3}% {:>5}rpm",
                role.label(),
                model.fans.duty(role).percent(),
                model.rpm(role).min(99_999)
            );
        }

        let _ = match self.average_temperature() {
            Some(avg) => write!(lines[4], "Avg {:.1}C {}", avg, model.variant.label()),
            None => write!(lines[4], "Avg --.-C {}", model.variant.label()),
        };

        lines
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Read the sensor, then redraw the status screen
pub fn update_display_with_sensor<D: Display, T: TemperatureSensor>(
    display: &mut D,
    sensor: &mut T,
    app: &mut AppLogic,
    model: &mut Model,
) -> Result<(), &'static str> {
    let temp = sensor.read_temperature()?;
    app.record_temperature(temp);
    model.temperature = Some(temp);

    render_status(display, app, model)
}

pub fn render_status<D: Display>(
    display: &mut D,
    app: &AppLogic,
    model: &Model,
) -> Result<(), &'static str> {
    display.clear()?;
    for (row, line) in app.status_lines(model).iter().enumerate() {
        display.draw_text(line.as_str(), 0, row as i32 * LINE_HEIGHT)?;
    }
    display.update()
}
