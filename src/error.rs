use core::fmt;

use crate::config::PinRole;

/// Reasons a compiled configuration is rejected at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    DutyBoundsInverted { min: u16, max: u16 },
    DutyAboveFullScale { max: u16 },
    DutyDifferenceOutOfRange(u8),
    TempThresholdsInverted { min: i16, max: i16 },
    PinConflict(PinRole, PinRole),
    UnsupportedDisplay { width: u16, height: u16 },
    InvalidNodeName,
    InvalidSsid,
    InvalidWifiPassword,
    InvalidPort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DutyBoundsInverted { min, max } => {
                write!(f, "min duty {} must be below max duty {}", min, max)
            }
            Self::DutyAboveFullScale { max } => {
                write!(f, "max duty {} exceeds PWM full scale", max)
            }
            Self::DutyDifferenceOutOfRange(dif) => {
                write!(f, "duty difference {}% outside 0..=100", dif)
            }
            Self::TempThresholdsInverted { min, max } => {
                write!(f, "min temp {}C must be below max temp {}C", min, max)
            }
            Self::PinConflict(a, b) => write!(f, "{} and {} share a pin", a, b),
            Self::UnsupportedDisplay { width, height } => {
                write!(f, "unsupported display {}x{}", width, height)
            }
            Self::InvalidNodeName => f.write_str("invalid node name"),
            Self::InvalidSsid => f.write_str("invalid WiFi SSID"),
            Self::InvalidWifiPassword => f.write_str("invalid WiFi password length"),
            Self::InvalidPort => f.write_str("invalid InfluxDB port"),
        }
    }
}
