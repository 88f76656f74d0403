//! Board configuration.
//!
//! Everything here is fixed at compile time. Secrets and the node name can
//! be overridden through build environment variables, the board variant
//! through the `swapped-fans` feature.

use core::fmt;

use crate::error::ConfigError;

// OLED
pub const SCREEN_WIDTH: u16 = 128;
pub const SCREEN_HEIGHT: u16 = 64;
/// Reset pin, -1 when the panel shares the board reset
pub const OLED_RESET: i8 = -1;
pub const OLED_ADDRESS: u8 = 0x3C;

// PWM
/// Minimal duty at which a fan starts to spin
pub const MIN_DUTY: u16 = 150;
/// Limit maximum fan speed
pub const MAX_DUTY: u16 = 1024;
/// Difference (0 to 100%) between intake and exhaust PWM, keeps positive pressure
pub const DIF_DUTY: u8 = 30;
pub const PWM_RESOLUTION_BITS: u8 = 10;
pub const PWM_FULL_SCALE: u16 = 1 << PWM_RESOLUTION_BITS;
pub const PWM_FREQUENCY_KHZ: u32 = 25;

// Tacho
pub const TACHO_PULSES_PER_REV: u32 = 2;
/// PCNT glitch filter, APB cycles (12.8us at 80 MHz)
pub const TACHO_FILTER_CYCLES: u16 = 1023;

// Temperature, in degrees Celsius
/// Temperature that triggers fan power on (min pwm)
pub const MIN_TEMP: i16 = 25;
/// Temperature for max fan pwm
pub const MAX_TEMP: i16 = 35;
pub const BMP280_ADDRESS: u8 = 0x76;

// Shared I2C bus
pub const I2C_SDA_GPIO: u8 = 8;
pub const I2C_SCL_GPIO: u8 = 9;
pub const I2C_FREQUENCY_KHZ: u32 = 400;

pub const SAMPLE_PERIOD_MS: u64 = 2_000;

// Network
pub const INFLUX_HOST: [u8; 4] = [192, 168, 69, 69];
pub const INFLUX_PORT: u16 = 8089;

/// Hostname used for WiFi, OTA, InfluxDB tags and node identification
pub const NODE_NAME: &str = match option_env!("FANITIZER_NODE_NAME") {
    Some(name) => name,
    None => "Fanitizer",
};
pub const WIFI_SSID: &str = match option_env!("FANITIZER_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "WiFi_SSID",
};
pub const WIFI_PASSWORD: &str = match option_env!("FANITIZER_WIFI_PASSWORD") {
    Some(password) => password,
    None => "************",
};
pub const OTA_PASSWORD: &str = match option_env!("FANITIZER_OTA_PASSWORD") {
    Some(password) => password,
    None => "veryStrongPass",
};

const MAX_NODE_NAME_LEN: usize = 32;
const MAX_SSID_LEN: usize = 32;
const WPA_PASSWORD_LEN: core::ops::RangeInclusive<usize> = 8..=63;

const _: () = assert!(MIN_DUTY < MAX_DUTY);
const _: () = assert!(MAX_DUTY <= PWM_FULL_SCALE);
const _: () = assert!(DIF_DUTY <= 100);
const _: () = assert!(MIN_TEMP < MAX_TEMP);
const _: () = assert!(PinAssignment::PRIMARY.conflict().is_none());
const _: () = assert!(PinAssignment::SWAPPED.conflict().is_none());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    Primary,
    /// Intake and exhaust PWM/tacho pins swapped
    Swapped,
}

impl BoardVariant {
    #[cfg(not(feature = "swapped-fans"))]
    pub const SELECTED: Self = Self::Primary;
    #[cfg(feature = "swapped-fans")]
    pub const SELECTED: Self = Self::Swapped;

    pub const fn pins(self) -> PinAssignment {
        match self {
            Self::Primary => PinAssignment::PRIMARY,
            Self::Swapped => PinAssignment::SWAPPED,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Swapped => "swapped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    IntakePwm,
    ExhaustPwm,
    IntakeTacho,
    ExhaustTacho,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IntakePwm => "intake PWM",
            Self::ExhaustPwm => "exhaust PWM",
            Self::IntakeTacho => "intake tacho",
            Self::ExhaustTacho => "exhaust tacho",
        })
    }
}

/// GPIO numbers of the fan connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub intake_pwm: u8,
    pub exhaust_pwm: u8,
    pub intake_tacho: u8,
    pub exhaust_tacho: u8,
}

impl PinAssignment {
    /// GPIOs wired to the fan headers on the board
    pub const CONNECTOR_GPIOS: [u8; 4] = [12, 13, 14, 15];

    // NodeMCU D6, D8, D5, D7
    pub const PRIMARY: Self = Self {
        intake_pwm: 12,
        exhaust_pwm: 15,
        intake_tacho: 14,
        exhaust_tacho: 13,
    };

    pub const SWAPPED: Self = Self {
        intake_pwm: 15,
        exhaust_pwm: 12,
        intake_tacho: 13,
        exhaust_tacho: 14,
    };

    pub const fn pins(&self) -> [(PinRole, u8); 4] {
        [
            (PinRole::IntakePwm, self.intake_pwm),
            (PinRole::ExhaustPwm, self.exhaust_pwm),
            (PinRole::IntakeTacho, self.intake_tacho),
            (PinRole::ExhaustTacho, self.exhaust_tacho),
        ]
    }

    /// First pair of roles sharing a GPIO, if any.
    pub const fn conflict(&self) -> Option<(PinRole, PinRole)> {
        let pins = self.pins();
        let mut i = 0;
        while i < pins.len() {
            let mut j = i + 1;
            while j < pins.len() {
                if pins[i].1 == pins[j].1 {
                    return Some((pins[i].0, pins[j].0));
                }
                j += 1;
            }
            i += 1;
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyBounds {
    pub min: u16,
    pub max: u16,
    /// Percent the exhaust runs below the intake
    pub difference: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempThresholds {
    pub min: i16,
    pub max: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u16,
    pub height: u16,
    pub reset_pin: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub influx_host: [u8; 4],
    pub influx_port: u16,
    pub node_name: &'static str,
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub ota_password: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanConfig {
    pub variant: BoardVariant,
    pub pins: PinAssignment,
    pub duty: DutyBounds,
    pub temp: TempThresholds,
    pub display: DisplayGeometry,
    pub network: NetworkConfig,
}

impl FanConfig {
    pub const fn for_variant(variant: BoardVariant) -> Self {
        Self {
            variant,
            pins: variant.pins(),
            duty: DutyBounds {
                min: MIN_DUTY,
                max: MAX_DUTY,
                difference: DIF_DUTY,
            },
            temp: TempThresholds {
                min: MIN_TEMP,
                max: MAX_TEMP,
            },
            display: DisplayGeometry {
                width: SCREEN_WIDTH,
                height: SCREEN_HEIGHT,
                reset_pin: OLED_RESET,
            },
            network: NetworkConfig {
                influx_host: INFLUX_HOST,
                influx_port: INFLUX_PORT,
                node_name: NODE_NAME,
                wifi_ssid: WIFI_SSID,
                wifi_password: WIFI_PASSWORD,
                ota_password: OTA_PASSWORD,
            },
        }
    }

    /// Configuration compiled into this firmware.
    pub const fn current() -> Self {
        Self::for_variant(BoardVariant::SELECTED)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let duty = &self.duty;
        if duty.min >= duty.max {
            return Err(ConfigError::DutyBoundsInverted {
                min: duty.min,
                max: duty.max,
            });
        }
        if duty.max > PWM_FULL_SCALE {
            return Err(ConfigError::DutyAboveFullScale { max: duty.max });
        }
        if duty.difference > 100 {
            return Err(ConfigError::DutyDifferenceOutOfRange(duty.difference));
        }

        if self.temp.min >= self.temp.max {
            return Err(ConfigError::TempThresholdsInverted {
                min: self.temp.min,
                max: self.temp.max,
            });
        }

        if let Some((a, b)) = self.pins.conflict() {
            return Err(ConfigError::PinConflict(a, b));
        }

        // ssd1306 driver is instantiated for 128x64 only
        if self.display.width != 128 || self.display.height != 64 {
            return Err(ConfigError::UnsupportedDisplay {
                width: self.display.width,
                height: self.display.height,
            });
        }

        self.network.validate()
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_hostname(self.node_name) {
            return Err(ConfigError::InvalidNodeName);
        }
        if self.wifi_ssid.is_empty() || self.wifi_ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::InvalidSsid);
        }
        // empty means an open network
        let password = self.wifi_password.len();
        if password != 0 && !WPA_PASSWORD_LEN.contains(&password) {
            return Err(ConfigError::InvalidWifiPassword);
        }
        if self.influx_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

fn is_valid_hostname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NODE_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
