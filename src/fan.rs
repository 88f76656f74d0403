//! Fan duty handling for the intake/exhaust pair.

use crate::config::{DutyBounds, FanConfig, PWM_FULL_SCALE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanRole {
    Intake = 0,
    Exhaust = 1,
}

impl FanRole {
    pub const ALL: [FanRole; 2] = [FanRole::Intake, FanRole::Exhaust];

    pub fn label(self) -> &'static str {
        match self {
            FanRole::Intake => "IN",
            FanRole::Exhaust => "EX",
        }
    }
}

/// Raw PWM compare value, `PWM_FULL_SCALE` is 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duty(pub u16);

impl Duty {
    pub const OFF: Duty = Duty(0);

    pub fn is_off(self) -> bool {
        self.0 == 0
    }

    /// Duty as a whole percentage of full scale, rounded down.
    pub fn percent(self) -> u8 {
        let pct = self.0 as u32 * 100 / PWM_FULL_SCALE as u32;
        pct.min(100) as u8
    }
}

impl DutyBounds {
    /// Keep a running fan inside the bounds. Zero stays zero, and so does
    /// everything when `min > max`: no duty satisfies inverted bounds.
    pub fn clamp(&self, raw: u16) -> Duty {
        if raw == 0 || self.min > self.max {
            Duty::OFF
        } else {
            Duty(raw.clamp(self.min, self.max))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanPair {
    pub intake: Duty,
    pub exhaust: Duty,
}

impl FanPair {
    /// Derive the exhaust duty from the intake so the case stays at
    /// positive pressure.
    pub fn from_intake(intake: u16, bounds: &DutyBounds) -> Self {
        let intake = bounds.clamp(intake);
        if intake.is_off() {
            return Self {
                intake,
                exhaust: Duty::OFF,
            };
        }

        let keep = 100 - bounds.difference.min(100) as u32;
        let exhaust = (intake.0 as u32 * keep / 100) as u16;
        // below min the exhaust fan would stall
        let exhaust = Duty(exhaust.max(bounds.min).min(intake.0));

        Self { intake, exhaust }
    }

    /// Duty pair the firmware holds: intake at the configured minimum.
    ///
    /// With the stock bounds this is (150, 150): 30% below `MIN_DUTY` falls
    /// under the stall floor, so `DIF_DUTY` only separates the fans once the
    /// intake runs above roughly `MIN_DUTY / 0.7`.
    pub fn baseline(config: &FanConfig) -> Self {
        Self::from_intake(config.duty.min, &config.duty)
    }

    pub fn duty(&self, role: FanRole) -> Duty {
        match role {
            FanRole::Intake => self.intake,
            FanRole::Exhaust => self.exhaust,
        }
    }
}
