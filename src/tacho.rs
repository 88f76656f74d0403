use crate::config::TACHO_PULSES_PER_REV;
use crate::fan::FanRole;
use crate::traits::PulseCounter;

pub fn rpm_from_pulses(pulses: u32, elapsed_ms: u64, pulses_per_rev: u32) -> u32 {
    if elapsed_ms == 0 || pulses_per_rev == 0 {
        return 0;
    }
    let rpm = pulses as u64 * 60_000 / (elapsed_ms * pulses_per_rev as u64);
    rpm.min(u32::MAX as u64) as u32
}

#[derive(Debug, Default, Clone, Copy)]
struct Sample {
    count: u16,
    at_ms: u64,
    valid: bool,
}

/// Turns free running pulse counts into RPM between consecutive samples.
#[derive(Debug, Default)]
pub struct TachoReader {
    samples: [Sample; 2],
}

impl TachoReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// RPM since the previous call for `role`. The first call only primes
    /// the reader and returns 0.
    pub fn sample(&mut self, role: FanRole, count: u16, now_ms: u64) -> u32 {
        let prev = &mut self.samples[role as usize];
        let rpm = if prev.valid {
            // the hardware counter wraps at 16 bits
            let pulses = count.wrapping_sub(prev.count);
            let elapsed = now_ms.saturating_sub(prev.at_ms);
            rpm_from_pulses(pulses as u32, elapsed, TACHO_PULSES_PER_REV)
        } else {
            0
        };

        *prev = Sample {
            count,
            at_ms: now_ms,
            valid: true,
        };
        rpm
    }

    pub fn sample_all<C: PulseCounter>(&mut self, counter: &C, now_ms: u64) -> [u32; 2] {
        FanRole::ALL.map(|role| self.sample(role, counter.pulse_count(role), now_ms))
    }
}
