use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal_bus::i2c::CriticalSectionDevice;
use esp_hal::{
    gpio::{AnyPin, DriveMode, Input, InputConfig, Pin, Pull, interconnect::PeripheralInput},
    i2c::master::{Config as I2cConfig, I2c},
    ledc::{
        LSGlobalClkSource, Ledc, LowSpeed,
        channel::{self, Channel, ChannelHW, ChannelIFace},
        timer::{self, Timer, TimerIFace},
    },
    pcnt::{
        Pcnt,
        channel::{CtrlMode, EdgeMode},
        unit::Unit,
    },
    peripherals::{I2C0, LEDC, PCNT},
    time::Rate,
};
use static_cell::StaticCell;

use crate::config::{
    I2C_FREQUENCY_KHZ, PWM_FREQUENCY_KHZ, PWM_FULL_SCALE, PinAssignment, TACHO_FILTER_CYCLES,
};
use crate::fan::{Duty, FanRole};
use crate::traits::{FanOutput, PulseCounter};

pub type I2cBus = Mutex<RefCell<I2c<'static, esp_hal::Blocking>>>;
/// One user's handle on the shared bus
pub type SharedI2c = CriticalSectionDevice<'static, I2c<'static, esp_hal::Blocking>>;

static I2C_BUS: StaticCell<I2cBus> = StaticCell::new();
static PWM_TIMER: StaticCell<Timer<'static, LowSpeed>> = StaticCell::new();

/// Bring up I2C0 and park it behind a critical-section mutex so the sensor
/// and the display can live in different tasks.
pub fn init_i2c_bus<SDA, SCL>(
    i2c_periph: I2C0<'static>,
    sda: SDA,
    scl: SCL,
) -> Result<&'static I2cBus, &'static str>
where
    SDA: Into<AnyPin<'static>>,
    SCL: Into<AnyPin<'static>>,
{
    let i2c = I2c::new(
        i2c_periph,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .map_err(|_| "Invalid I2C config")?
    .with_sda(sda.into())
    .with_scl(scl.into());

    Ok(I2C_BUS.init(Mutex::new(RefCell::new(i2c))))
}

pub fn shared_i2c(bus: &'static I2cBus) -> SharedI2c {
    CriticalSectionDevice::new(bus)
}

/// Fan connector GPIOs, each handed to the role a `PinAssignment` gives it.
pub struct FanPins<'d> {
    pub intake_pwm: AnyPin<'d>,
    pub exhaust_pwm: AnyPin<'d>,
    pub intake_tacho: AnyPin<'d>,
    pub exhaust_tacho: AnyPin<'d>,
}

impl<'d> FanPins<'d> {
    /// `connectors` are the GPIOs wired to the fan headers, in any order.
    /// Fails when the assignment names a GPIO that is not among them or
    /// names one twice.
    pub fn route(assignment: &PinAssignment, connectors: [AnyPin<'d>; 4]) -> Result<Self, &'static str> {
        let mut pool = connectors.map(Some);
        let mut take = |gpio: u8| {
            pool.iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|pin| pin.number() == gpio))
                .and_then(Option::take)
                .ok_or("Assigned GPIO is not a free fan connector pin")
        };

        Ok(Self {
            intake_pwm: take(assignment.intake_pwm)?,
            exhaust_pwm: take(assignment.exhaust_pwm)?,
            intake_tacho: take(assignment.intake_tacho)?,
            exhaust_tacho: take(assignment.exhaust_tacho)?,
        })
    }
}

pub struct FanPwm {
    pub intake: Channel<'static, LowSpeed>,
    pub exhaust: Channel<'static, LowSpeed>,
}

impl FanPwm {
    /// 25 kHz, 10 bit low speed LEDC timer shared by both fan channels.
    /// Channels start at 0% so nothing spins before the first duty write.
    pub fn new(
        ledc_periph: LEDC<'static>,
        intake_pin: AnyPin<'static>,
        exhaust_pin: AnyPin<'static>,
    ) -> Result<Self, &'static str> {
        let mut ledc = Ledc::new(ledc_periph);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut lstimer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
        lstimer
            .configure(timer::config::Config {
                duty: timer::config::Duty::Duty10Bit,
                clock_source: timer::LSClockSource::APBClk,
                frequency: Rate::from_khz(PWM_FREQUENCY_KHZ),
            })
            .map_err(|_| "Failed to configure PWM timer")?;
        let lstimer: &'static Timer<'static, LowSpeed> = PWM_TIMER.init(lstimer);

        let mut intake = ledc.channel(channel::Number::Channel0, intake_pin);
        intake
            .configure(channel::config::Config {
                timer: lstimer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(|_| "Failed to configure intake PWM channel")?;

        let mut exhaust = ledc.channel(channel::Number::Channel1, exhaust_pin);
        exhaust
            .configure(channel::config::Config {
                timer: lstimer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(|_| "Failed to configure exhaust PWM channel")?;

        Ok(Self { intake, exhaust })
    }
}

impl FanOutput for Channel<'static, LowSpeed> {
    fn set_duty(&mut self, duty: Duty) -> Result<(), &'static str> {
        if duty.0 > PWM_FULL_SCALE {
            return Err("Duty above PWM full scale");
        }
        self.set_duty_hw(duty.0 as u32);
        Ok(())
    }
}

/// Tacho edges counted by PCNT units 0 and 1, so no pulse depends on the
/// executor getting around to it.
pub struct TachoCounters {
    intake: Unit<'static, 0>,
    exhaust: Unit<'static, 1>,
    // keep the pulled-up inputs alive while the units read them
    _inputs: [Input<'static>; 2],
}

impl TachoCounters {
    pub fn new(
        pcnt_periph: PCNT<'static>,
        intake_pin: AnyPin<'static>,
        exhaust_pin: AnyPin<'static>,
    ) -> Result<Self, &'static str> {
        let pcnt = Pcnt::new(pcnt_periph);

        // tacho lines are open collector
        let config = InputConfig::default().with_pull(Pull::Up);
        let intake_input = Input::new(intake_pin, config);
        let exhaust_input = Input::new(exhaust_pin, config);

        count_falling_edges(&pcnt.unit0, intake_input.peripheral_input())?;
        count_falling_edges(&pcnt.unit1, exhaust_input.peripheral_input())?;

        Ok(Self {
            intake: pcnt.unit0,
            exhaust: pcnt.unit1,
            _inputs: [intake_input, exhaust_input],
        })
    }
}

fn count_falling_edges<const NUM: usize>(
    unit: &Unit<'static, NUM>,
    signal: impl PeripheralInput<'static>,
) -> Result<(), &'static str> {
    // no limits: the count runs through the whole 16 bit range and wraps
    unit.set_low_limit(None).map_err(|_| "Invalid tacho low limit")?;
    unit.set_high_limit(None).map_err(|_| "Invalid tacho high limit")?;
    unit.set_filter(Some(TACHO_FILTER_CYCLES))
        .map_err(|_| "Invalid tacho filter")?;
    unit.clear();

    let channel = &unit.channel0;
    channel.set_edge_signal(signal);
    channel.set_ctrl_mode(CtrlMode::Keep, CtrlMode::Keep);
    channel.set_input_mode(EdgeMode::Increment, EdgeMode::Hold);

    unit.resume();
    Ok(())
}

impl PulseCounter for TachoCounters {
    fn pulse_count(&self, role: FanRole) -> u16 {
        let value = match role {
            FanRole::Intake => self.intake.value(),
            FanRole::Exhaust => self.exhaust.value(),
        };
        value as u16
    }
}
