#![no_std]
#![no_main]

use core::panic::PanicInfo;
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{
    delay::Delay,
    gpio::{AnyPin, Pin},
    peripherals::{GPIO12, GPIO13, GPIO14, GPIO15},
    timer::timg::TimerGroup,
};

use fanitizer::{
    ConfigError, FanConfig,
    config::{BMP280_ADDRESS, BoardVariant, DutyBounds, MAX_DUTY, MIN_DUTY, PinAssignment, PinRole},
    fan::{Duty, FanPair, FanRole},
    hardware::{self, FanPins},
    logic::{self, AppLogic, LINE_WIDTH, STATUS_LINES, TemperatureBand},
    model::Model,
    sensor::{self, Bmp280, Calibration},
    tacho::{self, TachoReader},
    traits::{Display, PulseCounter, TemperatureSensor},
};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_eq<T: PartialEq + core::fmt::Debug>(&mut self, left: T, right: T, test_name: &str) {
        self.total += 1;
        if left == right {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED: {:?} != {:?}", test_name, left, right);
        }
    }

    fn assert_close(&mut self, value: f32, expected: f32, tolerance: f32, test_name: &str) {
        self.total += 1;
        if (value - expected).abs() < tolerance {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!(
                "  ✗ {} FAILED: {:.2} not close to {:.2} (tolerance: {:.2})",
                test_name,
                value,
                expected,
                tolerance
            );
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

fn test_config(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Configuration Tests");

    for variant in [BoardVariant::Primary, BoardVariant::Swapped] {
        let config = FanConfig::for_variant(variant);
        results.assert_eq(config.validate(), Ok(()), "shipped config is valid");
        results.assert(config.duty.min < config.duty.max, "MIN_DUTY < MAX_DUTY");
        results.assert(config.temp.min < config.temp.max, "MIN_TEMP < MAX_TEMP");
        results.assert(config.duty.difference <= 100, "DIF_DUTY within 0..=100");
        results.assert_eq(config.pins.conflict(), None, "pins pairwise distinct");
    }

    let primary = PinAssignment::PRIMARY;
    let swapped = PinAssignment::SWAPPED;
    results.assert_eq(primary.intake_pwm, swapped.exhaust_pwm, "variants swap PWM pins");
    results.assert_eq(primary.intake_tacho, swapped.exhaust_tacho, "variants swap tacho pins");
    results.assert_eq(FanConfig::current().variant, BoardVariant::SELECTED, "current uses selected variant");

    let base = FanConfig::for_variant(BoardVariant::Primary);

    let mut config = base;
    config.duty.min = config.duty.max;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::DutyBoundsInverted { min: MAX_DUTY, max: MAX_DUTY }),
        "equal duty bounds rejected",
    );

    let mut config = base;
    config.duty.max = 2048;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::DutyAboveFullScale { max: 2048 }),
        "max duty above full scale rejected",
    );

    let mut config = base;
    config.duty.difference = 101;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::DutyDifferenceOutOfRange(101)),
        "duty difference above 100 rejected",
    );

    let mut config = base;
    config.temp.min = 40;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::TempThresholdsInverted { min: 40, max: 35 }),
        "inverted temperature thresholds rejected",
    );

    let mut config = base;
    config.pins.exhaust_tacho = config.pins.intake_pwm;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::PinConflict(PinRole::IntakePwm, PinRole::ExhaustTacho)),
        "shared pin rejected",
    );

    let mut config = base;
    config.display.height = 32;
    results.assert_eq(
        config.validate(),
        Err(ConfigError::UnsupportedDisplay { width: 128, height: 32 }),
        "128x32 display rejected",
    );

    let mut config = base;
    config.network.node_name = "fan node";
    results.assert_eq(config.validate(), Err(ConfigError::InvalidNodeName), "node name with space rejected");

    let mut config = base;
    config.network.node_name = "";
    results.assert_eq(config.validate(), Err(ConfigError::InvalidNodeName), "empty node name rejected");

    let mut config = base;
    config.network.wifi_ssid = "";
    results.assert_eq(config.validate(), Err(ConfigError::InvalidSsid), "empty SSID rejected");

    let mut config = base;
    config.network.wifi_password = "short";
    results.assert_eq(
        config.validate(),
        Err(ConfigError::InvalidWifiPassword),
        "short WiFi password rejected",
    );

    let mut config = base;
    config.network.wifi_password = "";
    results.assert_eq(config.validate(), Ok(()), "open network accepted");

    let mut config = base;
    config.network.influx_port = 0;
    results.assert_eq(config.validate(), Err(ConfigError::InvalidPort), "port 0 rejected");

    test_network_limits(results, base);
}

// 64 valid hostname / SSID / password characters
const LONG_TEXT: &str = "abcdefghijklmnopqrstuvwxyz-0123456789-ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn test_network_limits(results: &mut TestResults, base: FanConfig) {
    let text = |len: usize| &LONG_TEXT[..len];

    let mut config = base;
    config.network.node_name = text(32);
    results.assert_eq(config.validate(), Ok(()), "32 char node name accepted");
    config.network.node_name = text(33);
    results.assert_eq(config.validate(), Err(ConfigError::InvalidNodeName), "33 char node name rejected");
    config.network.node_name = "fan_node";
    results.assert_eq(config.validate(), Err(ConfigError::InvalidNodeName), "underscore in node name rejected");

    let mut config = base;
    config.network.wifi_ssid = text(32);
    results.assert_eq(config.validate(), Ok(()), "32 byte SSID accepted");
    config.network.wifi_ssid = text(33);
    results.assert_eq(config.validate(), Err(ConfigError::InvalidSsid), "33 byte SSID rejected");

    let mut config = base;
    for (len, expected, name) in [
        (7, Err(ConfigError::InvalidWifiPassword), "7 char password rejected"),
        (8, Ok(()), "8 char password accepted"),
        (63, Ok(()), "63 char password accepted"),
        (64, Err(ConfigError::InvalidWifiPassword), "64 char password rejected"),
    ] {
        config.network.wifi_password = text(len);
        results.assert_eq(config.validate(), expected, name);
    }
}

fn test_fan_pair(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Fan Pair Tests");

    let config = FanConfig::for_variant(BoardVariant::Primary);
    let bounds = config.duty;

    results.assert_eq(bounds.clamp(0), Duty::OFF, "zero duty stays off");
    results.assert_eq(bounds.clamp(10), Duty(MIN_DUTY), "low duty raised to min");
    results.assert_eq(bounds.clamp(5000), Duty(MAX_DUTY), "high duty capped at max");
    results.assert_eq(bounds.clamp(600), Duty(600), "duty inside bounds untouched");

    let full = FanPair::from_intake(MAX_DUTY, &bounds);
    results.assert_eq(full.intake, Duty(1024), "full intake");
    results.assert_eq(full.exhaust, Duty(716), "exhaust 30% below intake");
    results.assert_eq(full.intake.percent(), 100, "full intake is 100%");
    results.assert_eq(full.exhaust.percent(), 69, "exhaust percent");

    let low = FanPair::from_intake(MIN_DUTY, &bounds);
    results.assert_eq(low.exhaust, Duty(MIN_DUTY), "exhaust floored at min while running");

    let off = FanPair::from_intake(0, &bounds);
    results.assert_eq(off.exhaust, Duty::OFF, "exhaust off with intake off");

    let mut no_difference = bounds;
    no_difference.difference = 0;
    let same = FanPair::from_intake(500, &no_difference);
    results.assert_eq(same.exhaust, same.intake, "zero difference keeps fans equal");

    for raw in [0u16, 1, 150, 200, 400, 800, 1024, 4000] {
        let pair = FanPair::from_intake(raw, &bounds);
        results.assert(pair.exhaust <= pair.intake, "exhaust never above intake");
    }

    let inverted = DutyBounds {
        min: 900,
        max: 100,
        difference: 30,
    };
    results.assert_eq(inverted.clamp(500), Duty::OFF, "inverted bounds keep fans off");
    results.assert_eq(inverted.clamp(0), Duty::OFF, "inverted bounds zero stays off");
    let pair = FanPair::from_intake(500, &inverted);
    results.assert(pair.intake.is_off() && pair.exhaust.is_off(), "inverted bounds pair off");

    let baseline = FanPair::baseline(&config);
    results.assert_eq(baseline.duty(FanRole::Intake), Duty(MIN_DUTY), "baseline intake at min duty");
    results.assert_eq(baseline.duty(FanRole::Exhaust), Duty(MIN_DUTY), "baseline exhaust at min duty");
}

fn test_tacho(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Tacho Tests");

    results.assert_eq(tacho::rpm_from_pulses(40, 1_000, 2), 1_200, "40 pulses in 1s is 1200rpm");
    results.assert_eq(tacho::rpm_from_pulses(100, 2_000, 2), 1_500, "100 pulses in 2s is 1500rpm");
    results.assert_eq(tacho::rpm_from_pulses(0, 2_000, 2), 0, "no pulses is 0rpm");
    results.assert_eq(tacho::rpm_from_pulses(10, 0, 2), 0, "zero window is 0rpm");

    let mut reader = TachoReader::new();
    results.assert_eq(reader.sample(FanRole::Intake, 500, 1_000), 0, "first sample primes reader");
    results.assert_eq(reader.sample(FanRole::Intake, 580, 3_000), 1_200, "80 pulses in 2s");
    results.assert_eq(reader.sample(FanRole::Exhaust, 7, 3_000), 0, "fans sampled independently");
    results.assert_eq(reader.sample(FanRole::Intake, 580, 5_000), 0, "stalled fan reads 0rpm");

    let mut reader = TachoReader::new();
    reader.sample(FanRole::Exhaust, u16::MAX - 9, 0);
    results.assert_eq(reader.sample(FanRole::Exhaust, 30, 1_000), 1_200, "counter wrap handled");

    // PCNT reads back as i16, negative values are the upper half of the count
    let mut reader = TachoReader::new();
    reader.sample(FanRole::Intake, i16::MAX as u16 - 19, 0);
    results.assert_eq(reader.sample(FanRole::Intake, (i16::MIN + 20) as u16, 1_000), 1_200, "sign flip handled");

    let mut counts = FixedCounts([100, 4_000]);
    let mut reader = TachoReader::new();
    results.assert_eq(reader.sample_all(&counts, 0), [0, 0], "first sample_all primes both fans");
    counts.0 = [140, 4_100];
    results.assert_eq(reader.sample_all(&counts, 2_000), [600, 1_500], "sample_all reads each counter");
}

struct FixedCounts([u16; 2]);

impl PulseCounter for FixedCounts {
    fn pulse_count(&self, role: FanRole) -> u16 {
        self.0[role as usize]
    }
}

fn test_fan_pins(
    results: &mut TestResults,
    mut gpio12: GPIO12<'static>,
    mut gpio13: GPIO13<'static>,
    mut gpio14: GPIO14<'static>,
    mut gpio15: GPIO15<'static>,
) {
    esp_println::println!("\n[TEST] Fan Pin Routing Tests");

    for assignment in [PinAssignment::PRIMARY, PinAssignment::SWAPPED] {
        for (_, gpio) in assignment.pins() {
            results.assert(PinAssignment::CONNECTOR_GPIOS.contains(&gpio), "variant uses connector GPIOs");
        }

        // deliberately not in assignment order
        let connectors: [AnyPin<'_>; 4] = [
            gpio15.reborrow().into(),
            gpio13.reborrow().into(),
            gpio12.reborrow().into(),
            gpio14.reborrow().into(),
        ];
        match FanPins::route(&assignment, connectors) {
            Ok(pins) => {
                results.assert_eq(pins.intake_pwm.number(), assignment.intake_pwm, "intake PWM routed");
                results.assert_eq(pins.exhaust_pwm.number(), assignment.exhaust_pwm, "exhaust PWM routed");
                results.assert_eq(pins.intake_tacho.number(), assignment.intake_tacho, "intake tacho routed");
                results.assert_eq(pins.exhaust_tacho.number(), assignment.exhaust_tacho, "exhaust tacho routed");
            }
            Err(e) => {
                esp_println::println!("    Routing failed: {}", e);
                results.assert(false, "variant routes onto connectors");
            }
        }
    }

    let mut unwired = PinAssignment::PRIMARY;
    unwired.intake_tacho = 5;
    let connectors: [AnyPin<'_>; 4] = [
        gpio12.reborrow().into(),
        gpio13.reborrow().into(),
        gpio14.reborrow().into(),
        gpio15.reborrow().into(),
    ];
    results.assert(FanPins::route(&unwired, connectors).is_err(), "unwired GPIO rejected");

    let mut shared = PinAssignment::PRIMARY;
    shared.exhaust_tacho = shared.intake_pwm;
    let connectors: [AnyPin<'_>; 4] = [
        gpio12.reborrow().into(),
        gpio13.reborrow().into(),
        gpio14.reborrow().into(),
        gpio15.reborrow().into(),
    ];
    results.assert(FanPins::route(&shared, connectors).is_err(), "GPIO assigned twice rejected");
}

fn test_bmp280_compensation(results: &mut TestResults) {
    esp_println::println!("\n[TEST] BMP280 Compensation Tests");

    // worked example from the Bosch datasheet
    let calib = Calibration {
        dig_t1: 27504,
        dig_t2: 26435,
        dig_t3: -1000,
    };
    results.assert_close(sensor::compensate_temperature(519888, &calib), 25.08, 0.001, "datasheet example");
    results.assert_eq(sensor::raw_temperature(&[0x7E, 0xED, 0x00]), 519888, "raw 20 bit assembly");
}

struct FixedSensor(f32);

impl TemperatureSensor for FixedSensor {
    fn init(&mut self) -> Result<(), &'static str> {
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, &'static str> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingDisplay {
    cleared: bool,
    rows: u32,
    longest: usize,
    flushed: bool,
}

impl Display for RecordingDisplay {
    fn init(&mut self) -> Result<(), &'static str> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), &'static str> {
        self.cleared = true;
        Ok(())
    }

    fn draw_text(&mut self, text: &str, _x: i32, y: i32) -> Result<(), &'static str> {
        if y < 0 || y >= 64 {
            return Err("row off screen");
        }
        self.rows += 1;
        self.longest = self.longest.max(text.len());
        Ok(())
    }

    fn update(&mut self) -> Result<(), &'static str> {
        self.flushed = true;
        Ok(())
    }
}

fn test_app_logic(results: &mut TestResults) {
    esp_println::println!("\n[TEST] AppLogic Tests");

    let config = FanConfig::for_variant(BoardVariant::Primary);

    let app = AppLogic::new(config.temp);
    results.assert_eq(app.average_temperature(), None, "no readings");
    results.assert_eq(app.temperature_band(), TemperatureBand::NoData, "no data band");

    // Test rolling buffer
    let mut app = AppLogic::new(config.temp);
    for i in 0..5 {
        app.record_temperature((i * 10 + 2) as f32);
    }
    app.record_temperature(100.0);
    if let Some(avg) = app.average_temperature() {
        results.assert_close(avg, 41.6, 0.2, "rolling buffer average");
    } else {
        results.assert(false, "rolling buffer average (None returned)");
    }

    for (temp, band, name) in [
        (24.9, TemperatureBand::Cool, "below MIN_TEMP is cool"),
        (25.0, TemperatureBand::Warm, "MIN_TEMP is warm"),
        (34.9, TemperatureBand::Warm, "below MAX_TEMP is warm"),
        (35.0, TemperatureBand::Hot, "MAX_TEMP is hot"),
    ] {
        let mut app = AppLogic::new(config.temp);
        app.record_temperature(temp);
        results.assert_eq(app.temperature_band(), band, name);
    }

    let mut model = Model {
        node_name: config.network.node_name,
        variant: config.variant,
        temperature: Some(27.5),
        fans: FanPair::from_intake(MAX_DUTY, &config.duty),
        rpm: [1_450, 1_020],
    };
    let mut app = AppLogic::new(config.temp);
    app.record_temperature(27.5);
    let lines = app.status_lines(&model);
    results.assert_eq(lines[0].as_str(), config.network.node_name, "node name row");
    results.assert(lines[1].contains("27.5C") && lines[1].contains("Warm"), "temperature row");
    results.assert(lines[2].starts_with("IN") && lines[2].contains("100%"), "intake row");
    results.assert(lines[3].contains("1020rpm"), "exhaust row");
    results.assert(lines[4].contains("primary"), "variant row");
    results.assert(lines.iter().all(|l| l.len() <= LINE_WIDTH), "rows fit the panel");

    model.node_name = "a-very-long-node-name-for-the-oled";
    model.temperature = None;
    let lines = app.status_lines(&model);
    results.assert_eq(lines[0].len(), LINE_WIDTH, "long node name truncated");
    results.assert(lines[1].contains("--.-"), "missing temperature shown");

    let mut display = RecordingDisplay::default();
    let mut sensor = FixedSensor(31.0);
    let mut app = AppLogic::new(config.temp);
    let result = logic::update_display_with_sensor(&mut display, &mut sensor, &mut app, &mut model);
    results.assert_eq(result, Ok(()), "display update succeeds");
    results.assert_eq(model.temperature, Some(31.0), "model gets sensor reading");
    results.assert_eq(display.rows, STATUS_LINES as u32, "all rows drawn");
    results.assert(display.cleared && display.flushed, "cleared and flushed");
    results.assert(display.longest <= LINE_WIDTH, "drawn rows fit the panel");
}

async fn test_bmp280_sensor<SDA, SCL>(
    results: &mut TestResults,
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: SDA,
    scl: SCL,
) where
    SDA: Into<esp_hal::gpio::AnyPin<'static>>,
    SCL: Into<esp_hal::gpio::AnyPin<'static>>,
{
    esp_println::println!("\n[TEST] BMP280 Sensor Tests");

    let bus = match hardware::init_i2c_bus(i2c0, sda, scl) {
        Ok(bus) => bus,
        Err(e) => {
            esp_println::println!("  Failed to set up I2C: {}", e);
            results.assert(false, "I2C bus setup");
            return;
        }
    };
    let mut bmp280 = Bmp280::new(hardware::shared_i2c(bus), Delay::new(), BMP280_ADDRESS);

    match bmp280.init() {
        Ok(_) => {
            results.assert(true, "BMP280 initialization");
            results.assert(bmp280.calibration().is_some(), "calibration loaded");

            match bmp280.read_chip_id() {
                Ok(chip_id) => results.assert_eq(chip_id, sensor::BMP280_CHIP_ID, "BMP280 chip ID is 0x58"),
                Err(e) => {
                    esp_println::println!("    Failed to read chip ID: {}", e);
                    results.assert(false, "read chip ID");
                }
            }

            esp_println::println!("  Reading temperatures (5 samples)...");
            let mut temps = heapless::Vec::<f32, 5>::new();
            for i in 0..5 {
                Timer::after(Duration::from_millis(100)).await;
                match bmp280.read_temperature() {
                    Ok(temp) => {
                        esp_println::println!("    Sample {}: {:.2}°C", i + 1, temp);
                        let _ = temps.push(temp);
                    }
                    Err(e) => {
                        esp_println::println!("    Failed to read temperature: {}", e);
                    }
                }
            }

            results.assert_eq(temps.len(), 5, "collected 5 temperature samples");

            if temps.len() == 5 {
                for temp in temps.iter() {
                    results.assert(*temp > -40.0 && *temp < 85.0, "temperature in valid range");
                }

                let min_temp = temps.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_temp = temps.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                results.assert(max_temp - min_temp < 2.0, "temperature readings stable (within 2°C)");
            }
        }
        Err(e) => {
            esp_println::println!("  Failed to initialize BMP280: {}", e);
            results.assert(false, "BMP280 initialization");
        }
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("\n==========================================");
    esp_println::println!("=== Fanitizer Test Runner ===");
    esp_println::println!("==========================================");

    let mut results = TestResults::new();

    // Run tests that don't need hardware
    test_config(&mut results);
    test_fan_pair(&mut results);
    test_tacho(&mut results);
    test_bmp280_compensation(&mut results);
    test_app_logic(&mut results);
    test_fan_pins(
        &mut results,
        peripherals.GPIO12,
        peripherals.GPIO13,
        peripherals.GPIO14,
        peripherals.GPIO15,
    );

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Run hardware tests
    test_bmp280_sensor(&mut results, peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9).await;

    results.print_summary();

    esp_println::println!("\nTest run complete. Looping...");
    loop {
        if results.failed == 0 {
            Timer::after(Duration::from_millis(200)).await;
        } else {
            Timer::after(Duration::from_millis(1000)).await;
        }
    }
}
