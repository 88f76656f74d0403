#![no_std]
#![no_main]

use core::panic::PanicInfo;
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, gpio::AnyPin, timer::timg::TimerGroup};

use fanitizer::{
    FanConfig,
    config::{BMP280_ADDRESS, SAMPLE_PERIOD_MS},
    display::StatusDisplay,
    fan::{FanPair, FanRole},
    hardware::{self, FanPins, FanPwm, SharedI2c, TachoCounters},
    logic::{self, AppLogic},
    model::{Model, STATUS},
    sensor::Bmp280,
    tacho::TachoReader,
    traits::{Display, FanOutput, TemperatureSensor},
};

const HEART_BEAT_INTERVAL_MS: u64 = 30_000;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
        esp_println::println!("[PANIC] continue...");
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

async fn halt(reason: &str) -> ! {
    loop {
        esp_println::println!("[ERROR] {} - halted", reason);
        Timer::after(Duration::from_secs(10)).await;
    }
}

#[embassy_executor::task]
async fn run_heartbeat() {
    loop {
        esp_println::println!("[HEARTBEAT] up {}s", Instant::now().as_secs());
        Timer::after(Duration::from_millis(HEART_BEAT_INTERVAL_MS)).await;
    }
}

#[embassy_executor::task]
async fn display_task(mut display: StatusDisplay<SharedI2c>, config: FanConfig) {
    if let Err(e) = display.init() {
        esp_println::println!("[OLED] Init failed: {}", e);
        return;
    }

    let mut app = AppLogic::new(config.temp);
    loop {
        let model = STATUS.wait().await;
        if let Some(temp) = model.temperature {
            app.record_temperature(temp);
        }
        if let Err(e) = logic::render_status(&mut display, &app, &model) {
            esp_println::println!("[OLED] Render failed: {}", e);
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== Fanitizer ===");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = FanConfig::current();
    esp_println::println!(
        "[CONFIG] node={} variant={} pins IN pwm={} tacho={} EX pwm={} tacho={}",
        config.network.node_name,
        config.variant.label(),
        config.pins.intake_pwm,
        config.pins.intake_tacho,
        config.pins.exhaust_pwm,
        config.pins.exhaust_tacho
    );
    if let Err(e) = config.validate() {
        esp_println::println!("[CONFIG] Invalid configuration: {}", e);
        halt("configuration rejected").await;
    }

    if let Err(e) = spawner.spawn(run_heartbeat()) {
        esp_println::println!("[ERROR] Failed to spawn task: {:?}", e);
    }

    // GPIO12..GPIO15 are wired to the fan headers, the variant decides
    // which of them drives or reads which fan
    let connectors: [AnyPin<'static>; 4] = [
        peripherals.GPIO12.into(),
        peripherals.GPIO13.into(),
        peripherals.GPIO14.into(),
        peripherals.GPIO15.into(),
    ];
    let pins = match FanPins::route(&config.pins, connectors) {
        Ok(pins) => pins,
        Err(e) => halt(e).await,
    };

    let mut pwm = match FanPwm::new(peripherals.LEDC, pins.intake_pwm, pins.exhaust_pwm) {
        Ok(pwm) => pwm,
        Err(e) => halt(e).await,
    };

    let fans = FanPair::baseline(&config);
    for (output, role) in [(&mut pwm.intake, FanRole::Intake), (&mut pwm.exhaust, FanRole::Exhaust)] {
        let duty = fans.duty(role);
        match output.set_duty(duty) {
            Ok(()) => esp_println::println!(
                "[PWM] {} duty {} ({}%)",
                role.label(),
                duty.0,
                duty.percent()
            ),
            Err(e) => esp_println::println!("[PWM] {} duty failed: {}", role.label(), e),
        }
    }

    let counters = match TachoCounters::new(peripherals.PCNT, pins.intake_tacho, pins.exhaust_tacho) {
        Ok(counters) => counters,
        Err(e) => halt(e).await,
    };
    esp_println::println!("[TACHO] Counting pulses on PCNT units 0 and 1");

    // OLED and BMP280 share I2C0 on GPIO8 (SDA) / GPIO9 (SCL)
    let bus = match hardware::init_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(bus) => bus,
        Err(e) => halt(e).await,
    };

    let display = StatusDisplay::new(hardware::shared_i2c(bus));
    if let Err(e) = spawner.spawn(display_task(display, config)) {
        esp_println::println!("[ERROR] Failed to spawn display task: {:?}", e);
    }

    let mut bmp280 = Bmp280::new(hardware::shared_i2c(bus), Delay::new(), BMP280_ADDRESS);
    let sensor_ok = match bmp280.init() {
        Ok(()) => true,
        Err(e) => {
            esp_println::println!("[BMP280] Init failed: {}", e);
            false
        }
    };

    let mut tachos = TachoReader::new();
    loop {
        let temperature = if sensor_ok {
            match bmp280.read_temperature() {
                Ok(temp) => Some(temp),
                Err(e) => {
                    esp_println::println!("[BMP280] Read error: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let model = Model {
            node_name: config.network.node_name,
            variant: config.variant,
            temperature,
            fans,
            rpm: tachos.sample_all(&counters, Instant::now().as_millis()),
        };

        esp_println::println!(
            "[STATUS] temp={:?} IN {}% {}rpm EX {}% {}rpm",
            model.temperature,
            model.fans.intake.percent(),
            model.rpm(FanRole::Intake),
            model.fans.exhaust.percent(),
            model.rpm(FanRole::Exhaust)
        );
        STATUS.signal(model);

        Timer::after(Duration::from_millis(SAMPLE_PERIOD_MS)).await;
    }
}
