//! I2C bus check for the Fanitizer board.
//!
//! Scans the shared bus the OLED and the BMP280 sit on and reports whether
//! both answer at their configured addresses.
//!
//! Following pins are used:
//! - SDA => GPIO8
//! - SCL => GPIO9

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{
    delay::Delay,
    i2c::master::{Config, I2c},
    time::Rate,
    timer::timg::TimerGroup,
};
use heapless::Vec;

use fanitizer::config::{BMP280_ADDRESS, I2C_FREQUENCY_KHZ, OLED_ADDRESS};

esp_bootloader_esp_idf::esp_app_desc!();

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
        esp_println::println!("[PANIC] continue...");
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut i2c0 = match I2c::new(
        peripherals.I2C0,
        Config::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    ) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO8)
            .with_scl(peripherals.GPIO9)
            .into_async(),
        Err(e) => {
            esp_println::println!("[ERROR] I2C config rejected: {:?}", e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };

    esp_println::println!("I2C scan start");
    let mut found: Vec<u8, 112> = Vec::new();
    for address in 0x03..0x78 {
        let mut buf = [0u8; 1];
        if i2c0.write_read_async(address, &[], &mut buf).await.is_ok() {
            esp_println::println!("Found device at address 0x{:02X}", address);
            let _ = found.push(address);
        }
    }
    esp_println::println!("I2C scan done, {} device(s)", found.len());

    for (name, address) in [("SSD1306", OLED_ADDRESS), ("BMP280", BMP280_ADDRESS)] {
        if found.contains(&address) {
            esp_println::println!("  {} at 0x{:02X}: ok", name, address);
        } else {
            esp_println::println!("  {} at 0x{:02X}: MISSING", name, address);
        }
    }

    loop {
        Timer::after(Duration::from_millis(100)).await;
    }
}
