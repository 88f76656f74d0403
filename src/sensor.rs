//! BMP280 temperature driver over any `embedded-hal` I2C bus.

use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::traits::TemperatureSensor;

pub const BMP280_CHIP_ID: u8 = 0x58;

const REG_CALIB: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_TEMP: u8 = 0xFA;

const SOFT_RESET: u8 = 0xB6;
// standby 0.5ms, filter off
const CONFIG_VALUE: u8 = 0xA0;
// temp oversampling x1, pressure x16, normal mode
const CTRL_MEAS_VALUE: u8 = 0x3F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
}

impl Calibration {
    fn from_bytes(raw: &[u8; 6]) -> Self {
        Self {
            dig_t1: u16::from_le_bytes([raw[0], raw[1]]),
            dig_t2: i16::from_le_bytes([raw[2], raw[3]]),
            dig_t3: i16::from_le_bytes([raw[4], raw[5]]),
        }
    }
}

/// Bosch BMP280 datasheet compensation formula (integer version)
pub fn compensate_temperature(adc_t: i32, calib: &Calibration) -> f32 {
    let t1 = calib.dig_t1 as i32;
    let var1 = (((adc_t >> 3) - (t1 << 1)) * (calib.dig_t2 as i32)) >> 11;
    let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * (calib.dig_t3 as i32)) >> 14;
    let t_fine = var1 + var2;
    ((t_fine * 5 + 128) >> 8) as f32 / 100.0
}

/// 20 bit raw temperature from the MSB, LSB, XLSB registers
pub fn raw_temperature(buf: &[u8; 3]) -> i32 {
    ((buf[0] as i32) << 12) | ((buf[1] as i32) << 4) | ((buf[2] as i32) >> 4)
}

pub struct Bmp280<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    calibration: Option<Calibration>,
}

impl<I2C: I2c, D: DelayNs> Bmp280<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            calibration: None,
        }
    }

    pub fn read_chip_id(&mut self) -> Result<u8, &'static str> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_CHIP_ID], &mut id)
            .map_err(|_| "i2c read failed")?;
        Ok(id[0])
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }

    fn wait_for_nvm_copy(&mut self) {
        // status bit 0 is set while NVM data is being copied
        for _ in 0..50 {
            let mut status = [0u8];
            if self
                .i2c
                .write_read(self.address, &[REG_STATUS], &mut status)
                .is_ok()
                && status[0] & 0x01 == 0
            {
                return;
            }
            self.delay.delay_ms(20);
        }
    }
}

impl<I2C: I2c, D: DelayNs> TemperatureSensor for Bmp280<I2C, D> {
    fn init(&mut self) -> Result<(), &'static str> {
        self.i2c
            .write(self.address, &[REG_RESET, SOFT_RESET])
            .map_err(|_| "Failed to reset sensor")?;
        self.delay.delay_ms(100);
        self.wait_for_nvm_copy();

        let chip_id = self.read_chip_id()?;
        esp_println::println!("[BMP280] Chip ID: 0x{:02X}", chip_id);
        if chip_id != BMP280_CHIP_ID {
            return Err("Unexpected chip ID");
        }

        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_CALIB], &mut raw)
            .map_err(|_| "Failed to read calibration data")?;
        let calibration = Calibration::from_bytes(&raw);
        esp_println::println!(
            "[BMP280] Calibration: T1={}, T2={}, T3={}",
            calibration.dig_t1,
            calibration.dig_t2,
            calibration.dig_t3
        );
        self.calibration = Some(calibration);

        self.i2c
            .write(self.address, &[REG_CONFIG, CONFIG_VALUE])
            .map_err(|_| "Failed to configure config register")?;
        self.delay.delay_ms(10);
        self.i2c
            .write(self.address, &[REG_CTRL_MEAS, CTRL_MEAS_VALUE])
            .map_err(|_| "Failed to configure control register")?;
        self.delay.delay_ms(100);

        esp_println::println!("[BMP280] Initialized");
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, &'static str> {
        let calib = self.calibration.ok_or("Sensor not initialized")?;

        let mut buf = [0u8; 3];
        self.i2c
            .write_read(self.address, &[REG_TEMP], &mut buf)
            .map_err(|_| "I2C read error")?;

        Ok(compensate_temperature(raw_temperature(&buf), &calib))
    }
}
