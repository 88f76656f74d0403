use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

use crate::config::{OLED_RESET, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::traits::Display;

// DisplaySize128x64 below is the only panel wired up
const _: () = assert!(SCREEN_WIDTH == 128 && SCREEN_HEIGHT == 64);

type Panel<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// SSD1306 OLED on I2C (address 0x3C), buffered graphics mode.
pub struct StatusDisplay<I2C> {
    panel: Panel<I2C>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl<I2C: I2c> StatusDisplay<I2C> {
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();

        Self { panel, style }
    }
}

impl<I2C: I2c> Display for StatusDisplay<I2C> {
    fn init(&mut self) -> Result<(), &'static str> {
        esp_println::println!(
            "[OLED] Initializing SSD1306 {}x{} (reset pin {})",
            SCREEN_WIDTH,
            SCREEN_HEIGHT,
            OLED_RESET
        );
        // no reset line is wired when OLED_RESET is -1, init over I2C only
        self.panel
            .init()
            .map_err(|_| "Failed to initialize display")?;
        self.clear()?;
        self.update()
    }

    fn clear(&mut self) -> Result<(), &'static str> {
        self.panel.clear_buffer();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<(), &'static str> {
        Text::with_baseline(text, Point::new(x, y), self.style, Baseline::Top)
            .draw(&mut self.panel)
            .map_err(|_| "Failed to draw text")?;
        Ok(())
    }

    fn update(&mut self) -> Result<(), &'static str> {
        self.panel.flush().map_err(|_| "Failed to update display")
    }
}
