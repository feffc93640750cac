// SSD1306 OLED (128x32) als StatusDisplay
//
// Gezeichnet wird in den RAM-Framebuffer, `render()` überträgt ihn per I2C.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use nanny_core::{DisplayError, StatusDisplay};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

type Display<I> =
    Ssd1306<I2CInterface<I>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

pub struct OledDisplay<I> {
    display: Display<I>,
}

impl<I: I2c> OledDisplay<I> {
    /// Display initialisieren (Adresse 0x3C)
    pub fn new(i2c: I) -> Result<Self, DisplayError> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display.init().map_err(|_| DisplayError::WriteFailed)?;
        Ok(Self { display })
    }
}

impl<I: I2c> StatusDisplay for OledDisplay<I> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.display.clear_buffer();
        Ok(())
    }

    fn draw_text(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        Text::with_baseline(text, Point::new(x as i32, y as i32), style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(|_| DisplayError::WriteFailed)?;
        Ok(())
    }

    fn render(&mut self) -> Result<(), DisplayError> {
        self.display.flush().map_err(|_| DisplayError::WriteFailed)
    }
}
