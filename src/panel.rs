//! Waveshare 7.5" V2 panel behind the `Panel` trait

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use epd_waveshare::epd7in5_v2::{Epd7in5, HEIGHT, WIDTH};
use epd_waveshare::prelude::WaveshareDisplay;
use living_clock::render::{Framebuffer, Panel};
use living_clock::{Error, Result};
use log::info;

pub const PANEL_WIDTH: u32 = WIDTH;
pub const PANEL_HEIGHT: u32 = HEIGHT;

pub struct EpdPanel<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    epd: Epd7in5<SPI, BUSY, DC, RST, DELAY>,
    delay: DELAY,
    buffer: Vec<u8>,
}

impl<SPI, BUSY, DC, RST, DELAY> EpdPanel<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(mut spi: SPI, busy: BUSY, dc: DC, rst: RST, mut delay: DELAY) -> Result<Self> {
        info!("Initializing {}x{} panel", WIDTH, HEIGHT);
        let epd = Epd7in5::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(|e| Error::Display(format!("{:?}", e)))?;
        Ok(Self {
            spi,
            epd,
            delay,
            buffer: Vec::new(),
        })
    }
}

impl<SPI, BUSY, DC, RST, DELAY> Panel for EpdPanel<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn refresh(&mut self, frame: &Framebuffer) -> Result<()> {
        if frame.width() != WIDTH || frame.height() != HEIGHT {
            return Err(Error::Display(format!(
                "frame is {}x{}, panel is {}x{}",
                frame.width(),
                frame.height(),
                WIDTH,
                HEIGHT
            )));
        }

        // Panel RAM uses 1 for white
        self.buffer.clear();
        self.buffer.extend(frame.as_bytes().iter().map(|b| !b));

        self.epd
            .update_and_display_frame(&mut self.spi, &self.buffer, &mut self.delay)
            .map_err(|e| Error::Display(format!("{:?}", e)))
    }
}
