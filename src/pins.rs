//! Pin definitions for the e-paper panel and the front button
//!
//! Reference table for the wiring; `main.rs` takes the matching `gpioN` fields
//! from `Peripherals`.

/// GPIO assignments
pub struct Pins;

#[allow(dead_code)]
impl Pins {
    // SPI Display pins
    /// Chip Select pin for SPI display
    pub const CS: u8 = 45;
    /// Data/Command control pin (High for data, Low for command)
    pub const DC: u8 = 46;
    /// Reset pin for display
    pub const RST: u8 = 47;
    /// Busy status pin (High when display is busy)
    pub const BSY: u8 = 48;
    /// SPI Clock pin
    pub const SCK: u8 = 12;
    /// SPI Master Out Slave In
    pub const MOSI: u8 = 11;
    /// Panel power enable
    pub const PANEL_POWER: u8 = 7;

    /// Front button, active low with pull-up
    pub const BUTTON: u8 = 1;
}
