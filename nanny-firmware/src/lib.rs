// Library-Root: Hardware-Anbindung und Tasks
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von nanny-core
pub use nanny_core::{
    HalI2cTransport, Monitor, MonitorConfig, NamedColor, RangingSensor, SharedPresence,
};

use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::Blocking;
use esp_hal::i2c::master::I2c;

use crate::hal::OledDisplay;

// ============================================================================
// Type-Aliase für den geteilten I2C Bus
// ============================================================================
//
// Sensor und OLED hängen am selben Bus. Der Bus liegt in einer StaticCell
// (RefCell), jedes Gerät bekommt ein RefCellDevice darauf.

/// I2C Peripheral im Blocking-Modus
pub type I2cBus = I2c<'static, Blocking>;

/// Handle auf den geteilten Bus
pub type SharedI2c = RefCellDevice<'static, I2cBus>;

/// BusTransport für den VL53L1X
pub type SensorTransport = HalI2cTransport<SharedI2c>;

/// SSD1306 auf dem geteilten Bus
pub type StatusOled = OledDisplay<SharedI2c>;
