// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus nanny-core für die echte Hardware.
// Die Logik selbst bleibt in nanny-core und wird dort mit Mocks getestet,
// ebenso der I2C-Adapter (nanny_core::HalI2cTransport).

pub mod oled;
pub mod rmt_sink;

pub use oled::OledDisplay;
pub use rmt_sink::{RmtError, RmtPulseSink, init_rmt};
