//! Nanny Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Strip-Encoder, Presence-Automat, Register-Protokoll und die
//! Vordergrund-Logik laufen auf dem Host genauso wie auf dem ESP32-C6.

#![no_std]

pub mod i2c;
pub mod logic;
pub mod monitor;
pub mod presence;
pub mod register;
pub mod sensor;
pub mod strip;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use i2c::HalI2cTransport;
pub use logic::{SwitchEdge, break_due, format_distance, format_elapsed, is_present};
pub use monitor::{Monitor, MonitorConfig, StepReport};
pub use presence::{PresenceConfig, PresenceTimer, SharedPresence};
pub use register::{DEVICE_ADDRESS, RegisterBus, RegisterError};
pub use sensor::{ConfigError, DistanceMode, PollError, RangingSensor};
pub use strip::{BitTiming, ChannelOrder, Pulse, Strip};
pub use traits::{
    Acknowledge, BusFault, BusTransport, Direction, DisplayError, PulseSink, StatusDisplay,
    StopCondition,
};
pub use types::{ColorCursor, NamedColor, PresenceState, RangeReading, SessionSnapshot};
