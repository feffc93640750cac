//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware-Zugriff
//! ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** `nanny-firmware` (RMT, esp-hal I²C, SSD1306)
//! - **Testing:** Mocks in `nanny-tests`

use core::fmt;

use crate::strip::Pulse;

// ============================================================================
// Bus Transport (I²C Primitive)
// ============================================================================

/// Richtung einer Bus-Transaktion (R/W-Bit der Adresse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

/// Ob nach einem Byte eine Stop-Condition gesendet wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopCondition {
    /// Transaktion bleibt offen (weitere Bytes oder Restart folgen)
    Continue,
    /// Stop-Condition nach diesem Byte
    Stop,
}

/// Quittung des Masters nach einem gelesenen Byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Acknowledge {
    Ack,
    Nack,
}

/// Fehler eines einzelnen Bus-Primitivs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusFault {
    /// Gerät hat Adresse oder Daten nicht quittiert
    Nack,
    ArbitrationLost,
    /// Interner Puffer des Transports ist voll
    Overrun,
    Other,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusFault::Nack => write!(f, "no acknowledge"),
            BusFault::ArbitrationLost => write!(f, "arbitration lost"),
            BusFault::Overrun => write!(f, "transport buffer overrun"),
            BusFault::Other => write!(f, "bus error"),
        }
    }
}

/// Byte-orientierte Primitive eines Zwei-Draht-Busses
///
/// Der Register-Layer (`crate::register`) setzt daraus die festen
/// Lese/Schreib-Sequenzen zusammen. Nach einem Fehler bleibt der Bus in dem
/// Zustand, den der Transport hinterlässt; der Aufrufer muss neu `start()`en.
pub trait BusTransport {
    /// Sendet Start (oder Restart) mit 7-Bit Adresse und Richtung
    fn start(&mut self, address: u8, direction: Direction) -> Result<(), BusFault>;

    /// Schreibt ein Byte, optional gefolgt von Stop
    fn write_byte(&mut self, value: u8, stop: StopCondition) -> Result<(), BusFault>;

    /// Liest ein Byte, quittiert es mit `ack` und sendet optional Stop
    fn read_byte(&mut self, ack: Acknowledge, stop: StopCondition) -> Result<u8, BusFault>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn start(&mut self, address: u8, direction: Direction) -> Result<(), BusFault> {
        (**self).start(address, direction)
    }

    fn write_byte(&mut self, value: u8, stop: StopCondition) -> Result<(), BusFault> {
        (**self).write_byte(value, stop)
    }

    fn read_byte(&mut self, ack: Acknowledge, stop: StopCondition) -> Result<u8, BusFault> {
        (**self).read_byte(ack, stop)
    }
}

// ============================================================================
// Pulse Sink (LED-Datenleitung)
// ============================================================================

/// Empfänger für die Pulsfolge eines Strip-Frames
///
/// `flush()` ruft `pulse()` genau 24·N mal und danach einmal `latch()`.
/// Die Implementierung ist für das Timing auf der Leitung verantwortlich;
/// Timing-Fehler sind in Software nicht erkennbar.
pub trait PulseSink {
    /// Ein Bit: `high_ns` High, danach `low_ns` Low
    fn pulse(&mut self, pulse: Pulse);

    /// Ende des Frames: Leitung mindestens `low_ns` auf Low halten
    fn latch(&mut self, low_ns: u32);
}

impl<S: PulseSink + ?Sized> PulseSink for &mut S {
    fn pulse(&mut self, pulse: Pulse) {
        (**self).pulse(pulse)
    }

    fn latch(&mut self, low_ns: u32) {
        (**self).latch(low_ns)
    }
}

// ============================================================================
// Status Display
// ============================================================================

/// Fehler-Typ für Display-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    WriteFailed,
}

/// Trait für das Status-Display (SSD1306 128x32)
///
/// Opaker Sink: Text wird an festen Pixel-Koordinaten in einen Puffer
/// gezeichnet und mit `render()` übertragen.
pub trait StatusDisplay {
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn draw_text(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError>;

    fn render(&mut self) -> Result<(), DisplayError>;
}
