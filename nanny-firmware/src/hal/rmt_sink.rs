// RMT Pulse Sink - gibt den Pulse-Train des Strips über das RMT Peripheral aus
//
// Der Encoder in nanny-core liefert Pulse in Nanosekunden; hier werden sie in
// RMT-Ticks umgerechnet, gesammelt und beim Latch in einem Rutsch gesendet.

use esp_hal::Blocking;
use esp_hal::gpio::Level;
use esp_hal::gpio::interconnect::PeripheralOutput;
use esp_hal::rmt::{Channel, PulseCode, Rmt, Tx, TxChannelConfig, TxChannelCreator};
use esp_hal::time::Rate;
use nanny_core::strip::ns_to_ticks;
use nanny_core::{BitTiming, ChannelOrder, Pulse, PulseSink, Strip};
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;

use crate::config::{LED_COUNT, RMT_BUFFER_SIZE, RMT_CLOCK_MHZ};

/// Fehler beim Senden eines Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum RmtError {
    /// Mehr Pulse als in den Buffer passen
    BufferOverflow,
    /// Kanal nach einem früheren Fehler nicht mehr verfügbar
    ChannelUnavailable,
    /// Fehler vom RMT Treiber
    Transmit(esp_hal::rmt::Error),
}

/// Sammelt Pulse und sendet sie beim Latch
pub struct RmtPulseSink<'d> {
    channel: Option<Channel<'d, Blocking, Tx>>,
    buffer: [PulseCode; RMT_BUFFER_SIZE],
    len: usize,
    overflow: bool,
    last_error: Option<RmtError>,
}

impl<'d> RmtPulseSink<'d> {
    /// Konfiguriert einen RMT TX-Kanal für die Strip-Datenleitung
    ///
    /// # Parameter
    /// - `channel`: freier RMT Kanal (z.B. `rmt.channel0`)
    /// - `pin`: GPIO der Datenleitung
    pub fn new<C, P>(channel: C, pin: P) -> Result<Self, esp_hal::rmt::Error>
    where
        C: TxChannelCreator<'d, Blocking>,
        P: PeripheralOutput<'d>,
    {
        let config = TxChannelConfig::default()
            .with_clk_divider(1)
            .with_idle_output_level(Level::Low)
            .with_idle_output(true)
            .with_carrier_modulation(false);
        let channel = channel.configure_tx(pin, config)?;

        Ok(Self {
            channel: Some(channel),
            buffer: [PulseCode::default(); RMT_BUFFER_SIZE],
            len: 0,
            overflow: false,
            last_error: None,
        })
    }

    /// Fehler des letzten Frames abholen (für Logging)
    pub fn take_error(&mut self) -> Option<RmtError> {
        self.last_error.take()
    }

    fn push(&mut self, code: PulseCode) {
        match self.buffer.get_mut(self.len) {
            Some(slot) => {
                *slot = code;
                self.len += 1;
            }
            None => self.overflow = true,
        }
    }

    fn transmit(&mut self) -> Result<(), RmtError> {
        let channel = self.channel.take().ok_or(RmtError::ChannelUnavailable)?;
        let transaction = channel
            .transmit(&self.buffer[..self.len])
            .map_err(RmtError::Transmit)?;
        match transaction.wait() {
            Ok(channel) => {
                self.channel = Some(channel);
                Ok(())
            }
            Err((e, channel)) => {
                self.channel = Some(channel);
                Err(RmtError::Transmit(e))
            }
        }
    }
}

/// Nanosekunden → RMT-Ticks (15 Bit Feld)
fn ticks(ns: u32) -> u16 {
    ns_to_ticks(ns, RMT_CLOCK_MHZ).min(0x7FFF) as u16
}

impl PulseSink for RmtPulseSink<'_> {
    fn pulse(&mut self, pulse: Pulse) {
        self.push(PulseCode::new(
            Level::High,
            ticks(pulse.high_ns as u32),
            Level::Low,
            ticks(pulse.low_ns as u32),
        ));
    }

    fn latch(&mut self, low_ns: u32) {
        // Reset-Pause als Low-Puls; Länge 0 in der zweiten Hälfte beendet den Frame
        self.push(PulseCode::new(Level::Low, ticks(low_ns), Level::Low, 0));

        self.last_error = if self.overflow {
            Some(RmtError::BufferOverflow)
        } else {
            self.transmit().err()
        };
        self.len = 0;
        self.overflow = false;
    }
}

/// `SmartLedsWrite` für Code, der nur Farben kennt (z.B. Strip beim Start löschen)
impl SmartLedsWrite for RmtPulseSink<'_> {
    type Error = RmtError;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let mut strip: Strip<LED_COUNT> = Strip::new(ChannelOrder::Grb, BitTiming::WS2812B);
        for (index, color) in iterator.into_iter().take(LED_COUNT).enumerate() {
            strip.set_color(index, color.into());
        }
        strip.flush(self);
        self.take_error().map_or(Ok(()), Err)
    }
}

/// RMT Peripheral mit dem Takt aus der Konfiguration initialisieren
pub fn init_rmt<'d>(rmt: esp_hal::peripherals::RMT<'d>) -> Result<Rmt<'d, Blocking>, esp_hal::rmt::Error> {
    Rmt::new(rmt, Rate::from_mhz(RMT_CLOCK_MHZ))
}
