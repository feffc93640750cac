//! Strip Driver - Frame-Puffer und Pulse-Encoder für WS2812B
//!
//! Der Frame liegt in Wire-Order im Speicher (GRB beim WS2812B), damit
//! `flush()` die Bytes ohne Umsortieren seriell ausgeben kann.
//!
//! Jedes Bit ist ein Puls: High-Phase lang (1) oder kurz (0), danach Low.
//! Übertragen wird MSB zuerst, Byte für Byte in Wire-Order. Nach dem
//! letzten Bit muss die Leitung mindestens `reset_ns` Low bleiben, sonst
//! verschmelzen zwei Frames.

use rgb::RGB8;

use crate::traits::PulseSink;

/// Bits pro LED (3 Kanäle à 8 Bit)
pub const BITS_PER_LED: usize = 24;

/// Reihenfolge der Farbkanäle auf der Datenleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelOrder {
    Rgb,
    Grb,
    Brg,
}

impl ChannelOrder {
    /// RGB → Wire-Order
    pub fn arrange(self, color: RGB8) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => [color.r, color.g, color.b],
            ChannelOrder::Grb => [color.g, color.r, color.b],
            ChannelOrder::Brg => [color.b, color.r, color.g],
        }
    }

    /// Wire-Order → RGB
    pub fn restore(self, slot: [u8; 3]) -> RGB8 {
        match self {
            ChannelOrder::Rgb => RGB8::new(slot[0], slot[1], slot[2]),
            ChannelOrder::Grb => RGB8::new(slot[1], slot[0], slot[2]),
            ChannelOrder::Brg => RGB8::new(slot[1], slot[2], slot[0]),
        }
    }
}

/// Ein kodiertes Bit auf der Datenleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulse {
    pub high_ns: u16,
    pub low_ns: u16,
}

/// Puls-Timing eines Strip-Typs (alle Werte in Nanosekunden)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub t0h: u16,
    pub t0l: u16,
    pub t1h: u16,
    pub t1l: u16,
    /// Minimale Low-Zeit nach dem Frame (Latch)
    pub reset_ns: u32,
    /// Erlaubte Abweichung pro Flanke laut Datenblatt
    pub tolerance_ns: u16,
}

impl BitTiming {
    /// WS2812B: 1.25 µs Bit-Slot, ±150 ns, 50 µs Reset
    pub const WS2812B: BitTiming = BitTiming {
        t0h: 400,
        t0l: 850,
        t1h: 800,
        t1l: 450,
        reset_ns: 50_000,
        tolerance_ns: 150,
    };

    /// Puls für ein einzelnes Bit
    pub const fn pulse(&self, bit: bool) -> Pulse {
        if bit {
            Pulse {
                high_ns: self.t1h,
                low_ns: self.t1l,
            }
        } else {
            Pulse {
                high_ns: self.t0h,
                low_ns: self.t0l,
            }
        }
    }

    /// Dauer eines Bit-Slots (für 0 und 1 identisch)
    pub const fn slot_ns(&self) -> u32 {
        self.t0h as u32 + self.t0l as u32
    }

    /// Ordnet eine gemessene High-Zeit einem Bit zu
    ///
    /// `None` wenn die Zeit außerhalb der Toleranz beider Symbole liegt;
    /// der Strip würde so einen Puls falsch interpretieren.
    pub fn classify(&self, high_ns: u16) -> Option<bool> {
        if high_ns.abs_diff(self.t1h) <= self.tolerance_ns {
            Some(true)
        } else if high_ns.abs_diff(self.t0h) <= self.tolerance_ns {
            Some(false)
        } else {
            None
        }
    }
}

impl Default for BitTiming {
    fn default() -> Self {
        Self::WS2812B
    }
}

/// Rechnet Nanosekunden in Takte eines Peripherals mit `clock_mhz` um (gerundet)
pub const fn ns_to_ticks(ns: u32, clock_mhz: u32) -> u32 {
    (ns * clock_mhz + 500) / 1000
}

/// Rechnet Takte zurück in Nanosekunden (gerundet)
pub const fn ticks_to_ns(ticks: u32, clock_mhz: u32) -> u32 {
    (ticks * 1000 + clock_mhz / 2) / clock_mhz
}

/// LED-Strip mit fester Länge `N`
///
/// Der Puffer ist exakt 3·N Bytes groß und wird nie umallokiert.
/// Ein Index `>= N` ist ein Programmierfehler und führt zu einem Panic.
#[derive(Debug, Clone)]
pub struct Strip<const N: usize> {
    frame: [[u8; 3]; N],
    order: ChannelOrder,
    timing: BitTiming,
}

impl<const N: usize> Strip<N> {
    /// Leerer Frame (alle LEDs aus)
    pub const fn new(order: ChannelOrder, timing: BitTiming) -> Self {
        Self {
            frame: [[0; 3]; N],
            order,
            timing,
        }
    }

    /// Anzahl der LEDs
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Setzt die Farbe einer LED
    pub fn set(&mut self, index: usize, r: u8, g: u8, b: u8) {
        self.set_color(index, RGB8::new(r, g, b));
    }

    pub fn set_color(&mut self, index: usize, color: RGB8) {
        self.frame[index] = self.order.arrange(color);
    }

    /// Setzt alle LEDs, aufsteigend von 0 bis N-1
    pub fn set_all(&mut self, r: u8, g: u8, b: u8) {
        for index in 0..N {
            self.set(index, r, g, b);
        }
    }

    pub fn clear(&mut self, index: usize) {
        self.set(index, 0, 0, 0);
    }

    pub fn clear_all(&mut self) {
        self.set_all(0, 0, 0);
    }

    /// Liest die Farbe einer LED zurück
    pub fn get(&self, index: usize) -> RGB8 {
        self.order.restore(self.frame[index])
    }

    /// Frame-Bytes in Übertragungsreihenfolge
    pub fn wire_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.frame.iter().flatten().copied()
    }

    /// Pulsfolge des aktuellen Frames (ohne Latch)
    pub fn pulses(&self) -> PulseTrain<'_, N> {
        PulseTrain {
            strip: self,
            bit: 0,
        }
    }

    /// Überträgt den Frame auf die Datenleitung
    ///
    /// Darf nur aus dem Vordergrund aufgerufen werden, nie aus einem
    /// Interrupt. Zwischen zwei Aufrufen muss mindestens `reset_ns` liegen.
    pub fn flush<S: PulseSink>(&self, sink: &mut S) {
        for pulse in self.pulses() {
            sink.pulse(pulse);
        }
        sink.latch(self.timing.reset_ns);
    }
}

/// Iterator über die 24·N Pulse eines Frames, MSB zuerst
pub struct PulseTrain<'a, const N: usize> {
    strip: &'a Strip<N>,
    bit: usize,
}

impl<const N: usize> Iterator for PulseTrain<'_, N> {
    type Item = Pulse;

    fn next(&mut self) -> Option<Pulse> {
        if self.bit >= N * BITS_PER_LED {
            return None;
        }
        let byte_index = self.bit / 8;
        let byte = self.strip.frame[byte_index / 3][byte_index % 3];
        let shift = 7 - (self.bit % 8);
        self.bit += 1;
        Some(self.strip.timing.pulse((byte >> shift) & 1 == 1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = N * BITS_PER_LED - self.bit;
        (remaining, Some(remaining))
    }
}

impl<const N: usize> ExactSizeIterator for PulseTrain<'_, N> {}
