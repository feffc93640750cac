//! Core Types für den Computer Nanny
//!
//! Datenstrukturen ohne Hardware-Dependencies

use rgb::RGB8;

/// Helligkeit der vordefinierten Farben (0-255)
///
/// Gedimmt, damit der Strip als Arbeitslicht nicht blendet.
pub const COLOR_LEVEL: u8 = 125;

/// Abgestufter Kanal für Mischfarben
const COLOR_ACCENT: u8 = 50;

/// Auswahl der Strip-Farben (Taster schaltet weiter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
    White,
    Pink,
    Orange,
    LightBlue,
    LightGreen,
}

impl NamedColor {
    /// Alle Farben in Weiterschalt-Reihenfolge
    pub const ALL: [NamedColor; 11] = [
        NamedColor::Red,
        NamedColor::Green,
        NamedColor::Blue,
        NamedColor::Yellow,
        NamedColor::Purple,
        NamedColor::Cyan,
        NamedColor::White,
        NamedColor::Pink,
        NamedColor::Orange,
        NamedColor::LightBlue,
        NamedColor::LightGreen,
    ];

    pub const fn rgb(self) -> RGB8 {
        const L: u8 = COLOR_LEVEL;
        const A: u8 = COLOR_ACCENT;
        match self {
            NamedColor::Red => RGB8 { r: L, g: 0, b: 0 },
            NamedColor::Green => RGB8 { r: 0, g: L, b: 0 },
            NamedColor::Blue => RGB8 { r: 0, g: 0, b: L },
            NamedColor::Yellow => RGB8 { r: L, g: L, b: 0 },
            NamedColor::Purple => RGB8 { r: L, g: 0, b: L },
            NamedColor::Cyan => RGB8 { r: 0, g: L, b: L },
            NamedColor::White => RGB8 { r: L, g: L, b: L },
            NamedColor::Pink => RGB8 { r: L, g: 0, b: A },
            NamedColor::Orange => RGB8 { r: L, g: A, b: 0 },
            NamedColor::LightBlue => RGB8 { r: 0, g: A, b: L },
            NamedColor::LightGreen => RGB8 { r: 0, g: L, b: A },
        }
    }

    /// Anzeigename (ASCII, passt in eine Display-Zeile)
    pub const fn name(self) -> &'static str {
        match self {
            NamedColor::Red => "Red",
            NamedColor::Green => "Green",
            NamedColor::Blue => "Blue",
            NamedColor::Yellow => "Yellow",
            NamedColor::Purple => "Purple",
            NamedColor::Cyan => "Cyan",
            NamedColor::White => "White",
            NamedColor::Pink => "Pink",
            NamedColor::Orange => "Orange",
            NamedColor::LightBlue => "Light blue",
            NamedColor::LightGreen => "Light green",
        }
    }

    /// Position in `ALL`
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }
}

/// Aktuelle Farbauswahl
///
/// Wird beim Boot auf die Default-Farbe gesetzt und nur vom Vordergrund
/// beim Tastendruck weitergeschaltet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCursor {
    index: usize,
}

impl ColorCursor {
    pub fn new(start: NamedColor) -> Self {
        Self {
            index: start.position(),
        }
    }

    pub fn current(&self) -> NamedColor {
        NamedColor::ALL[self.index]
    }

    /// Nächste Farbe, nach der letzten wieder die erste
    pub fn advance(&mut self) -> NamedColor {
        self.index = (self.index + 1) % NamedColor::ALL.len();
        self.current()
    }
}

impl Default for ColorCursor {
    fn default() -> Self {
        Self::new(NamedColor::White)
    }
}

/// Eine Distanzmessung (nur für den aktuellen Zyklus gültig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeReading {
    pub distance_mm: u16,
    /// Dekodierter Range-Status, 0 = gültige Messung
    pub status: u8,
}

impl RangeReading {
    pub fn is_valid(&self) -> bool {
        self.status == 0
    }
}

/// Zustand des Presence-Automaten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Absent,
    Present,
    /// Kurz außer Reichweite, Sitzung noch nicht beendet
    Grace,
}

/// Kopie der Sitzungszähler für die Anzeige
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: PresenceState,
    pub present: bool,
    pub sub_ticks: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub grace_ticks: u8,
}

impl SessionSnapshot {
    pub fn is_session_active(&self) -> bool {
        self.state != PresenceState::Absent
    }

    /// Vollständige Minuten der Sitzung
    pub fn total_minutes(&self) -> u32 {
        self.hours as u32 * 60 + self.minutes as u32
    }
}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for NamedColor {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RangeReading {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "RangeReading {{ distance: {} mm, status: {} }}",
            self.distance_mm,
            self.status
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PresenceState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            PresenceState::Absent => defmt::write!(fmt, "Absent"),
            PresenceState::Present => defmt::write!(fmt, "Present"),
            PresenceState::Grace => defmt::write!(fmt, "Grace"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SessionSnapshot {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Session {{ {}, {}:{}:{}, grace: {} }}",
            self.state,
            self.hours,
            self.minutes,
            self.seconds,
            self.grace_ticks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wraps_to_first() {
        let mut cursor = ColorCursor::new(NamedColor::LightGreen);
        assert_eq!(cursor.advance(), NamedColor::Red);
    }

    #[test]
    fn test_cursor_full_cycle() {
        let mut cursor = ColorCursor::default();
        let start = cursor.current();
        for _ in 0..NamedColor::ALL.len() {
            cursor.advance();
        }
        assert_eq!(cursor.current(), start);
    }

    #[test]
    fn test_named_color_values() {
        assert_eq!(NamedColor::Pink.rgb(), RGB8 { r: 125, g: 0, b: 50 });
        assert_eq!(NamedColor::LightBlue.rgb(), RGB8 { r: 0, g: 50, b: 125 });
    }
}
