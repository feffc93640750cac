//! Pure Business Logic Functions
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use core::fmt::Write;

use heapless::String;

use crate::types::{RangeReading, SessionSnapshot};

/// Maximale Zeichen pro Display-Zeile (128 px / 6 px Font)
pub const LINE_CAPACITY: usize = 21;

/// Eine Zeile Display-Text
pub type DisplayLine = String<LINE_CAPACITY>;

/// Ist jemand vor dem Sensor?
///
/// Nur die Distanz zählt, der Range-Status wird nicht ausgewertet.
///
/// # Beispiele
///
/// ```
/// # use nanny_core::{is_present, RangeReading};
/// let near = RangeReading { distance_mm: 420, status: 0 };
/// assert!(is_present(&near, 500));
/// ```
pub fn is_present(reading: &RangeReading, threshold_mm: u16) -> bool {
    reading.distance_mm < threshold_mm
}

/// Ist eine Pause fällig?
pub fn break_due(snapshot: &SessionSnapshot, break_after_minutes: u16) -> bool {
    break_after_minutes > 0
        && snapshot.is_session_active()
        && snapshot.total_minutes() >= break_after_minutes as u32
}

/// Sitzungszeit als `MM:SS` bzw. `H:MM:SS`
pub fn format_elapsed(snapshot: &SessionSnapshot) -> DisplayLine {
    let mut line = DisplayLine::new();
    // Längste Zeile "Time 255:255:255" passt in LINE_CAPACITY
    let written = if snapshot.hours > 0 {
        write!(
            line,
            "Time {}:{:02}:{:02}",
            snapshot.hours, snapshot.minutes, snapshot.seconds
        )
    } else {
        write!(line, "Time {:02}:{:02}", snapshot.minutes, snapshot.seconds)
    };
    debug_assert!(written.is_ok(), "elapsed line truncated");
    line
}

/// Distanzzeile für das Display
pub fn format_distance(reading: Option<&RangeReading>) -> DisplayLine {
    let mut line = DisplayLine::new();
    let written = match reading {
        Some(r) => write!(line, "Dist {} mm", r.distance_mm),
        None => write!(line, "Dist ---"),
    };
    debug_assert!(written.is_ok(), "distance line truncated");
    line
}

/// Flankenerkennung für den Taster (active-low, Pull-up)
///
/// Der Pegel wird einmal pro Vordergrund-Iteration abgetastet; das
/// Abtastintervall liegt weit über der Prellzeit. Ein Druck zählt erst,
/// wenn der gedrückte Pegel `stable_samples` mal in Folge gelesen wurde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEdge {
    stable_samples: u8,
    pressed_count: u8,
    latched: bool,
}

impl SwitchEdge {
    pub const fn new(stable_samples: u8) -> Self {
        Self {
            stable_samples: if stable_samples == 0 { 1 } else { stable_samples },
            pressed_count: 0,
            latched: false,
        }
    }

    /// Neuer Abtastwert; `true` genau einmal pro Tastendruck
    pub fn sample(&mut self, level_low: bool) -> bool {
        if !level_low {
            self.pressed_count = 0;
            self.latched = false;
            return false;
        }
        if self.latched {
            return false;
        }
        self.pressed_count = self.pressed_count.saturating_add(1);
        if self.pressed_count >= self.stable_samples {
            self.latched = true;
            return true;
        }
        false
    }
}

impl Default for SwitchEdge {
    fn default() -> Self {
        Self::new(1)
    }
}
