//! Vordergrund-Logik - eine Iteration der Hauptschleife
//!
//! Die Firmware ruft [`Monitor::step`] einmal pro Wake-up auf. Ablauf:
//! Taster abtasten, Distanz messen, Presence-Flag ablegen, Strip-Farbe
//! bestimmen und flushen, Status auf dem Display ausgeben.
//!
//! Fehler brechen die Iteration nicht ab: eine fehlgeschlagene Messung
//! behält das letzte Presence-Flag, ein Display-Fehler wird ignoriert.
//! Beides steht im [`StepReport`] zum Loggen.

use core::fmt::Write;

use rgb::RGB8;

use crate::logic::{DisplayLine, SwitchEdge, break_due, format_distance, format_elapsed, is_present};
use crate::presence::SharedPresence;
use crate::sensor::{PollError, RangingSensor};
use crate::strip::Strip;
use crate::traits::{BusTransport, DisplayError, PulseSink, StatusDisplay};
use crate::types::{ColorCursor, NamedColor, RangeReading, SessionSnapshot};

/// Zeilenabstand beim 6x10 Font
const LINE_HEIGHT: u8 = 11;

/// Laufzeit-Konfiguration des Vordergrunds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Distanz unterhalb der jemand als anwesend gilt
    pub presence_threshold_mm: u16,
    /// Obergrenze für Data-Ready Abfragen pro Messung
    pub max_data_ready_polls: u32,
    /// Sitzungsdauer bis zur Pausen-Erinnerung, 0 = aus
    pub break_after_minutes: u16,
    pub switch_stable_samples: u8,
    pub default_color: NamedColor,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            presence_threshold_mm: 500,
            max_data_ready_polls: 2000,
            break_after_minutes: 30,
            switch_stable_samples: 1,
            default_color: NamedColor::White,
        }
    }
}

/// Ergebnis einer Iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub poll: Result<RangeReading, PollError>,
    /// Neue Farbe, falls der Taster gedrückt wurde
    pub color_changed: Option<NamedColor>,
    pub snapshot: SessionSnapshot,
    /// Farbe, die geflusht wurde
    pub strip_color: RGB8,
    pub break_due: bool,
    pub display: Result<(), DisplayError>,
}

/// Zustand des Vordergrunds
pub struct Monitor<const N: usize> {
    config: MonitorConfig,
    strip: Strip<N>,
    cursor: ColorCursor,
    switch: SwitchEdge,
    last_reading: Option<RangeReading>,
    blink_on: bool,
}

impl<const N: usize> Monitor<N> {
    pub fn new(config: MonitorConfig, strip: Strip<N>) -> Self {
        Self {
            config,
            strip,
            cursor: ColorCursor::new(config.default_color),
            switch: SwitchEdge::new(config.switch_stable_samples),
            last_reading: None,
            blink_on: true,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn strip(&self) -> &Strip<N> {
        &self.strip
    }

    pub fn current_color(&self) -> NamedColor {
        self.cursor.current()
    }

    pub fn last_reading(&self) -> Option<RangeReading> {
        self.last_reading
    }

    /// Strip beim Start ausschalten
    pub fn blank<P: PulseSink>(&mut self, sink: &mut P) {
        self.strip.clear_all();
        self.strip.flush(sink);
    }

    /// Eine Iteration der Hauptschleife
    pub fn step<T, P, D>(
        &mut self,
        sensor: &mut RangingSensor<T>,
        session: &SharedPresence,
        switch_low: bool,
        sink: &mut P,
        display: &mut D,
    ) -> StepReport
    where
        T: BusTransport,
        P: PulseSink,
        D: StatusDisplay,
    {
        let color_changed = self
            .switch
            .sample(switch_low)
            .then(|| self.cursor.advance());

        let poll = sensor.poll(self.config.max_data_ready_polls);
        if let Ok(reading) = poll {
            session.set_present(is_present(&reading, self.config.presence_threshold_mm));
            self.last_reading = Some(reading);
        }

        let snapshot = session.snapshot();
        let break_due = break_due(&snapshot, self.config.break_after_minutes);
        self.blink_on = !break_due || !self.blink_on;

        let lit = snapshot.present || snapshot.is_session_active();
        let strip_color = if lit && self.blink_on {
            self.cursor.current().rgb()
        } else {
            RGB8::default()
        };
        self.strip.set_all(strip_color.r, strip_color.g, strip_color.b);
        self.strip.flush(sink);

        let display = self.render_status(display, &snapshot, break_due);

        StepReport {
            poll,
            color_changed,
            snapshot,
            strip_color,
            break_due,
            display,
        }
    }

    fn render_status<D: StatusDisplay>(
        &self,
        display: &mut D,
        snapshot: &SessionSnapshot,
        break_due: bool,
    ) -> Result<(), DisplayError> {
        let mut status = DisplayLine::new();
        let written = if break_due {
            write!(status, "Take a break!")
        } else {
            write!(status, "Color {}", self.cursor.current().name())
        };
        debug_assert!(written.is_ok(), "status line truncated");

        display.clear()?;
        display.draw_text(0, 0, &format_elapsed(snapshot))?;
        display.draw_text(0, LINE_HEIGHT, &status)?;
        display.draw_text(0, 2 * LINE_HEIGHT, &format_distance(self.last_reading.as_ref()))?;
        display.render()
    }
}
