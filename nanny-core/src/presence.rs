//! Presence Timer - Sitzungszeit-Zustandsautomat
//!
//! Läuft im periodischen Timer-Interrupt (T = 100 ms). Pro Tick wird das
//! zuletzt vom Vordergrund gemeldete Presence-Flag ausgewertet:
//!
//! ```text
//!            present                      absent (Sitzung läuft)
//!  Absent ───────────▶ Present ─────────────────────────────▶ Grace
//!    ▲                   ▲  │ present: Zeit zählt               │
//!    │                   │  └──────────┘                        │
//!    │                   └──────────── present ─────────────────┤
//!    └──────────── grace_ticks absent: alles auf 0 ─────────────┘
//! ```
//!
//! In `Grace` bleibt die Sitzungszeit stehen; kommt der Nutzer vor Ablauf
//! zurück, läuft sie ohne Reset weiter.

use core::cell::Cell;

use critical_section::Mutex;

use crate::types::{PresenceState, SessionSnapshot};

/// Parameter des Zustandsautomaten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PresenceConfig {
    /// Ticks pro Sekunde (10 bei T = 100 ms)
    pub ticks_per_second: u8,
    /// Abwesenheits-Ticks bis zum Sitzungsende
    pub grace_ticks: u8,
}

impl PresenceConfig {
    pub const DEFAULT: PresenceConfig = PresenceConfig {
        ticks_per_second: 10,
        grace_ticks: 10,
    };
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sitzungszähler und Zustand
///
/// Invarianten: `sub_ticks < ticks_per_second`, `seconds < 60`,
/// `minutes < 60`, `grace < grace_ticks`; in `Absent` sind alle Zähler 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceTimer {
    config: PresenceConfig,
    state: PresenceState,
    sub_ticks: u8,
    seconds: u8,
    minutes: u8,
    hours: u8,
    grace: u8,
}

impl PresenceTimer {
    pub const fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            state: PresenceState::Absent,
            sub_ticks: 0,
            seconds: 0,
            minutes: 0,
            hours: 0,
            grace: 0,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Ein Timer-Tick mit dem aktuellen Presence-Flag
    ///
    /// Konstante Laufzeit, keine Schleifen - ISR-tauglich.
    pub fn tick(&mut self, present: bool) {
        match (self.state, present) {
            (PresenceState::Absent, false) => {}
            (PresenceState::Absent, true) | (PresenceState::Grace, true) => {
                self.state = PresenceState::Present;
                self.grace = 0;
                self.advance();
            }
            (PresenceState::Present, true) => {
                self.grace = 0;
                self.advance();
            }
            // Present wird nur über advance() betreten, die Sitzung läuft also
            (PresenceState::Present, false) => {
                self.state = PresenceState::Grace;
                self.grace = 1;
                self.expire_grace();
            }
            (PresenceState::Grace, false) => {
                self.grace += 1;
                self.expire_grace();
            }
        }
    }

    fn advance(&mut self) {
        self.sub_ticks += 1;
        if self.sub_ticks < self.config.ticks_per_second {
            return;
        }
        self.sub_ticks = 0;
        self.seconds += 1;
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes < 60 {
            return;
        }
        self.minutes = 0;
        self.hours = self.hours.saturating_add(1);
    }

    fn expire_grace(&mut self) {
        if self.grace >= self.config.grace_ticks {
            self.reset();
        }
    }

    /// Sitzung beenden, alle Zähler auf 0
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    pub fn snapshot(&self, present: bool) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            present,
            sub_ticks: self.sub_ticks,
            seconds: self.seconds,
            minutes: self.minutes,
            hours: self.hours,
            grace_ticks: self.grace,
        }
    }
}

impl Default for PresenceTimer {
    fn default() -> Self {
        Self::new(PresenceConfig::DEFAULT)
    }
}

#[derive(Clone, Copy)]
struct Shared {
    timer: PresenceTimer,
    present: bool,
}

/// Zwischen Timer-ISR und Vordergrund geteilter Sitzungszustand
///
/// Alle Zugriffe laufen in einer Critical Section, der Vordergrund sieht
/// also nie einen halb aktualisierten Zählerstand.
///
/// ```
/// # use nanny_core::{PresenceConfig, SharedPresence};
/// static SESSION: SharedPresence = SharedPresence::new(PresenceConfig::DEFAULT);
///
/// SESSION.set_present(true); // Vordergrund
/// SESSION.tick();            // Timer-ISR
/// assert!(SESSION.snapshot().is_session_active());
/// ```
pub struct SharedPresence {
    inner: Mutex<Cell<Shared>>,
}

impl SharedPresence {
    pub const fn new(config: PresenceConfig) -> Self {
        Self {
            inner: Mutex::new(Cell::new(Shared {
                timer: PresenceTimer::new(config),
                present: false,
            })),
        }
    }

    /// Aus dem Timer-Interrupt aufrufen
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut shared = cell.get();
            shared.timer.tick(shared.present);
            cell.set(shared);
        });
    }

    /// Letzte Klassifikation des Vordergrunds ablegen
    pub fn set_present(&self, present: bool) {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut shared = cell.get();
            shared.present = present;
            cell.set(shared);
        });
    }

    pub fn is_present(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow(cs).get().present)
    }

    /// Konsistente Kopie aller Zähler
    pub fn snapshot(&self) -> SessionSnapshot {
        critical_section::with(|cs| {
            let shared = self.inner.borrow(cs).get();
            shared.timer.snapshot(shared.present)
        })
    }
}
