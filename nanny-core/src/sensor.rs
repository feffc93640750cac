//! Distance Poller für den VL53L1X Time-of-Flight Sensor
//!
//! Baut auf dem Register-Layer auf. Der Ranging-Algorithmus selbst läuft im
//! Sensor; hier werden nur Start/Stop, Data-Ready und die Ergebnisregister
//! bedient.

use core::fmt;

use crate::register::{RegisterBus, RegisterError};
use crate::traits::BusTransport;
use crate::types::RangeReading;

/// Register-Indizes des VL53L1X
pub mod reg {
    pub const VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND: u16 = 0x0008;
    pub const GPIO_HV_MUX_CTRL: u16 = 0x0030;
    pub const GPIO_TIO_HV_STATUS: u16 = 0x0031;
    pub const PHASECAL_CONFIG_TIMEOUT_MACROP: u16 = 0x004B;
    pub const RANGE_CONFIG_TIMEOUT_MACROP_A_HI: u16 = 0x005E;
    pub const RANGE_CONFIG_VCSEL_PERIOD_A: u16 = 0x0060;
    pub const RANGE_CONFIG_TIMEOUT_MACROP_B_HI: u16 = 0x0061;
    pub const RANGE_CONFIG_VCSEL_PERIOD_B: u16 = 0x0063;
    pub const RANGE_CONFIG_VALID_PHASE_HIGH: u16 = 0x0069;
    pub const INTERMEASUREMENT_PERIOD: u16 = 0x006C;
    pub const SD_CONFIG_WOI_SD0: u16 = 0x0078;
    pub const SD_CONFIG_INITIAL_PHASE_SD0: u16 = 0x007A;
    pub const SYSTEM_INTERRUPT_CLEAR: u16 = 0x0086;
    pub const SYSTEM_MODE_START: u16 = 0x0087;
    pub const RESULT_RANGE_STATUS: u16 = 0x0089;
    pub const RESULT_DISTANCE: u16 = 0x0096;
    pub const RESULT_OSC_CALIBRATE_VAL: u16 = 0x00DE;
    pub const FIRMWARE_SYSTEM_STATUS: u16 = 0x00E5;
    pub const IDENTIFICATION_MODEL_ID: u16 = 0x010F;
    /// Erstes Register des Default-Konfigurationsblocks
    pub const DEFAULT_CONFIG_START: u16 = 0x002D;
}

/// Erwartete Model-ID (`IDENTIFICATION__MODEL_ID`)
pub const SENSOR_ID: u16 = 0xEACC;

const MODE_START_RANGING: u8 = 0x40;
const MODE_STOP_RANGING: u8 = 0x00;

/// Default-Konfiguration des Herstellers für 0x002D..=0x0087
const DEFAULT_CONFIGURATION: [u8; 91] = [
    0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0x02, 0x08, // 0x2D
    0x00, 0x08, 0x10, 0x01, 0x01, 0x00, 0x00, 0x00, // 0x35
    0x00, 0xFF, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, // 0x3D
    0x00, 0x20, 0x0B, 0x00, 0x00, 0x02, 0x0A, 0x21, // 0x45
    0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0xC8, // 0x4D
    0x00, 0x00, 0x38, 0xFF, 0x01, 0x00, 0x08, 0x00, // 0x55
    0x00, 0x01, 0xCC, 0x0F, 0x01, 0xF1, 0x0D, 0x01, // 0x5D
    0x68, 0x00, 0x80, 0x08, 0xB8, 0x00, 0x00, 0x00, // 0x65
    0x00, 0x0F, 0x89, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x6D
    0x00, 0x00, 0x01, 0x0F, 0x0D, 0x0E, 0x0E, 0x00, // 0x75
    0x00, 0x02, 0xC7, 0xFF, 0x9B, 0x00, 0x00, 0x00, // 0x7D
    0x01, 0x00, 0x00, // 0x85
];

/// Rohstatus (5 Bit) → dokumentierter Range-Status, 255 = unbekannt
const RANGE_STATUS_TABLE: [u8; 24] = [
    255, 255, 255, 5, 2, 4, 1, 7, 3, 0, 255, 255, 9, 13, 255, 255, 255, 255, 10, 6, 255, 255, 11,
    12,
];

/// Macro-Period Timeouts (Budget ms, A, B) im Short-Modus
const SHORT_TIMEOUTS: [(u16, u16, u16); 7] = [
    (15, 0x001D, 0x0027),
    (20, 0x0051, 0x006E),
    (33, 0x00D6, 0x006E),
    (50, 0x01AE, 0x01E8),
    (100, 0x02E1, 0x0388),
    (200, 0x03E1, 0x0496),
    (500, 0x0591, 0x05C1),
];

/// Wie [`SHORT_TIMEOUTS`] für den Long-Modus (kein 15 ms Budget)
const LONG_TIMEOUTS: [(u16, u16, u16); 6] = [
    (20, 0x001E, 0x0022),
    (33, 0x0060, 0x006E),
    (50, 0x00AD, 0x00C6),
    (100, 0x01CC, 0x01EA),
    (200, 0x02D9, 0x02F8),
    (500, 0x048F, 0x04A4),
];

/// Messbereich des Sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DistanceMode {
    /// Bis etwa 1,3 m, unempfindlicher gegen Umgebungslicht
    Short,
    /// Bis etwa 4 m
    Long,
}

impl DistanceMode {
    /// Kennwert in `PHASECAL_CONFIG__TIMEOUT_MACROP`
    const fn phasecal_timeout(self) -> u8 {
        match self {
            DistanceMode::Short => 0x14,
            DistanceMode::Long => 0x0A,
        }
    }

    fn from_phasecal_timeout(raw: u8) -> Option<Self> {
        match raw {
            0x14 => Some(DistanceMode::Short),
            0x0A => Some(DistanceMode::Long),
            _ => None,
        }
    }

    fn timeouts(self) -> &'static [(u16, u16, u16)] {
        match self {
            DistanceMode::Short => &SHORT_TIMEOUTS,
            DistanceMode::Long => &LONG_TIMEOUTS,
        }
    }
}

/// Fehler beim Konfigurieren von Messbereich oder Timing-Budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    Bus(RegisterError),
    /// Budget gibt es im aktuellen Messbereich nicht
    UnsupportedTimingBudget(u16),
    /// `PHASECAL_CONFIG__TIMEOUT_MACROP` passt zu keinem Messbereich
    UnknownDistanceMode,
}

impl From<RegisterError> for ConfigError {
    fn from(e: RegisterError) -> Self {
        ConfigError::Bus(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Bus(e) => write!(f, "bus error: {}", e),
            ConfigError::UnsupportedTimingBudget(ms) => {
                write!(f, "unsupported timing budget {} ms", ms)
            }
            ConfigError::UnknownDistanceMode => write!(f, "unknown distance mode"),
        }
    }
}

/// Fehler beim Abfragen einer Messung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError {
    /// Bus-Fehler in einer Register-Operation (nicht wiederholt)
    Bus(RegisterError),
    /// Data-Ready kam nicht innerhalb von `max_polls` Abfragen
    Timeout,
}

impl From<RegisterError> for PollError {
    fn from(e: RegisterError) -> Self {
        PollError::Bus(e)
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Bus(e) => write!(f, "bus error: {}", e),
            PollError::Timeout => write!(f, "data ready timeout"),
        }
    }
}

/// VL53L1X Treiber über einen beliebigen [`BusTransport`]
pub struct RangingSensor<T> {
    regs: RegisterBus<T>,
}

impl<T: BusTransport> RangingSensor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            regs: RegisterBus::new(transport),
        }
    }

    /// Direkter Zugriff auf den Register-Layer
    pub fn registers(&mut self) -> &mut RegisterBus<T> {
        &mut self.regs
    }

    pub fn release(self) -> T {
        self.regs.release()
    }

    /// `true` sobald die Sensor-Firmware gebootet hat
    pub fn boot_state(&mut self) -> Result<bool, RegisterError> {
        Ok(self.regs.read_byte(reg::FIRMWARE_SYSTEM_STATUS)? != 0)
    }

    pub fn sensor_id(&mut self) -> Result<u16, RegisterError> {
        self.regs.read_word(reg::IDENTIFICATION_MODEL_ID)
    }

    /// Schreibt die Default-Konfiguration und verwirft eine erste Messung
    pub fn sensor_init(&mut self, max_polls: u32) -> Result<(), PollError> {
        self.regs
            .write_multi(reg::DEFAULT_CONFIG_START, &DEFAULT_CONFIGURATION)?;
        self.start_ranging()?;
        self.wait_data_ready(max_polls)?;
        self.clear_interrupt()?;
        self.stop_ranging()?;
        self.regs
            .write_byte(reg::VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND, 0x09)?;
        self.regs.write_byte(0x000B, 0x00)?;
        Ok(())
    }

    pub fn start_ranging(&mut self) -> Result<(), RegisterError> {
        self.regs
            .write_byte(reg::SYSTEM_MODE_START, MODE_START_RANGING)
    }

    pub fn stop_ranging(&mut self) -> Result<(), RegisterError> {
        self.regs.write_byte(reg::SYSTEM_MODE_START, MODE_STOP_RANGING)
    }

    pub fn clear_interrupt(&mut self) -> Result<(), RegisterError> {
        self.regs.write_byte(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)
    }

    /// Pegel, den der Interrupt-Pin bei neuer Messung annimmt
    pub fn interrupt_polarity(&mut self) -> Result<bool, RegisterError> {
        let mux = self.regs.read_byte(reg::GPIO_HV_MUX_CTRL)?;
        Ok(mux & 0x10 == 0)
    }

    pub fn check_for_data_ready(&mut self) -> Result<bool, RegisterError> {
        let polarity = self.interrupt_polarity()?;
        let status = self.regs.read_byte(reg::GPIO_TIO_HV_STATUS)?;
        Ok((status & 0x01 == 1) == polarity)
    }

    /// Distanz der letzten Messung in mm
    pub fn distance(&mut self) -> Result<u16, RegisterError> {
        self.regs.read_word(reg::RESULT_DISTANCE)
    }

    /// Dekodierter Range-Status der letzten Messung, 0 = gültig
    pub fn range_status(&mut self) -> Result<u8, RegisterError> {
        let raw = self.regs.read_byte(reg::RESULT_RANGE_STATUS)? & 0x1F;
        Ok(RANGE_STATUS_TABLE
            .get(raw as usize)
            .copied()
            .unwrap_or(255))
    }

    /// Messintervall im Dauerbetrieb setzen
    pub fn set_inter_measurement_ms(&mut self, period_ms: u32) -> Result<(), RegisterError> {
        let clock_pll = self.regs.read_word(reg::RESULT_OSC_CALIBRATE_VAL)? & 0x03FF;
        let period = clock_pll as u64 * period_ms as u64 * 1075 / 1000;
        self.regs
            .write_dword(reg::INTERMEASUREMENT_PERIOD, period.min(u32::MAX as u64) as u32)
    }

    /// Aktueller Messbereich, `None` wenn der Sensor keinen bekannten meldet
    pub fn distance_mode(&mut self) -> Result<Option<DistanceMode>, RegisterError> {
        let raw = self.regs.read_byte(reg::PHASECAL_CONFIG_TIMEOUT_MACROP)?;
        Ok(DistanceMode::from_phasecal_timeout(raw))
    }

    /// Messbereich umschalten
    ///
    /// Die Timeouts hängen vom Messbereich ab. Ein bekanntes Timing-Budget
    /// wird deshalb gelesen und nach dem Umschalten neu geschrieben.
    pub fn set_distance_mode(&mut self, mode: DistanceMode) -> Result<(), ConfigError> {
        let budget = self.timing_budget_ms()?;
        let (period_a, period_b, phase_high, woi, initial_phase) = match mode {
            DistanceMode::Short => (0x07, 0x05, 0x38, 0x0705, 0x0606),
            DistanceMode::Long => (0x0F, 0x0D, 0xB8, 0x0F0D, 0x0E0E),
        };
        self.regs
            .write_byte(reg::PHASECAL_CONFIG_TIMEOUT_MACROP, mode.phasecal_timeout())?;
        self.regs.write_byte(reg::RANGE_CONFIG_VCSEL_PERIOD_A, period_a)?;
        self.regs.write_byte(reg::RANGE_CONFIG_VCSEL_PERIOD_B, period_b)?;
        self.regs
            .write_byte(reg::RANGE_CONFIG_VALID_PHASE_HIGH, phase_high)?;
        self.regs.write_word(reg::SD_CONFIG_WOI_SD0, woi)?;
        self.regs
            .write_word(reg::SD_CONFIG_INITIAL_PHASE_SD0, initial_phase)?;
        if let Some(ms) = budget {
            self.set_timing_budget_ms(ms)?;
        }
        Ok(())
    }

    /// Aktuelles Timing-Budget in ms, `None` bei unbekanntem Timeout
    pub fn timing_budget_ms(&mut self) -> Result<Option<u16>, RegisterError> {
        let timeout_a = self.regs.read_word(reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI)?;
        Ok(SHORT_TIMEOUTS
            .iter()
            .chain(LONG_TIMEOUTS.iter())
            .find(|(_, a, _)| *a == timeout_a)
            .map(|(ms, _, _)| *ms))
    }

    /// Timing-Budget für den aktuellen Messbereich setzen
    ///
    /// Erlaubt sind 15 (nur Short), 20, 33, 50, 100, 200 und 500 ms.
    /// Bei einem anderen Wert wird nichts geschrieben.
    pub fn set_timing_budget_ms(&mut self, budget_ms: u16) -> Result<(), ConfigError> {
        let mode = self
            .distance_mode()?
            .ok_or(ConfigError::UnknownDistanceMode)?;
        let (_, timeout_a, timeout_b) = mode
            .timeouts()
            .iter()
            .copied()
            .find(|(ms, _, _)| *ms == budget_ms)
            .ok_or(ConfigError::UnsupportedTimingBudget(budget_ms))?;
        self.regs
            .write_word(reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI, timeout_a)?;
        self.regs
            .write_word(reg::RANGE_CONFIG_TIMEOUT_MACROP_B_HI, timeout_b)
            .map_err(ConfigError::from)
    }

    fn wait_data_ready(&mut self, max_polls: u32) -> Result<(), PollError> {
        for _ in 0..max_polls {
            if self.check_for_data_ready()? {
                return Ok(());
            }
        }
        Err(PollError::Timeout)
    }

    /// Eine komplette Messung
    ///
    /// Reihenfolge: Start, Data-Ready abfragen, Distanz, Status,
    /// Interrupt löschen, Stop. Kein Retry - bei Timeout bleibt das
    /// Ranging aktiv und der nächste Aufruf startet es erneut.
    pub fn poll(&mut self, max_polls: u32) -> Result<RangeReading, PollError> {
        self.start_ranging()?;
        self.wait_data_ready(max_polls)?;
        let distance_mm = self.distance()?;
        let status = self.range_status()?;
        self.clear_interrupt()?;
        self.stop_ranging()?;
        Ok(RangeReading {
            distance_mm,
            status,
        })
    }
}
