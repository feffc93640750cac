// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen

use nanny_core::{DistanceMode, MonitorConfig, NamedColor, PresenceConfig};

// ============================================================================
// LED Strip Konfiguration
// ============================================================================

// Die Pin-Nummern dienen nur dem Log. esp-hal vergibt Pins als eigene
// Typen (`peripherals.GPIOx`), die Zuordnung steht in main.rs und muss
// bei Änderungen an beiden Stellen angepasst werden.

/// GPIO-Pin für die Datenleitung des WS2812 Strips (`peripherals.GPIO8`)
pub const LED_GPIO_PIN: u8 = 8;

/// Anzahl der LEDs im Strip
pub const LED_COUNT: usize = 12;

/// RMT Taktfrequenz in MHz
/// 80 MHz → 12,5 ns pro Tick, genau genug für das WS2812 Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

/// RMT Buffer: 24 Pulse pro LED + Reset/End-Marker
pub const RMT_BUFFER_SIZE: usize = LED_COUNT * 24 + 1;

/// Farbe nach dem Einschalten
pub const DEFAULT_COLOR: NamedColor = NamedColor::White;

// ============================================================================
// Timing
// ============================================================================

/// Periode des Presence-Timers (TIMG1)
pub const TICK_PERIOD_MS: u64 = 100;

/// Ticks pro Sekunde Sitzungszeit
pub const TICKS_PER_SECOND: u8 = (1000 / TICK_PERIOD_MS) as u8;

/// Abwesende Ticks bis die Sitzung endet (1 s)
pub const GRACE_TICKS: u8 = 10;

/// Wake-up Intervall der Hauptschleife
pub const FOREGROUND_PERIOD_MS: u64 = 250;

// ============================================================================
// Sensor Konfiguration (VL53L1X)
// ============================================================================

/// GPIO-Pins des I2C Busses (`peripherals.GPIO6` / `peripherals.GPIO7`)
pub const I2C_SDA_PIN: u8 = 6;
pub const I2C_SCL_PIN: u8 = 7;

/// Bus-Takt in kHz
pub const I2C_FREQUENCY_KHZ: u32 = 100;

/// Unterhalb dieser Distanz gilt jemand als anwesend
pub const PRESENCE_THRESHOLD_MM: u16 = 500;

/// Obergrenze für Data-Ready Abfragen pro Messung
pub const MAX_DATA_READY_POLLS: u32 = 2000;

/// Messbereich: Short reicht für den Abstand zum Bildschirm
pub const DISTANCE_MODE: DistanceMode = DistanceMode::Short;

/// Timing-Budget einer Messung
pub const TIMING_BUDGET_MS: u16 = 500;

/// Messintervall des Sensors (nicht kleiner als das Timing-Budget)
pub const INTER_MEASUREMENT_MS: u32 = 500;

/// Wie oft beim Start auf den Sensor-Boot gewartet wird (je 2 ms)
pub const SENSOR_BOOT_ATTEMPTS: u32 = 100;

// ============================================================================
// Taster & Display
// ============================================================================

/// Taster zum Weiterschalten der Farbe (active-low, interner Pull-up,
/// `peripherals.GPIO9`)
pub const SWITCH_GPIO_PIN: u8 = 9;

/// Aufeinanderfolgende "gedrückt"-Abtastungen bis ein Druck zählt
pub const SWITCH_STABLE_SAMPLES: u8 = 1;

/// I2C-Adresse des SSD1306, nur für das Log
///
/// `I2CDisplayInterface::new` in hal/oled.rs verwendet fest 0x3C.
pub const OLED_ADDRESS: u8 = 0x3C;

/// Pausen-Erinnerung nach so vielen Minuten Sitzung, 0 = aus
pub const BREAK_AFTER_MINUTES: u16 = 30;

// ============================================================================
// Laufzeit-Konfiguration für nanny-core
// ============================================================================

pub const PRESENCE_CONFIG: PresenceConfig = PresenceConfig {
    ticks_per_second: TICKS_PER_SECOND,
    grace_ticks: GRACE_TICKS,
};

pub const MONITOR_CONFIG: MonitorConfig = MonitorConfig {
    presence_threshold_mm: PRESENCE_THRESHOLD_MM,
    max_data_ready_polls: MAX_DATA_READY_POLLS,
    break_after_minutes: BREAK_AFTER_MINUTES,
    switch_stable_samples: SWITCH_STABLE_SAMPLES,
    default_color: DEFAULT_COLOR,
};
