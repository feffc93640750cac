// Monitor Task - Hauptschleife im Vordergrund
use defmt::{info, warn};
use embassy_time::{Duration, Ticker};
use esp_hal::gpio::Input;
use nanny_core::{
    BusTransport, Monitor, PollError, PulseSink, RangingSensor, StatusDisplay, StepReport,
};

use crate::config::{FOREGROUND_PERIOD_MS, LED_COUNT};
use crate::hal::{RmtError, RmtPulseSink};
use crate::tasks::presence_tick::SESSION;
use crate::{SensorTransport, StatusOled};

/// Schnittstelle zum Strip-Ausgang, damit die Logik ohne RMT auskommt
pub trait FrameOutput: PulseSink {
    /// Fehler des letzten Frames (nur fürs Logging)
    fn frame_error(&mut self) -> Option<RmtError>;
}

impl FrameOutput for RmtPulseSink<'_> {
    fn frame_error(&mut self) -> Option<RmtError> {
        self.take_error()
    }
}

/// Ergebnis einer Iteration loggen
fn log_report(report: &StepReport) {
    if let Some(color) = report.color_changed {
        info!("Color switched: {}", color);
    }
    match report.poll {
        Ok(_) => {}
        Err(PollError::Timeout) => warn!("Sensor: data ready timeout"),
        Err(PollError::Bus(e)) => warn!("Sensor: bus error {}", e),
    }
    if report.display.is_err() {
        warn!("Display write failed");
    }
}

/// Monitor Logic - eine Iteration pro Ticker-Wake-up
///
/// # Parameter
/// - `monitor`: Zustand des Vordergrunds (Strip, Farbe, Taster)
/// - `sensor`: VL53L1X über beliebigen Bus
/// - `switch_low`: liefert den aktuellen Taster-Pegel (true = gedrückt)
/// - `sink`: Strip-Ausgang
/// - `display`: Status-Anzeige
pub async fn monitor_logic<T, F, P, D>(
    mut monitor: Monitor<LED_COUNT>,
    mut sensor: RangingSensor<T>,
    mut switch_low: F,
    mut sink: P,
    mut display: D,
) -> !
where
    T: BusTransport,
    F: FnMut() -> bool,
    P: FrameOutput,
    D: StatusDisplay,
{
    let mut ticker = Ticker::every(Duration::from_millis(FOREGROUND_PERIOD_MS));
    let mut was_active = false;

    loop {
        let report = monitor.step(&mut sensor, &SESSION, switch_low(), &mut sink, &mut display);
        log_report(&report);
        if let Some(e) = sink.frame_error() {
            warn!("Strip frame failed: {}", e);
        }

        let active = report.snapshot.is_session_active();
        if active != was_active {
            info!("Session {}: {}", if active { "started" } else { "ended" }, report.snapshot);
            was_active = active;
        }

        ticker.next().await;
    }
}

/// Monitor Task - Embassy Task für die Hauptschleife
///
/// Hardware wird in `main()` initialisiert und hier nur übergeben.
#[embassy_executor::task]
pub async fn monitor_task(
    monitor: Monitor<LED_COUNT>,
    sensor: RangingSensor<SensorTransport>,
    switch: Input<'static>,
    sink: RmtPulseSink<'static>,
    display: StatusOled,
) {
    monitor_logic(monitor, sensor, || switch.is_low(), sink, display).await
}
