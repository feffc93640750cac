// Presence Tick - periodischer Timer-Interrupt (TIMG1, 100 ms)
//
// Der Handler macht nur eins: einen Tick des Presence-Automaten. Das
// Presence-Flag setzt die Hauptschleife, der Handler liest es nur.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::Blocking;
use esp_hal::handler;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use nanny_core::SharedPresence;

use crate::config::{PRESENCE_CONFIG, TICK_PERIOD_MS};

/// Sitzungszustand, geteilt zwischen Timer-Interrupt und Hauptschleife
pub static SESSION: SharedPresence = SharedPresence::new(PRESENCE_CONFIG);

/// Timer-Instanz, damit der Handler das Interrupt-Flag löschen kann
static TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

#[handler]
fn presence_tick_handler() {
    critical_section::with(|cs| {
        if let Some(timer) = TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    SESSION.tick();
}

/// Timer konfigurieren und starten
///
/// # Parameter
/// - `timer`: freier Hardware-Timer (z.B. `TimerGroup::new(TIMG1).timer0`)
pub fn start_presence_tick(
    mut timer: PeriodicTimer<'static, Blocking>,
) -> Result<(), esp_hal::timer::Error> {
    timer.set_interrupt_handler(presence_tick_handler);
    timer.start(Duration::from_millis(TICK_PERIOD_MS))?;
    timer.listen();
    critical_section::with(|cs| TIMER.borrow_ref_mut(cs).replace(timer));
    Ok(())
}
