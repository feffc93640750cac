// Task-Modul: Hauptschleife und Timer-Interrupt
//
// Die Hauptschleife läuft als Embassy Task, der Presence-Tick als
// Hardware-Interrupt. Geteilt wird nur `SESSION` (Critical Section).

pub mod monitor;
pub mod presence_tick;

// Re-export für einfachen Import
pub use monitor::{FrameOutput, monitor_logic, monitor_task};
pub use presence_tick::{SESSION, start_presence_tick};
