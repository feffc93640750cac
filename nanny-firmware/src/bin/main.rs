// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::PeriodicTimer;
use esp_hal::timer::timg::TimerGroup;

use defmt::{info, warn};
use embedded_hal_bus::i2c::RefCellDevice;
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;
use static_cell::StaticCell;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use computer_nanny::config::{
    DISTANCE_MODE, I2C_FREQUENCY_KHZ, I2C_SCL_PIN, I2C_SDA_PIN, INTER_MEASUREMENT_MS, LED_COUNT,
    LED_GPIO_PIN, MAX_DATA_READY_POLLS, MONITOR_CONFIG, OLED_ADDRESS, SENSOR_BOOT_ATTEMPTS,
    SWITCH_GPIO_PIN, TIMING_BUDGET_MS,
};
use computer_nanny::hal::{OledDisplay, RmtPulseSink, init_rmt};
use computer_nanny::tasks::{monitor_task, start_presence_tick};
use computer_nanny::{HalI2cTransport, I2cBus, Monitor, RangingSensor, SensorTransport};
use nanny_core::sensor::SENSOR_ID;
use nanny_core::{BitTiming, ChannelOrder, Strip};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Wartet bis die Sensor-Firmware gebootet hat und lädt die Konfiguration
///
/// Danach: Short-Modus, 500 ms Budget und 500 ms Messintervall.
async fn bring_up_sensor(sensor: &mut RangingSensor<SensorTransport>) {
    let mut booted = false;
    for _ in 0..SENSOR_BOOT_ATTEMPTS {
        if let Ok(true) = sensor.boot_state() {
            booted = true;
            break;
        }
        Timer::after(Duration::from_millis(2)).await;
    }
    if !booted {
        warn!("VL53L1X did not report boot, continuing anyway");
    }

    match sensor.sensor_id() {
        Ok(id) if id == SENSOR_ID => info!("VL53L1X found (id {=u16:#x})", id),
        Ok(id) => warn!("Unexpected sensor id {=u16:#x}", id),
        Err(e) => warn!("Sensor id read failed: {}", e),
    }

    if let Err(e) = sensor.sensor_init(MAX_DATA_READY_POLLS) {
        warn!("Sensor init failed: {}", e);
    }
    if let Err(e) = sensor.set_distance_mode(DISTANCE_MODE) {
        warn!("Setting distance mode failed: {}", e);
    }
    if let Err(e) = sensor.set_timing_budget_ms(TIMING_BUDGET_MS) {
        warn!("Setting timing budget failed: {}", e);
    }
    if let Err(e) = sensor.set_inter_measurement_ms(INTER_MEASUREMENT_MS) {
        warn!("Setting inter-measurement period failed: {}", e);
    }
}

/// Main Entry Point
///
/// Initialisiert Hardware, startet den Presence-Timer und spawnt die
/// Hauptschleife. Danach schläft main() - alle Arbeit läuft im Task.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    info!(
        "Computer Nanny: strip GPIO{} ({} LEDs), I2C SDA GPIO{} / SCL GPIO{}, switch GPIO{}",
        LED_GPIO_PIN, LED_COUNT, I2C_SDA_PIN, I2C_SCL_PIN, SWITCH_GPIO_PIN
    );

    // Strip: RMT Kanal 0 auf GPIO8 (LED_GPIO_PIN), beim Start ausschalten
    let rmt = init_rmt(peripherals.RMT).expect("Failed to initialize RMT");
    let mut sink =
        RmtPulseSink::new(rmt.channel0, peripherals.GPIO8).expect("Failed to configure RMT TX");
    if let Err(e) = sink.write(core::iter::repeat_n(RGB8::default(), LED_COUNT)) {
        warn!("Blanking strip failed: {}", e);
    }

    // I2C Bus für Sensor + OLED: SDA GPIO6 (I2C_SDA_PIN), SCL GPIO7 (I2C_SCL_PIN)
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("Failed to create I2c")
    .with_sda(peripherals.GPIO6)
    .with_scl(peripherals.GPIO7);

    static I2C_BUS: StaticCell<RefCell<I2cBus>> = StaticCell::new();
    let i2c_bus = I2C_BUS.init(RefCell::new(i2c));

    let mut sensor = RangingSensor::new(HalI2cTransport::new(RefCellDevice::new(i2c_bus)));
    bring_up_sensor(&mut sensor).await;

    let display = OledDisplay::new(RefCellDevice::new(i2c_bus)).expect("Failed to init OLED");
    info!("OLED ready at {=u8:#x}", OLED_ADDRESS);

    // Taster: GPIO9 (SWITCH_GPIO_PIN), active-low mit internem Pull-up
    let switch = Input::new(peripherals.GPIO9, InputConfig::default().with_pull(Pull::Up));

    // Presence-Tick: TIMG1 alle 100 ms
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    start_presence_tick(PeriodicTimer::new(timg1.timer0)).expect("Failed to start tick timer");

    let monitor = Monitor::new(
        MONITOR_CONFIG,
        Strip::new(ChannelOrder::Grb, BitTiming::WS2812B),
    );

    spawner
        .spawn(monitor_task(monitor, sensor, switch, sink, display))
        .expect("Failed to spawn monitor task");

    // Main-Loop: schläft (alle Arbeit läuft im Task)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
