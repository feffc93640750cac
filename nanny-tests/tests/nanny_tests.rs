//! Integration Tests für Strip, Presence, Register-Protokoll und Monitor
//!
//! Diese Tests laufen auf dem Host (x86_64) und nutzen Mock-Implementierungen
//! aller Hardware-Traits.

use std::collections::HashMap;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use nanny_core::sensor::reg;
use nanny_core::strip::BITS_PER_LED;
use nanny_core::{
    Acknowledge, BitTiming, BusFault, BusTransport, ChannelOrder, ColorCursor, ConfigError,
    DEVICE_ADDRESS, Direction, DisplayError, DistanceMode, HalI2cTransport, Monitor,
    MonitorConfig, NamedColor, PollError, PresenceConfig, PresenceState, PresenceTimer, Pulse,
    PulseSink, RangingSensor, RegisterBus, SharedPresence, StatusDisplay, StopCondition, Strip,
};
use rgb::RGB8;

const LEDS: usize = 12;

// ============================================================================
// Mock Bus Transport
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCall {
    Start(u8, Direction),
    Write(u8, StopCondition),
    Read(Acknowledge, StopCondition),
}

/// Simulierter Sensor: Register-Map mit Auto-Increment
#[derive(Default)]
pub struct MockTransport {
    pub calls: Vec<BusCall>,
    pub registers: HashMap<u16, u8>,
    /// Register-Schreibzugriffe in Reihenfolge
    pub writes: Vec<(u16, u8)>,
    /// Register-Lesezugriffe in Reihenfolge (nur Start-Index)
    pub reads: Vec<u16>,
    /// Nummer (1-basiert) des Primitivs, das fehlschlagen soll
    pub fail_at: Option<usize>,
    /// Data-Ready wird erst nach so vielen Status-Abfragen gemeldet
    pub ready_after: Option<usize>,
    status_polls: usize,
    index: u16,
    index_bytes: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor mit einer fertigen Messung
    pub fn with_measurement(distance_mm: u16, raw_status: u8) -> Self {
        let mut mock = Self::new();
        mock.set_word(reg::RESULT_DISTANCE, distance_mm);
        mock.registers.insert(reg::RESULT_RANGE_STATUS, raw_status);
        mock.ready_after = Some(1);
        mock
    }

    pub fn set_word(&mut self, index: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.registers.insert(index, hi);
        self.registers.insert(index + 1, lo);
    }

    fn record(&mut self, call: BusCall) -> Result<(), BusFault> {
        self.calls.push(call);
        if self.fail_at == Some(self.calls.len()) {
            return Err(BusFault::Nack);
        }
        Ok(())
    }

    fn read_register(&mut self, index: u16) -> u8 {
        if index == reg::GPIO_TIO_HV_STATUS {
            self.status_polls += 1;
            return match self.ready_after {
                Some(n) if self.status_polls >= n => 0x01,
                _ => 0x00,
            };
        }
        self.registers.get(&index).copied().unwrap_or(0)
    }
}

impl BusTransport for MockTransport {
    fn start(&mut self, address: u8, direction: Direction) -> Result<(), BusFault> {
        self.record(BusCall::Start(address, direction))?;
        if direction == Direction::Write {
            self.index_bytes = 0;
        } else {
            self.reads.push(self.index);
        }
        Ok(())
    }

    fn write_byte(&mut self, value: u8, stop: StopCondition) -> Result<(), BusFault> {
        self.record(BusCall::Write(value, stop))?;
        match self.index_bytes {
            0 => self.index = (value as u16) << 8,
            1 => self.index |= value as u16,
            _ => {
                self.writes.push((self.index, value));
                self.registers.insert(self.index, value);
                self.index += 1;
            }
        }
        self.index_bytes += 1;
        Ok(())
    }

    fn read_byte(&mut self, ack: Acknowledge, stop: StopCondition) -> Result<u8, BusFault> {
        self.record(BusCall::Read(ack, stop))?;
        let value = self.read_register(self.index);
        self.index += 1;
        Ok(value)
    }
}

// ============================================================================
// Mock I2C Bus (embedded-hal)
// ============================================================================

/// Sensor hinter einem embedded-hal Bus
///
/// Jede Transaktion wird mit allen geschriebenen Bytes protokolliert.
/// Die ersten zwei Bytes eines Schreibzugriffs setzen den Register-Index.
#[derive(Default)]
pub struct MockI2c {
    pub registers: HashMap<u16, u8>,
    pub transactions: Vec<Vec<u8>>,
    /// Nächste Transaktion wird nicht quittiert (und nicht protokolliert)
    pub nack_next: bool,
    pointer: u16,
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != DEVICE_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if self.nack_next {
            self.nack_next = false;
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        let mut written = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    written.extend_from_slice(bytes);
                    if let [hi, lo, data @ ..] = *bytes {
                        self.pointer = u16::from_be_bytes([*hi, *lo]);
                        for value in data {
                            self.registers.insert(self.pointer, *value);
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buf) => {
                    for slot in buf.iter_mut() {
                        *slot = self.registers.get(&self.pointer).copied().unwrap_or(0);
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        self.transactions.push(written);
        Ok(())
    }
}

// ============================================================================
// Mock Pulse Sink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub pulses: Vec<Pulse>,
    pub latches: Vec<u32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulse zurück in Bits übersetzen
    pub fn bits(&self, timing: &BitTiming) -> Vec<bool> {
        self.pulses
            .iter()
            .map(|p| timing.classify(p.high_ns).expect("pulse out of tolerance"))
            .collect()
    }
}

impl PulseSink for RecordingSink {
    fn pulse(&mut self, pulse: Pulse) {
        self.pulses.push(pulse);
    }

    fn latch(&mut self, low_ns: u32) {
        self.latches.push(low_ns);
    }
}

// ============================================================================
// Mock Display
// ============================================================================

#[derive(Default)]
pub struct MockDisplay {
    pub lines: Vec<(u8, u8, String)>,
    pub render_count: usize,
    pub fail_next_render: bool,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Vec<&str> {
        self.lines.iter().map(|(_, _, t)| t.as_str()).collect()
    }
}

impl StatusDisplay for MockDisplay {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.lines.clear();
        Ok(())
    }

    fn draw_text(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError> {
        self.lines.push((x, y, text.to_string()));
        Ok(())
    }

    fn render(&mut self) -> Result<(), DisplayError> {
        if self.fail_next_render {
            self.fail_next_render = false;
            return Err(DisplayError::WriteFailed);
        }
        self.render_count += 1;
        Ok(())
    }
}

fn new_strip() -> Strip<LEDS> {
    Strip::new(ChannelOrder::Grb, BitTiming::WS2812B)
}

// ============================================================================
// Tests: Strip Driver
// ============================================================================

#[test]
fn test_set_touches_only_one_slot() {
    for i in 0..LEDS {
        let mut strip = new_strip();
        strip.set_all(1, 2, 3);
        strip.set(i, 10, 20, 30);
        for j in 0..LEDS {
            let expected = if i == j {
                RGB8::new(10, 20, 30)
            } else {
                RGB8::new(1, 2, 3)
            };
            assert_eq!(strip.get(j), expected, "set({i}) changed slot {j}");
        }
    }
}

#[test]
fn test_set_all_then_get() {
    let mut strip = new_strip();
    strip.set_all(125, 50, 0);
    for i in 0..LEDS {
        assert_eq!(strip.get(i), RGB8::new(125, 50, 0));
    }
}

#[test]
fn test_clear_and_clear_all() {
    let mut strip = new_strip();
    strip.set_all(9, 9, 9);
    strip.clear(4);
    assert_eq!(strip.get(4), RGB8::default());
    assert_eq!(strip.get(5), RGB8::new(9, 9, 9));
    strip.clear_all();
    assert!(strip.wire_bytes().all(|b| b == 0));
}

#[test]
fn test_flush_emits_one_pulse_per_bit() {
    let mut strip = new_strip();
    strip.set(0, 0xFF, 0x00, 0xA5);
    strip.set(11, 0x01, 0x80, 0x3C);
    let mut sink = RecordingSink::new();
    strip.flush(&mut sink);

    assert_eq!(sink.pulses.len(), BITS_PER_LED * LEDS);
    assert_eq!(sink.latches, vec![BitTiming::WS2812B.reset_ns]);

    // Erwartete Bits: Wire-Bytes, MSB zuerst
    let expected: Vec<bool> = strip
        .wire_bytes()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1 == 1))
        .collect();
    assert_eq!(sink.bits(&BitTiming::WS2812B), expected);
}

#[test]
fn test_flush_uses_grb_wire_order() {
    let mut strip: Strip<1> = Strip::new(ChannelOrder::Grb, BitTiming::WS2812B);
    strip.set(0, 0xFF, 0x00, 0x00);
    let mut sink = RecordingSink::new();
    strip.flush(&mut sink);
    let bits = sink.bits(&BitTiming::WS2812B);
    // Grün zuerst (0x00), dann Rot (0xFF), dann Blau (0x00)
    assert!(bits[0..8].iter().all(|b| !*b));
    assert!(bits[8..16].iter().all(|b| *b));
    assert!(bits[16..24].iter().all(|b| !*b));
}

#[test]
fn test_every_pulse_fills_one_slot() {
    let mut strip = new_strip();
    strip.set_all(0x5A, 0xC3, 0x0F);
    let mut sink = RecordingSink::new();
    strip.flush(&mut sink);
    let slot = BitTiming::WS2812B.slot_ns();
    assert!(
        sink.pulses
            .iter()
            .all(|p| p.high_ns as u32 + p.low_ns as u32 == slot)
    );
}

// ============================================================================
// Tests: Presence State Machine
// ============================================================================

fn feed(timer: &mut PresenceTimer, present: bool, ticks: usize) {
    for _ in 0..ticks {
        timer.tick(present);
    }
}

#[test]
fn test_grace_window_absorbs_short_gap() {
    let mut timer = PresenceTimer::default();
    feed(&mut timer, true, 10);
    feed(&mut timer, false, 9);
    assert_eq!(timer.state(), PresenceState::Grace);
    assert_eq!(timer.snapshot(false).seconds, 1);

    feed(&mut timer, true, 10);
    let s = timer.snapshot(true);
    assert_eq!(s.state, PresenceState::Present);
    assert_eq!(s.grace_ticks, 0);
    assert_eq!(s.seconds, 2);
}

#[test]
fn test_ten_absent_ticks_end_session() {
    let mut timer = PresenceTimer::default();
    feed(&mut timer, true, 125);
    feed(&mut timer, false, 10);
    let s = timer.snapshot(false);
    assert_eq!(s.state, PresenceState::Absent);
    assert_eq!((s.sub_ticks, s.seconds, s.minutes, s.grace_ticks), (0, 0, 0, 0));
}

#[test]
fn test_minute_carry_after_600_ticks() {
    let mut timer = PresenceTimer::default();
    feed(&mut timer, true, 600);
    let s = timer.snapshot(true);
    assert_eq!((s.minutes, s.seconds), (1, 0));
}

#[test]
fn test_new_session_starts_at_zero() {
    let mut timer = PresenceTimer::default();
    feed(&mut timer, true, 35);
    feed(&mut timer, false, 10);
    timer.tick(true);
    let s = timer.snapshot(true);
    assert_eq!(s.state, PresenceState::Present);
    assert_eq!((s.sub_ticks, s.seconds), (1, 0));
}

#[test]
fn test_custom_grace_window() {
    let config = PresenceConfig {
        ticks_per_second: 10,
        grace_ticks: 3,
    };
    let mut timer = PresenceTimer::new(config);
    feed(&mut timer, true, 20);
    feed(&mut timer, false, 2);
    assert_eq!(timer.state(), PresenceState::Grace);
    timer.tick(false);
    assert_eq!(timer.state(), PresenceState::Absent);
}

#[test]
fn test_shared_presence_between_isr_and_foreground() {
    let session = SharedPresence::new(PresenceConfig::DEFAULT);
    session.set_present(true);
    for _ in 0..600 {
        session.tick();
    }
    session.set_present(false);
    session.tick();
    let s = session.snapshot();
    assert!(!s.present);
    assert_eq!(s.state, PresenceState::Grace);
    assert_eq!((s.minutes, s.seconds), (1, 0));
}

// ============================================================================
// Tests: Register-Protokoll
// ============================================================================

#[test]
fn test_write_word_byte_sequence() {
    let mut bus = RegisterBus::new(MockTransport::new());
    bus.write_word(0x0041, 0x1234).unwrap();
    assert_eq!(
        bus.release().calls,
        vec![
            BusCall::Start(0x29, Direction::Write),
            BusCall::Write(0x00, StopCondition::Continue),
            BusCall::Write(0x41, StopCondition::Continue),
            BusCall::Write(0x12, StopCondition::Continue),
            BusCall::Write(0x34, StopCondition::Stop),
        ]
    );
}

#[test]
fn test_write_word_aborts_on_second_primitive() {
    let mut mock = MockTransport::new();
    mock.fail_at = Some(2);
    let mut bus = RegisterBus::new(mock);
    let err = bus.write_word(0x0041, 0x1234).unwrap_err();
    assert_eq!(err.code(), -2);
    assert_eq!(err.fault(), BusFault::Nack);
    assert_eq!(bus.release().calls.len(), 2);
}

#[test]
fn test_write_word_error_codes_per_step() {
    let expected = [-1, -2, -2, -3, -4];
    for (step, code) in expected.iter().enumerate() {
        let mut mock = MockTransport::new();
        mock.fail_at = Some(step + 1);
        let mut bus = RegisterBus::new(mock);
        assert_eq!(bus.write_word(0x0041, 0x1234).unwrap_err().code(), *code);
    }
}

#[test]
fn test_read_word_known_register() {
    let mut mock = MockTransport::new();
    mock.registers.insert(0x0096, 0x01);
    mock.registers.insert(0x0097, 0x2C);
    let mut bus = RegisterBus::new(mock);
    assert_eq!(bus.read_word(0x0096), Ok(300));
    assert_eq!(
        bus.release().calls,
        vec![
            BusCall::Start(0x29, Direction::Write),
            BusCall::Write(0x00, StopCondition::Continue),
            BusCall::Write(0x96, StopCondition::Stop),
            BusCall::Start(0x29, Direction::Read),
            BusCall::Read(Acknowledge::Ack, StopCondition::Continue),
            BusCall::Read(Acknowledge::Nack, StopCondition::Stop),
        ]
    );
}

#[test]
fn test_read_word_error_codes_per_step() {
    let expected = [-1, -2, -2, -3, -4, -5];
    for (step, code) in expected.iter().enumerate() {
        let mut mock = MockTransport::new();
        mock.fail_at = Some(step + 1);
        let mut bus = RegisterBus::new(mock);
        assert_eq!(bus.read_word(0x0096).unwrap_err().code(), *code);
        assert_eq!(bus.release().calls.len(), step + 1);
    }
}

#[test]
fn test_write_multi_payload() {
    let mut bus = RegisterBus::new(MockTransport::new());
    bus.write_multi(0x0100, &[1, 2, 3]).unwrap();
    let mock = bus.release();
    assert_eq!(mock.writes, vec![(0x0100, 1), (0x0101, 2), (0x0102, 3)]);
    assert_eq!(
        mock.calls.last(),
        Some(&BusCall::Write(3, StopCondition::Stop))
    );
}

#[test]
fn test_read_multi_acks_all_but_last() {
    let mut mock = MockTransport::new();
    for (i, v) in [7u8, 8, 9].iter().enumerate() {
        mock.registers.insert(0x0010 + i as u16, *v);
    }
    let mut bus = RegisterBus::new(mock);
    let mut buf = [0u8; 3];
    bus.read_multi(0x0010, &mut buf).unwrap();
    assert_eq!(buf, [7, 8, 9]);
    let reads: Vec<BusCall> = bus
        .release()
        .calls
        .into_iter()
        .filter(|c| matches!(c, BusCall::Read(..)))
        .collect();
    assert_eq!(
        reads,
        vec![
            BusCall::Read(Acknowledge::Ack, StopCondition::Continue),
            BusCall::Read(Acknowledge::Ack, StopCondition::Continue),
            BusCall::Read(Acknowledge::Nack, StopCondition::Stop),
        ]
    );
}

// ============================================================================
// Tests: I2C-Adapter (embedded-hal)
// ============================================================================

#[test]
fn test_i2c_overrun_leaves_nothing_on_the_bus() {
    let mut bus = RegisterBus::new(HalI2cTransport::new(MockI2c::default()));
    let err = bus.write_multi(0x002D, &[0xAA; 100]).unwrap_err();
    assert_eq!(err.code(), -3);
    assert_eq!(err.fault(), BusFault::Overrun);

    bus.write_byte(reg::SYSTEM_MODE_START, 0x40).unwrap();
    let i2c = bus.release().release();
    assert_eq!(i2c.transactions, vec![vec![0x00, 0x87, 0x40]]);
    assert_eq!(i2c.registers.get(&0x002D), None);
}

#[test]
fn test_i2c_default_block_is_one_transaction() {
    let block = [0x5Au8; 91];
    let mut bus = RegisterBus::new(HalI2cTransport::new(MockI2c::default()));
    bus.write_multi(reg::DEFAULT_CONFIG_START, &block).unwrap();
    let i2c = bus.release().release();
    assert_eq!(i2c.transactions.len(), 1);
    assert_eq!(i2c.transactions[0].len(), 93);
    assert_eq!(i2c.registers.get(&reg::SYSTEM_MODE_START), Some(&0x5A));
}

#[test]
fn test_i2c_read_word_resends_index_per_byte() {
    let mut i2c = MockI2c::default();
    i2c.registers.insert(0x010F, 0xEA);
    i2c.registers.insert(0x0110, 0xCC);
    let mut sensor = RangingSensor::new(HalI2cTransport::new(i2c));
    assert_eq!(sensor.sensor_id(), Ok(0xEACC));
    let i2c = sensor.release().release();
    assert_eq!(
        i2c.transactions,
        vec![vec![0x01, 0x0F], vec![0x01, 0x0F], vec![0x01, 0x10]]
    );
}

#[test]
fn test_i2c_nack_maps_to_register_error() {
    let mut i2c = MockI2c::default();
    i2c.registers.insert(reg::FIRMWARE_SYSTEM_STATUS, 0x01);
    i2c.nack_next = true;
    let mut sensor = RangingSensor::new(HalI2cTransport::new(i2c));
    let err = sensor.start_ranging().unwrap_err();
    assert_eq!(err.code(), -3);
    assert_eq!(err.fault(), BusFault::Nack);
    assert_eq!(err.index(), reg::SYSTEM_MODE_START);

    // Nächster Zugriff setzt den Index neu
    assert_eq!(sensor.boot_state(), Ok(true));
    let i2c = sensor.release().release();
    assert_eq!(i2c.transactions, vec![vec![0x00, 0xE5], vec![0x00, 0xE5]]);
}

// ============================================================================
// Tests: Distance Poller
// ============================================================================

#[test]
fn test_poll_sequence() {
    let mut sensor = RangingSensor::new(MockTransport::with_measurement(420, 9));
    let reading = sensor.poll(10).unwrap();
    assert_eq!(reading.distance_mm, 420);
    assert_eq!(reading.status, 0);
    assert!(reading.is_valid());

    let mock = sensor.release();
    assert_eq!(
        mock.writes,
        vec![
            (reg::SYSTEM_MODE_START, 0x40),
            (reg::SYSTEM_INTERRUPT_CLEAR, 0x01),
            (reg::SYSTEM_MODE_START, 0x00),
        ]
    );
    assert_eq!(
        mock.reads,
        vec![
            reg::GPIO_HV_MUX_CTRL,
            reg::GPIO_TIO_HV_STATUS,
            reg::RESULT_DISTANCE,
            reg::RESULT_RANGE_STATUS,
        ]
    );
}

#[test]
fn test_poll_waits_for_data_ready() {
    let mut mock = MockTransport::with_measurement(800, 9);
    mock.ready_after = Some(4);
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(sensor.poll(10).unwrap().distance_mm, 800);
    let mock = sensor.release();
    let polls = mock
        .reads
        .iter()
        .filter(|r| **r == reg::GPIO_TIO_HV_STATUS)
        .count();
    assert_eq!(polls, 4);
}

#[test]
fn test_poll_times_out() {
    let mut mock = MockTransport::with_measurement(100, 9);
    mock.ready_after = None;
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(sensor.poll(25), Err(PollError::Timeout));
    let mock = sensor.release();
    // Nur Start, kein Stop/Clear nach Timeout
    assert_eq!(mock.writes, vec![(reg::SYSTEM_MODE_START, 0x40)]);
    let polls = mock
        .reads
        .iter()
        .filter(|r| **r == reg::GPIO_TIO_HV_STATUS)
        .count();
    assert_eq!(polls, 25);
}

#[test]
fn test_poll_propagates_bus_error_without_retry() {
    let mut mock = MockTransport::with_measurement(100, 9);
    mock.fail_at = Some(1);
    let mut sensor = RangingSensor::new(mock);
    match sensor.poll(10) {
        Err(PollError::Bus(e)) => assert_eq!(e.code(), -1),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(sensor.release().calls.len(), 1);
}

#[test]
fn test_range_status_decoding() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::RESULT_RANGE_STATUS, 0xE4); // 0x04 nach Maske
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(sensor.range_status(), Ok(2));
}

#[test]
fn test_inverted_interrupt_polarity() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::GPIO_HV_MUX_CTRL, 0x11);
    mock.ready_after = None;
    let mut sensor = RangingSensor::new(mock);
    // Polarität low: Status-Bit 0 bedeutet "bereit"
    assert_eq!(sensor.interrupt_polarity(), Ok(false));
    assert_eq!(sensor.check_for_data_ready(), Ok(true));
}

#[test]
fn test_set_inter_measurement_period() {
    let mut mock = MockTransport::new();
    mock.set_word(reg::RESULT_OSC_CALIBRATE_VAL, 0xFC00 | 0x0200);
    let mut sensor = RangingSensor::new(mock);
    sensor.set_inter_measurement_ms(500).unwrap();
    let expected = (0x0200u32 * 500 * 1075 / 1000).to_be_bytes();
    let mock = sensor.release();
    assert_eq!(
        mock.writes,
        vec![
            (reg::INTERMEASUREMENT_PERIOD, expected[0]),
            (reg::INTERMEASUREMENT_PERIOD + 1, expected[1]),
            (reg::INTERMEASUREMENT_PERIOD + 2, expected[2]),
            (reg::INTERMEASUREMENT_PERIOD + 3, expected[3]),
        ]
    );
}

#[test]
fn test_set_timing_budget_short_500ms() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::PHASECAL_CONFIG_TIMEOUT_MACROP, 0x14);
    let mut sensor = RangingSensor::new(mock);
    sensor.set_timing_budget_ms(500).unwrap();
    assert_eq!(sensor.timing_budget_ms(), Ok(Some(500)));
    assert_eq!(
        sensor.release().writes,
        vec![
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI, 0x05),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI + 1, 0x91),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_B_HI, 0x05),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_B_HI + 1, 0xC1),
        ]
    );
}

#[test]
fn test_set_timing_budget_rejects_unsupported_value() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::PHASECAL_CONFIG_TIMEOUT_MACROP, 0x0A);
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(
        sensor.set_timing_budget_ms(42),
        Err(ConfigError::UnsupportedTimingBudget(42))
    );
    // 15 ms gibt es nur im Short-Modus
    assert_eq!(
        sensor.set_timing_budget_ms(15),
        Err(ConfigError::UnsupportedTimingBudget(15))
    );
    assert!(sensor.release().writes.is_empty());
}

#[test]
fn test_set_timing_budget_needs_known_mode() {
    let mut sensor = RangingSensor::new(MockTransport::new());
    assert_eq!(sensor.distance_mode(), Ok(None));
    assert_eq!(
        sensor.set_timing_budget_ms(500),
        Err(ConfigError::UnknownDistanceMode)
    );
}

#[test]
fn test_set_distance_mode_short_keeps_budget() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::PHASECAL_CONFIG_TIMEOUT_MACROP, 0x0A);
    mock.set_word(reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI, 0x01CC);
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(sensor.distance_mode(), Ok(Some(DistanceMode::Long)));
    assert_eq!(sensor.timing_budget_ms(), Ok(Some(100)));

    sensor.set_distance_mode(DistanceMode::Short).unwrap();
    assert_eq!(sensor.distance_mode(), Ok(Some(DistanceMode::Short)));
    assert_eq!(sensor.timing_budget_ms(), Ok(Some(100)));
    assert_eq!(
        sensor.release().writes,
        vec![
            (reg::PHASECAL_CONFIG_TIMEOUT_MACROP, 0x14),
            (reg::RANGE_CONFIG_VCSEL_PERIOD_A, 0x07),
            (reg::RANGE_CONFIG_VCSEL_PERIOD_B, 0x05),
            (reg::RANGE_CONFIG_VALID_PHASE_HIGH, 0x38),
            (reg::SD_CONFIG_WOI_SD0, 0x07),
            (reg::SD_CONFIG_WOI_SD0 + 1, 0x05),
            (reg::SD_CONFIG_INITIAL_PHASE_SD0, 0x06),
            (reg::SD_CONFIG_INITIAL_PHASE_SD0 + 1, 0x06),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI, 0x02),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_A_HI + 1, 0xE1),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_B_HI, 0x03),
            (reg::RANGE_CONFIG_TIMEOUT_MACROP_B_HI + 1, 0x88),
        ]
    );
}

#[test]
fn test_bring_up_after_init_short_500ms() {
    let mut mock = MockTransport::new();
    mock.ready_after = Some(1);
    mock.set_word(reg::RESULT_OSC_CALIBRATE_VAL, 0x0200);
    let mut sensor = RangingSensor::new(mock);
    sensor.sensor_init(10).unwrap();
    // Default-Konfiguration: Long-Modus mit 100 ms
    assert_eq!(sensor.distance_mode(), Ok(Some(DistanceMode::Long)));
    assert_eq!(sensor.timing_budget_ms(), Ok(Some(100)));

    sensor.set_distance_mode(DistanceMode::Short).unwrap();
    sensor.set_timing_budget_ms(500).unwrap();
    sensor.set_inter_measurement_ms(500).unwrap();
    assert_eq!(sensor.distance_mode(), Ok(Some(DistanceMode::Short)));
    assert_eq!(sensor.timing_budget_ms(), Ok(Some(500)));
    let period = (0x0200u32 * 500 * 1075 / 1000).to_be_bytes();
    let mock = sensor.release();
    assert_eq!(
        mock.registers.get(&reg::INTERMEASUREMENT_PERIOD).copied(),
        Some(period[0])
    );
    assert_eq!(
        mock.registers.get(&(reg::INTERMEASUREMENT_PERIOD + 3)).copied(),
        Some(period[3])
    );
}

#[test]
fn test_sensor_init_writes_default_block() {
    let mut mock = MockTransport::new();
    mock.ready_after = Some(1);
    let mut sensor = RangingSensor::new(mock);
    sensor.sensor_init(10).unwrap();
    let mock = sensor.release();
    assert_eq!(mock.writes[0].0, reg::DEFAULT_CONFIG_START);
    let block = &mock.writes[..91];
    assert!(block.iter().all(|(i, _)| *i <= reg::SYSTEM_MODE_START));
    assert_eq!(mock.writes.last(), Some(&(0x000B, 0x00)));
}

#[test]
fn test_boot_state_and_sensor_id() {
    let mut mock = MockTransport::new();
    mock.registers.insert(reg::FIRMWARE_SYSTEM_STATUS, 0x01);
    mock.set_word(reg::IDENTIFICATION_MODEL_ID, nanny_core::sensor::SENSOR_ID);
    let mut sensor = RangingSensor::new(mock);
    assert_eq!(sensor.boot_state(), Ok(true));
    assert_eq!(sensor.sensor_id(), Ok(0xEACC));
}

// ============================================================================
// Tests: Color Cursor
// ============================================================================

#[test]
fn test_color_cursor_wraps() {
    let last = NamedColor::ALL[NamedColor::ALL.len() - 1];
    let mut cursor = ColorCursor::new(last);
    assert_eq!(cursor.advance(), NamedColor::ALL[0]);
}

// ============================================================================
// Tests: Monitor (Vordergrund-Iteration)
// ============================================================================

struct Rig {
    monitor: Monitor<LEDS>,
    sensor: RangingSensor<MockTransport>,
    session: SharedPresence,
    sink: RecordingSink,
    display: MockDisplay,
}

impl Rig {
    fn new(distance_mm: u16) -> Self {
        Self::with_config(distance_mm, MonitorConfig::default())
    }

    fn with_config(distance_mm: u16, config: MonitorConfig) -> Self {
        Self {
            monitor: Monitor::new(config, new_strip()),
            sensor: RangingSensor::new(MockTransport::with_measurement(distance_mm, 9)),
            session: SharedPresence::new(PresenceConfig::DEFAULT),
            sink: RecordingSink::new(),
            display: MockDisplay::new(),
        }
    }

    fn step(&mut self, switch_low: bool) -> nanny_core::StepReport {
        self.sink = RecordingSink::new();
        self.monitor.step(
            &mut self.sensor,
            &self.session,
            switch_low,
            &mut self.sink,
            &mut self.display,
        )
    }

    fn set_distance(&mut self, distance_mm: u16) {
        let mock = self.sensor.registers().transport();
        mock.set_word(reg::RESULT_DISTANCE, distance_mm);
    }
}

#[test]
fn test_monitor_lights_strip_when_present() {
    let mut rig = Rig::new(300);
    let report = rig.step(false);
    assert_eq!(report.poll.map(|r| r.distance_mm), Ok(300));
    assert!(rig.session.is_present());
    assert_eq!(report.strip_color, NamedColor::White.rgb());
    assert_eq!(rig.sink.pulses.len(), LEDS * BITS_PER_LED);
    for i in 0..LEDS {
        assert_eq!(rig.monitor.strip().get(i), NamedColor::White.rgb());
    }
}

#[test]
fn test_monitor_blank_strip_when_absent() {
    let mut rig = Rig::new(1200);
    let report = rig.step(false);
    assert!(!rig.session.is_present());
    assert_eq!(report.strip_color, RGB8::default());
    assert!(rig.sink.bits(&BitTiming::WS2812B).iter().all(|b| !*b));
}

#[test]
fn test_monitor_switch_advances_color_once_per_press() {
    let mut rig = Rig::new(300);
    let first = rig.step(true);
    assert_eq!(first.color_changed, Some(NamedColor::Pink));
    let held = rig.step(true);
    assert_eq!(held.color_changed, None);
    rig.step(false);
    let second = rig.step(true);
    assert_eq!(second.color_changed, Some(NamedColor::Orange));
    assert_eq!(second.strip_color, NamedColor::Orange.rgb());
}

#[test]
fn test_monitor_keeps_presence_on_poll_failure() {
    let mut rig = Rig::new(300);
    rig.step(false);
    assert!(rig.session.is_present());

    let calls_so_far = rig.sensor.registers().transport().calls.len();
    rig.sensor.registers().transport().fail_at = Some(calls_so_far + 1);
    let report = rig.step(false);
    assert!(matches!(report.poll, Err(PollError::Bus(_))));
    assert!(rig.session.is_present());
    assert_eq!(report.strip_color, NamedColor::White.rgb());
}

#[test]
fn test_monitor_renders_status_lines() {
    let mut rig = Rig::new(300);
    rig.step(false);
    for _ in 0..75 {
        rig.session.tick();
    }
    rig.step(false);
    assert_eq!(
        rig.display.text(),
        vec!["Time 00:07", "Color White", "Dist 300 mm"]
    );
    assert_eq!(rig.display.lines[1].1, 11);
    assert_eq!(rig.display.render_count, 2);
}

#[test]
fn test_monitor_longest_status_lines_render_whole() {
    let mut rig = Rig::new(u16::MAX);
    // White → Pink → Orange → Light blue → Light green
    for _ in 0..4 {
        rig.step(true);
        rig.step(false);
    }
    assert_eq!(
        rig.display.text(),
        vec!["Time 00:00", "Color Light green", "Dist 65535 mm"]
    );
}

#[test]
fn test_monitor_reports_display_failure_and_continues() {
    let mut rig = Rig::new(300);
    rig.display.fail_next_render = true;
    let report = rig.step(false);
    assert_eq!(report.display, Err(DisplayError::WriteFailed));
    assert_eq!(rig.sink.latches.len(), 1);
    let report = rig.step(false);
    assert_eq!(report.display, Ok(()));
}

#[test]
fn test_monitor_blinks_when_break_due() {
    let config = MonitorConfig {
        break_after_minutes: 1,
        ..MonitorConfig::default()
    };
    let mut rig = Rig::with_config(300, config);
    rig.step(false);
    for _ in 0..600 {
        rig.session.tick();
    }
    let a = rig.step(false);
    let b = rig.step(false);
    assert!(a.break_due && b.break_due);
    assert_ne!(a.strip_color, b.strip_color);
    assert!(rig.display.text().contains(&"Take a break!"));
}

#[test]
fn test_monitor_session_survives_look_away() {
    let mut rig = Rig::new(300);
    rig.step(false);
    for _ in 0..20 {
        rig.session.tick();
    }
    rig.set_distance(2000);
    rig.step(false);
    for _ in 0..5 {
        rig.session.tick();
    }
    // Grace: Strip bleibt an, Zeit bleibt stehen
    let report = rig.step(false);
    assert_eq!(report.snapshot.state, PresenceState::Grace);
    assert_eq!(report.snapshot.seconds, 2);
    assert_eq!(report.strip_color, NamedColor::White.rgb());

    rig.set_distance(300);
    rig.step(false);
    rig.session.tick();
    assert_eq!(rig.session.snapshot().state, PresenceState::Present);
    assert_eq!(rig.session.snapshot().seconds, 2);
}

#[test]
fn test_monitor_blank_on_boot() {
    let mut rig = Rig::new(300);
    rig.monitor.blank(&mut rig.sink);
    assert_eq!(rig.sink.pulses.len(), LEDS * BITS_PER_LED);
    assert_eq!(rig.sink.latches.len(), 1);
}
