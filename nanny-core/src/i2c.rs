//! BusTransport über einen embedded-hal I2C Bus
//!
//! Der Register-Layer arbeitet mit Start/Byte/Stop Primitiven, embedded-hal
//! kennt nur ganze Transaktionen. Der Adapter sammelt deshalb geschriebene
//! Bytes bis zum Stop und schickt sie dann als eine Transaktion.
//!
//! Lesen: jedes Byte ist eine eigene Transaktion. Damit der Sensor trotzdem
//! fortlaufende Register liefert, merkt sich der Adapter den zuletzt
//! geschriebenen 16-Bit Index und setzt ihn vor jedem Byte neu.
//!
//! Bricht ein Schreibzugriff ab, werden die gesammelten Bytes verworfen.
//! Auf dem Bus landet nie ein abgeschnittener Schreibzugriff.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;

use crate::traits::{Acknowledge, BusFault, BusTransport, Direction, StopCondition};

/// Größter Schreibzugriff: 2 Byte Index + 91 Byte Default-Konfiguration
pub const WRITE_CAPACITY: usize = 96;

pub struct HalI2cTransport<I> {
    i2c: I,
    address: u8,
    pending: Vec<u8, WRITE_CAPACITY>,
    read_pointer: Option<u16>,
}

impl<I: I2c> HalI2cTransport<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: 0,
            pending: Vec::new(),
            read_pointer: None,
        }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    fn discard(&mut self) {
        self.pending.clear();
        self.read_pointer = None;
    }

    fn finish_write(&mut self) -> Result<(), BusFault> {
        let result = self.i2c.write(self.address, &self.pending).map_err(fault);
        self.read_pointer = match (&result, self.pending.as_slice()) {
            (Ok(()), [hi, lo]) => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        };
        self.pending.clear();
        result
    }
}

fn fault<E: embedded_hal::i2c::Error>(e: E) -> BusFault {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => BusFault::Nack,
        ErrorKind::ArbitrationLoss => BusFault::ArbitrationLost,
        ErrorKind::Overrun => BusFault::Overrun,
        _ => BusFault::Other,
    }
}

impl<I: I2c> BusTransport for HalI2cTransport<I> {
    fn start(&mut self, address: u8, direction: Direction) -> Result<(), BusFault> {
        match direction {
            // Neuer Schreibzugriff: Reste eines abgebrochenen Zugriffs verwerfen
            Direction::Write => self.discard(),
            // Repeated Start nach Index ohne Stop: Index zuerst senden
            Direction::Read if !self.pending.is_empty() => self.finish_write()?,
            Direction::Read => {}
        }
        self.address = address;
        Ok(())
    }

    fn write_byte(&mut self, value: u8, stop: StopCondition) -> Result<(), BusFault> {
        if self.pending.push(value).is_err() {
            self.discard();
            return Err(BusFault::Overrun);
        }
        if stop == StopCondition::Stop {
            self.finish_write()?;
        }
        Ok(())
    }

    fn read_byte(&mut self, _ack: Acknowledge, _stop: StopCondition) -> Result<u8, BusFault> {
        let mut byte = [0u8; 1];
        match self.read_pointer {
            Some(index) => {
                self.i2c
                    .write_read(self.address, &index.to_be_bytes(), &mut byte)
                    .map_err(fault)?;
                self.read_pointer = Some(index.wrapping_add(1));
            }
            None => self.i2c.read(self.address, &mut byte).map_err(fault)?,
        }
        Ok(byte[0])
    }
}
