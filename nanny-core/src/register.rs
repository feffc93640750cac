//! Register-Protokoll des Distanzsensors
//!
//! Jede Operation adressiert das Gerät unter [`DEVICE_ADDRESS`] und schickt
//! zuerst den 16-Bit Register-Index (Big-Endian). Schreiben hängt die
//! Nutzdaten direkt an, Lesen setzt den Index mit Stop und startet dann
//! eine Lese-Transaktion.
//!
//! Beim ersten fehlgeschlagenen Primitiv bricht die Operation ab und liefert
//! einen eindeutigen negativen Code. Es gibt kein Rollback; der Bus bleibt
//! im Zustand des Transports.

use core::fmt;

use crate::traits::{Acknowledge, BusFault, BusTransport, Direction, StopCondition};

/// 7-Bit I²C Adresse des VL53L1X
pub const DEVICE_ADDRESS: u8 = 0x29;

/// Fehler einer zusammengesetzten Register-Operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterError {
    code: i8,
    index: u16,
    fault: BusFault,
}

impl RegisterError {
    /// Negativer Code des fehlgeschlagenen Schritts (-1 ... -7)
    pub fn code(&self) -> i8 {
        self.code
    }

    /// Register, auf das zugegriffen wurde
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn fault(&self) -> BusFault {
        self.fault
    }
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "register 0x{:04X}: step {} failed ({})",
            self.index, self.code, self.fault
        )
    }
}

/// Register-Zugriff über einen [`BusTransport`]
pub struct RegisterBus<T> {
    transport: T,
}

impl<T: BusTransport> RegisterBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn release(self) -> T {
        self.transport
    }

    /// Start mit Schreibrichtung und High-Byte des Index
    fn begin(&mut self, index: u16) -> Result<(), RegisterError> {
        self.transport
            .start(DEVICE_ADDRESS, Direction::Write)
            .map_err(|fault| err(-1, index, fault))?;
        self.transport
            .write_byte((index >> 8) as u8, StopCondition::Continue)
            .map_err(|fault| err(-2, index, fault))
    }

    /// Index setzen und Lese-Transaktion starten
    ///
    /// `index_lo_code` ist der Code für das Low-Byte des Index; `read_byte`
    /// zählt dort anders als die übrigen Leseoperationen.
    fn begin_read(&mut self, index: u16, index_lo_code: i8) -> Result<i8, RegisterError> {
        self.begin(index)?;
        self.transport
            .write_byte(index as u8, StopCondition::Stop)
            .map_err(|fault| err(index_lo_code, index, fault))?;
        let start_code = index_lo_code - 1;
        self.transport
            .start(DEVICE_ADDRESS, Direction::Read)
            .map_err(|fault| err(start_code, index, fault))?;
        Ok(start_code - 1)
    }

    fn send(&mut self, index: u16, value: u8, stop: StopCondition, code: i8) -> Result<(), RegisterError> {
        self.transport
            .write_byte(value, stop)
            .map_err(|fault| err(code, index, fault))
    }

    fn receive(&mut self, index: u16, last: bool, code: i8) -> Result<u8, RegisterError> {
        let (ack, stop) = if last {
            (Acknowledge::Nack, StopCondition::Stop)
        } else {
            (Acknowledge::Ack, StopCondition::Continue)
        };
        self.transport
            .read_byte(ack, stop)
            .map_err(|fault| err(code, index, fault))
    }

    /// Schreibt `data` ab `index` (Auto-Increment im Sensor)
    ///
    /// Ohne Nutzdaten wird nur der Index gesetzt.
    pub fn write_multi(&mut self, index: u16, data: &[u8]) -> Result<(), RegisterError> {
        self.begin(index)?;
        let Some((last, head)) = data.split_last() else {
            return self.send(index, index as u8, StopCondition::Stop, -2);
        };
        self.send(index, index as u8, StopCondition::Continue, -2)?;
        for byte in head {
            self.send(index, *byte, StopCondition::Continue, -3)?;
        }
        self.send(index, *last, StopCondition::Stop, -4)
    }

    /// Liest `buf.len()` Bytes ab `index`
    pub fn read_multi(&mut self, index: u16, buf: &mut [u8]) -> Result<(), RegisterError> {
        self.begin_read(index, -2)?;
        let count = buf.len();
        for (i, slot) in buf.iter_mut().enumerate() {
            let last = i + 1 == count;
            *slot = self.receive(index, last, if last { -4 } else { -5 })?;
        }
        Ok(())
    }

    fn write_be<const LEN: usize>(&mut self, index: u16, bytes: [u8; LEN]) -> Result<(), RegisterError> {
        self.begin(index)?;
        self.send(index, index as u8, StopCondition::Continue, -2)?;
        for (i, byte) in bytes.iter().enumerate() {
            let stop = if i + 1 == LEN {
                StopCondition::Stop
            } else {
                StopCondition::Continue
            };
            self.send(index, *byte, stop, -3 - i as i8)?;
        }
        Ok(())
    }

    fn read_be<const LEN: usize>(&mut self, index: u16) -> Result<[u8; LEN], RegisterError> {
        let first_code = self.begin_read(index, -2)?;
        let mut bytes = [0u8; LEN];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = self.receive(index, i + 1 == LEN, first_code - i as i8)?;
        }
        Ok(bytes)
    }

    pub fn write_byte(&mut self, index: u16, value: u8) -> Result<(), RegisterError> {
        self.write_be(index, [value])
    }

    /// Schreibt ein Wort, High-Byte zuerst
    pub fn write_word(&mut self, index: u16, value: u16) -> Result<(), RegisterError> {
        self.write_be(index, value.to_be_bytes())
    }

    pub fn write_dword(&mut self, index: u16, value: u32) -> Result<(), RegisterError> {
        self.write_be(index, value.to_be_bytes())
    }

    pub fn read_byte(&mut self, index: u16) -> Result<u8, RegisterError> {
        let read_code = self.begin_read(index, -3)?;
        self.receive(index, true, read_code)
    }

    /// Liest ein Wort; das zuerst empfangene Byte ist das höherwertige
    pub fn read_word(&mut self, index: u16) -> Result<u16, RegisterError> {
        self.read_be::<2>(index).map(u16::from_be_bytes)
    }

    pub fn read_dword(&mut self, index: u16) -> Result<u32, RegisterError> {
        self.read_be::<4>(index).map(u32::from_be_bytes)
    }
}

fn err(code: i8, index: u16, fault: BusFault) -> RegisterError {
    RegisterError { code, index, fault }
}
