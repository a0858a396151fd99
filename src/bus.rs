//! Timeout-bounded two-wire bus transactions.
//!
//! [`TimedBus`] wraps a raw [`WirePort`] (the register-level view of an I2C
//! peripheral) and a [`Monotonic`] clock, and drives addressed write/read
//! phases with every hardware spin-wait bounded by one deadline per
//! transaction. A peripheral that wedges with the clock stretched or the bus
//! held low produces [`TransferError::Timeout`] instead of hanging the main
//! loop; callers treat that exactly like a NACK.
//!
//! The bounded engine is surfaced as an [`embedded_hal::i2c::I2c`]
//! implementation, so sensor drivers stay generic over the standard trait
//! and tests can swap in a mock bus.

use crate::clock::{Monotonic, elapsed_ms};
use embedded_hal::i2c::{
    self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress,
};
use thiserror::Error;

/// Transfer failures reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TransferError {
    /// The peripheral did not acknowledge the address or a data byte.
    #[error("address or data byte not acknowledged")]
    Nack,
    /// The transaction exceeded its time bound and was abandoned.
    #[error("bus transaction exceeded its time bound")]
    Timeout,
}

impl i2c::Error for TransferError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Self::Timeout => ErrorKind::Other,
        }
    }
}

/// Register-level operations of a two-wire master peripheral.
///
/// Implementations are thin wrappers over the hardware's control and status
/// registers; all sequencing and time bounding lives in [`TimedBus`]. Flag
/// accessors take `&mut self` because reading a status register can have
/// side effects on some parts.
pub trait WirePort {
    /// Arms a write phase: slave address, byte count, and whether to
    /// generate a stop condition once the phase completes (`false` requests
    /// a repeated start into the next phase).
    fn begin_write(&mut self, addr: u8, count: usize, stop: bool);

    /// Arms a read phase; `stop` as in [`begin_write`](Self::begin_write).
    fn begin_read(&mut self, addr: u8, count: usize, stop: bool);

    /// The transmit register can accept the next byte.
    fn tx_ready(&mut self) -> bool;

    /// The peripheral reported a not-acknowledge.
    fn nacked(&mut self) -> bool;

    /// Writes one byte into the transmit register.
    fn write_byte(&mut self, byte: u8);

    /// The write phase finished on the wire (needed before a repeated
    /// start).
    fn write_done(&mut self) -> bool;

    /// A received byte is waiting in the data register.
    fn rx_ready(&mut self) -> bool;

    /// Takes the received byte out of the data register.
    fn read_byte(&mut self) -> u8;
}

/// A [`WirePort`] driven with a per-transaction deadline.
#[derive(Debug)]
pub struct TimedBus<P, C> {
    /// The raw peripheral, reachable for inspection in tests.
    pub port: P,
    clock: C,
    timeout_ms: u32,
}

impl<P: WirePort, C: Monotonic> TimedBus<P, C> {
    /// Wraps `port`, bounding every transaction to `timeout_ms` measured on
    /// `clock`. [`crate::consts::DEFAULT_BUS_TIMEOUT_MS`] is a suitable
    /// bound for short sensor transactions.
    pub fn new(port: P, clock: C, timeout_ms: u32) -> Self {
        Self {
            port,
            clock,
            timeout_ms,
        }
    }

    fn expired(&self, started: u32) -> bool {
        elapsed_ms(self.clock.now_ms(), started) >= self.timeout_ms
    }

    fn write_phase(
        &mut self,
        addr: u8,
        bytes: &[u8],
        stop: bool,
        started: u32,
    ) -> Result<(), TransferError> {
        self.port.begin_write(addr, bytes.len(), stop);
        for &byte in bytes {
            loop {
                if self.port.nacked() {
                    return Err(TransferError::Nack);
                }
                if self.port.tx_ready() {
                    break;
                }
                if self.expired(started) {
                    return Err(TransferError::Timeout);
                }
            }
            self.port.write_byte(byte);
        }
        if !stop {
            // A repeated start may only be issued once the write has fully
            // drained onto the wire.
            loop {
                if self.port.nacked() {
                    return Err(TransferError::Nack);
                }
                if self.port.write_done() {
                    break;
                }
                if self.expired(started) {
                    return Err(TransferError::Timeout);
                }
            }
        }
        Ok(())
    }

    fn read_phase(
        &mut self,
        addr: u8,
        out: &mut [u8],
        stop: bool,
        started: u32,
    ) -> Result<(), TransferError> {
        self.port.begin_read(addr, out.len(), stop);
        for slot in out.iter_mut() {
            loop {
                if self.port.rx_ready() {
                    break;
                }
                if self.expired(started) {
                    return Err(TransferError::Timeout);
                }
            }
            *slot = self.port.read_byte();
        }
        Ok(())
    }
}

impl<P: WirePort, C: Monotonic> ErrorType for TimedBus<P, C> {
    type Error = TransferError;
}

impl<P: WirePort, C: Monotonic> I2c for TimedBus<P, C> {
    /// Runs the operations as consecutive addressed phases chained with
    /// repeated starts, one deadline across the whole transaction, stop
    /// after the final phase.
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let started = self.clock.now_ms();
        let count = operations.len();
        for (index, op) in operations.iter_mut().enumerate() {
            let stop = index + 1 == count;
            match op {
                Operation::Write(bytes) => self.write_phase(address, bytes, stop, started)?,
                Operation::Read(out) => self.read_phase(address, out, stop, started)?,
            }
        }
        Ok(())
    }
}
