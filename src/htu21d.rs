//! HTU21D temperature and humidity acquisition.
//!
//! The sensor needs tens of milliseconds per conversion, so [`Htu21d`] runs
//! the acquisition as a three-state machine stepped by [`Htu21d::poll`] from
//! the main loop. Each serviced poll performs at most one short bus
//! transaction and then waits out a dwell, keeping the loop responsive while
//! a conversion is in flight.
//!
//! A full cycle is trigger temperature, read and stage it, trigger humidity,
//! read it, and emit one [`Measurements`]. Any bus fault or checksum failure
//! abandons the cycle and restarts from the beginning after the idle dwell;
//! a partial acquisition is never exposed.

use crate::clock::{Monotonic, elapsed_ms};
use crate::crc::crc8;
use crate::packet::Measurements;
use embedded_hal::i2c::I2c;

/// Fixed bus address of the sensor.
pub const HTU21D_ADDR: u8 = 0x40;

const CMD_TRIGGER_TEMPERATURE_HOLD: u8 = 0xE3;
const CMD_TRIGGER_HUMIDITY_HOLD: u8 = 0xE5;
const CMD_SOFT_RESET: u8 = 0xFE;

/// Idle time between acquisition cycles.
const DWELL_CLEAR_MS: u32 = 90;
/// Conversion time granted after the temperature trigger.
const DWELL_TEMPERATURE_MS: u32 = 16;
/// Conversion time granted after the humidity trigger.
const DWELL_HUMIDITY_MS: u32 = 16;

#[derive(Debug, Clone, Copy)]
enum AcquisitionState {
    Clear,
    ReadTemperature,
    ReadHumidity,
}

/// Polled HTU21D driver over any [`I2c`] bus.
///
/// The driver never blocks on a conversion: [`poll`](Self::poll) returns
/// immediately unless the current dwell has elapsed, and a complete cycle
/// spans three serviced polls. Call it as often as the main loop spins.
#[derive(Debug)]
pub struct Htu21d<I2C, C> {
    /// Underlying bus, reachable for teardown and test verification.
    pub bus: I2C,
    clock: C,
    state: AcquisitionState,
    dwell_ms: u32,
    polled_at: u32,
    staged_temperature: i32,
}

impl<I2C: I2c, C: Monotonic> Htu21d<I2C, C> {
    /// Creates the driver in the idle state; the first trigger goes out one
    /// idle dwell after construction.
    pub fn new(bus: I2C, clock: C) -> Self {
        let polled_at = clock.now_ms();
        Self {
            bus,
            clock,
            state: AcquisitionState::Clear,
            dwell_ms: DWELL_CLEAR_MS,
            polled_at,
            staged_temperature: 0,
        }
    }

    /// Issues the sensor's soft-reset command, typically once at bring-up.
    ///
    /// Returns `false` on a bus fault; polling may proceed either way.
    pub fn soft_reset(&mut self) -> bool {
        self.command(CMD_SOFT_RESET)
    }

    /// Steps the acquisition machine, yielding one [`Measurements`] per
    /// completed cycle.
    ///
    /// Returns `None` while the current dwell has not elapsed or while the
    /// cycle is still in progress. Bus faults and checksum failures restart
    /// the cycle from the idle state.
    pub fn poll(&mut self) -> Option<Measurements> {
        if elapsed_ms(self.clock.now_ms(), self.polled_at) <= self.dwell_ms {
            return None;
        }
        let completed = self.step();
        self.polled_at = self.clock.now_ms();
        completed
    }

    fn step(&mut self) -> Option<Measurements> {
        match self.state {
            AcquisitionState::Clear => {
                if self.command(CMD_TRIGGER_TEMPERATURE_HOLD) {
                    self.state = AcquisitionState::ReadTemperature;
                    self.dwell_ms = DWELL_TEMPERATURE_MS;
                }
                None
            }
            AcquisitionState::ReadTemperature => {
                match self.read_raw() {
                    // The humidity trigger must land before the temperature
                    // is worth staging.
                    Some(raw) if self.command(CMD_TRIGGER_HUMIDITY_HOLD) => {
                        self.staged_temperature = convert_temperature(raw);
                        self.state = AcquisitionState::ReadHumidity;
                        self.dwell_ms = DWELL_HUMIDITY_MS;
                    }
                    _ => {
                        self.state = AcquisitionState::Clear;
                        self.dwell_ms = DWELL_CLEAR_MS;
                    }
                }
                None
            }
            AcquisitionState::ReadHumidity => {
                let completed = self.read_raw().map(|raw| Measurements {
                    temperature: self.staged_temperature,
                    relative_humidity: convert_humidity(raw),
                });
                self.state = AcquisitionState::Clear;
                self.dwell_ms = DWELL_CLEAR_MS;
                completed
            }
        }
    }

    fn command(&mut self, command: u8) -> bool {
        self.bus.write(HTU21D_ADDR, &[command]).is_ok()
    }

    /// Fetches a 2-byte reading plus its checksum byte.
    fn read_raw(&mut self) -> Option<u16> {
        let mut response = [0u8; 3];
        if self.bus.read(HTU21D_ADDR, &mut response).is_err() {
            return None;
        }
        if crc8(&response) != 0 {
            return None;
        }
        Some(u16::from_be_bytes([response[0], response[1]]))
    }
}

/// Converts a raw temperature code to hundredths of a degree Celsius.
///
/// Datasheet formula `-46.85 + 175.72 * s / 2^16`, evaluated in integer
/// centi-units.
///
/// # Examples
///
/// ```
/// assert_eq!(sensorlink::htu21d::convert_temperature(0x6000), 1904);
/// assert_eq!(sensorlink::htu21d::convert_temperature(0x8000), 4101);
/// ```
pub fn convert_temperature(raw: u16) -> i32 {
    17572 * i32::from(raw) / 65536 - 4685
}

/// Converts a raw humidity code to hundredths of a percent RH.
pub fn convert_humidity(raw: u16) -> i32 {
    12500 * i32::from(raw) / 65536 - 600
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    struct FakeClock(Cell<u32>);

    impl Monotonic for FakeClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    #[test]
    fn test_full_cycle_emits_one_measurement() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
            Transaction::read(HTU21D_ADDR, vec![0x68, 0x3A, 0x7C]),
            Transaction::write(HTU21D_ADDR, vec![0xE5]),
            Transaction::read(HTU21D_ADDR, vec![0x60, 0x00, 0x55]),
        ];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        assert_eq!(sensor.poll(), None);

        clock.0.set(91);
        assert_eq!(sensor.poll(), None);

        clock.0.set(108);
        assert_eq!(sensor.poll(), None);

        clock.0.set(125);
        assert_eq!(
            sensor.poll(),
            Some(Measurements {
                temperature: 2469,
                relative_humidity: 4087,
            })
        );

        sensor.bus.done();
    }

    #[test]
    fn test_poll_within_dwell_touches_nothing() {
        let clock = FakeClock(Cell::new(0));
        let mut sensor = Htu21d::new(Mock::new(&[]), &clock);

        for t in [0, 30, 60, 90] {
            clock.0.set(t);
            assert_eq!(sensor.poll(), None);
        }

        sensor.bus.done();
    }

    #[test]
    fn test_failed_trigger_retries_from_idle() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]).with_error(ErrorKind::Other),
            Transaction::write(HTU21D_ADDR, vec![0xE3]).with_error(ErrorKind::Other),
        ];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        clock.0.set(91);
        assert_eq!(sensor.poll(), None);
        clock.0.set(182);
        assert_eq!(sensor.poll(), None);

        sensor.bus.done();
    }

    #[test]
    fn test_failed_read_restarts_after_idle_dwell() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
            Transaction::read(HTU21D_ADDR, vec![0, 0, 0]).with_error(ErrorKind::Other),
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
        ];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        clock.0.set(91);
        assert_eq!(sensor.poll(), None);
        clock.0.set(108);
        assert_eq!(sensor.poll(), None);

        // Back in the idle state: a poll inside the idle dwell is a no-op,
        // the trigger goes out again only once it elapses.
        clock.0.set(125);
        assert_eq!(sensor.poll(), None);
        clock.0.set(199);
        assert_eq!(sensor.poll(), None);

        sensor.bus.done();
    }

    #[test]
    fn test_bad_checksum_abandons_cycle() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
            Transaction::read(HTU21D_ADDR, vec![0x68, 0x3A, 0x00]),
        ];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        clock.0.set(91);
        assert_eq!(sensor.poll(), None);
        clock.0.set(108);
        assert_eq!(sensor.poll(), None);

        sensor.bus.done();
    }

    #[test]
    fn test_humidity_failure_emits_nothing() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
            Transaction::read(HTU21D_ADDR, vec![0x68, 0x3A, 0x7C]),
            Transaction::write(HTU21D_ADDR, vec![0xE5]),
            Transaction::read(HTU21D_ADDR, vec![0, 0, 0]).with_error(ErrorKind::Other),
        ];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        clock.0.set(91);
        assert_eq!(sensor.poll(), None);
        clock.0.set(108);
        assert_eq!(sensor.poll(), None);
        clock.0.set(125);
        assert_eq!(sensor.poll(), None);

        sensor.bus.done();
    }

    #[test]
    fn test_soft_reset_sends_reset_command() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [Transaction::write(HTU21D_ADDR, vec![0xFE])];
        let mut sensor = Htu21d::new(Mock::new(&expectations), &clock);

        assert!(sensor.soft_reset());
        sensor.bus.done();
    }

    #[test]
    fn test_conversion_vectors() {
        assert_eq!(convert_temperature(0x0000), -4685);
        assert_eq!(convert_temperature(0x6000), 1904);
        assert_eq!(convert_temperature(0x683A), 2469);
        assert_eq!(convert_temperature(0x8000), 4101);

        assert_eq!(convert_humidity(0x0000), -600);
        assert_eq!(convert_humidity(0x6000), 4087);
        assert_eq!(convert_humidity(0x8000), 5650);
    }
}
