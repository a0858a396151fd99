//! Main-loop facade over the packet link and the sensor.
//!
//! [`SensorBridge`] bundles a [`Protocol`] and an [`Htu21d`] so firmware
//! runs one call per loop iteration: inbound packets are dispatched first,
//! then the acquisition machine is stepped, and a completed acquisition is
//! serialized straight onto the outbound ring.

use crate::clock::Monotonic;
use crate::htu21d::Htu21d;
use crate::packet::{Protocol, SystemReset};
use crate::transport::FrameHalf;
use embedded_hal::i2c::I2c;

/// One-call-per-loop glue between sensor acquisition and the packet link.
#[derive(Debug)]
pub struct SensorBridge<'a, R, I2C, C> {
    /// Packet layer, reachable for health and event reporting.
    pub protocol: Protocol<'a, R>,
    /// Sensor driver, reachable for bring-up calls such as
    /// [`soft_reset`](Htu21d::soft_reset).
    pub sensor: Htu21d<I2C, C>,
}

impl<'a, R: SystemReset, I2C: I2c, C: Monotonic> SensorBridge<'a, R, I2C, C> {
    /// Assembles the bridge from the frame-facing transport half and the
    /// sensor's bus and clock.
    pub fn new(frames: FrameHalf<'a>, bus: I2C, clock: C, reset: R) -> Self {
        Self {
            protocol: Protocol::new(frames, reset),
            sensor: Htu21d::new(bus, clock),
        }
    }

    /// Runs one main-loop step.
    ///
    /// Drains and dispatches pending inbound frames, then steps the
    /// acquisition machine. A completed [`Measurements`] is queued as a
    /// MEASUREMENTS packet; if the outbound ring is full the reading is
    /// dropped and the next cycle delivers a fresh one.
    ///
    /// [`Measurements`]: crate::packet::Measurements
    pub fn poll(&mut self) {
        self.protocol.poll_inbound();
        if let Some(measurements) = self.sensor.poll() {
            let _ = self.protocol.send_measurements(&measurements);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cobs::{Decoder, Encoder, FeedStatus};
    use crate::consts::PROTOCOL_VERSION;
    use crate::crc::{CRC32_SEED, crc32};
    use crate::htu21d::HTU21D_ADDR;
    use crate::packet::{Measurements, OutboundType};
    use crate::transport::Transport;
    use core::cell::Cell;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    struct FakeClock(Cell<u32>);

    impl Monotonic for FakeClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    #[derive(Debug)]
    struct PanicReset;

    impl SystemReset for PanicReset {
        fn system_reset(&mut self) -> ! {
            panic!("system reset requested");
        }
    }

    #[test]
    fn test_acquisition_cycle_reaches_the_wire() {
        let clock = FakeClock(Cell::new(0));
        let expectations = [
            Transaction::write(HTU21D_ADDR, vec![0xE3]),
            Transaction::read(HTU21D_ADDR, vec![0x68, 0x3A, 0x7C]),
            Transaction::write(HTU21D_ADDR, vec![0xE5]),
            Transaction::read(HTU21D_ADDR, vec![0x60, 0x00, 0x55]),
        ];
        let mut transport = Transport::new();
        let (mut link, frames) = transport.split();
        let mut bridge = SensorBridge::new(frames, Mock::new(&expectations), &clock, PanicReset);

        // An inbound NOP queued before the first step exercises the
        // dispatch half of the loop.
        let header = [PROTOCOL_VERSION, 1];
        let crc = crc32(&header, CRC32_SEED);
        let mut frame = [0u8; 16];
        let mut enc = Encoder::new(&mut frame);
        enc.push(&header).unwrap();
        enc.push(&crc.to_le_bytes()).unwrap();
        let len = enc.finish().unwrap();
        for &byte in &frame[..len] {
            assert!(link.rx_byte(byte));
        }

        for t in [0, 91, 108, 125] {
            clock.0.set(t);
            bridge.poll();
        }

        assert_eq!(bridge.protocol.rx_good(), 1);
        assert_eq!(bridge.protocol.tx_good(), 1);

        let mut wire = [0u8; 64];
        let n = link.tx_drain(&mut wire);
        assert!(n > 0);

        let mut out = [0u8; 64];
        let mut dec = Decoder::new(&mut out);
        let packet_len = match dec.feed(&wire[..n]).unwrap() {
            FeedStatus::Complete(decoded) => decoded,
            FeedStatus::Incomplete => panic!("frame not terminated"),
        };
        assert_eq!(out[1], OutboundType::Measurements as u8);
        assert_eq!(
            Measurements::from_payload(&out[2..packet_len - 4]),
            Some(Measurements {
                temperature: 2469,
                relative_humidity: 4087,
            })
        );

        bridge.sensor.bus.done();
    }
}
