//! Versioned packet protocol over COBS-delimited frames.
//!
//! [`Protocol`] owns the frame-facing half of a [`Transport`] pair and turns
//! it into a typed packet link: outbound packets are built, checksummed,
//! encoded and queued in one pass; inbound frame candidates are decoded,
//! validated and dispatched. Everything runs in the cooperative main loop,
//! with fixed staging buffers and no allocation.
//!
//! ## Wire Format
//!
//! A frame is `0x00 | COBS(header ∥ payload ∥ crc32) | 0x00`. The header is
//! two bytes, protocol version then packet type. The CRC-32 runs over
//! header and payload and is appended little-endian, so the receive path
//! validates a packet by running the CRC over the entire decoded sequence
//! and comparing against zero.
//!
//! ## Receive Path
//!
//! [`Protocol::poll_inbound`] drains one delimited candidate at a time.
//! Candidates that fail to decode, come up short, fail the CRC or carry a
//! foreign version are dropped and counted; the link stays up. A RESET
//! packet hands control to the [`SystemReset`] collaborator and never
//! returns.

use crate::cobs::{Decoder, Encoder, FeedStatus};
use crate::consts::{
    FRAME_DELIMITER, PACKET_BUF_LEN, PACKET_CRC_LEN, PACKET_HEADER_LEN, PACKET_PAYLOAD_MAX,
    PROTOCOL_VERSION,
};
use crate::crc::{CRC32_SEED, crc32};
use crate::transport::FrameHalf;

/// Packet types this node transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum OutboundType {
    /// Link keep-alive; empty payload.
    Nop = 1,
    /// One completed sensor acquisition, two little-endian `i32`.
    Measurements = 2,
    /// Uptime and traffic counters.
    Health = 3,
    /// Single-byte event code.
    Event = 4,
}

/// Packet types this node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum InboundType {
    /// Ignored on receipt.
    Nop = 1,
    /// Invokes the reset collaborator.
    Reset = 2,
}

impl InboundType {
    /// Decodes the wire type byte, `None` for types this node does not know.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Nop),
            2 => Some(Self::Reset),
            _ => None,
        }
    }
}

/// One completed sensor acquisition in native centi-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Measurements {
    /// Temperature in hundredths of a degree Celsius.
    pub temperature: i32,
    /// Relative humidity in hundredths of a percent.
    pub relative_humidity: i32,
}

impl Measurements {
    /// Serializes as the MEASUREMENTS payload, temperature first.
    pub fn to_payload(&self) -> [u8; 8] {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&self.temperature.to_le_bytes());
        payload[4..].copy_from_slice(&self.relative_humidity.to_le_bytes());
        payload
    }

    /// Deserializes a MEASUREMENTS payload; `None` if the length is off.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() != 8 {
            return None;
        }
        Some(Self {
            temperature: i32::from_le_bytes(payload[..4].try_into().ok()?),
            relative_humidity: i32::from_le_bytes(payload[4..].try_into().ok()?),
        })
    }
}

/// Target-side reset hook, invoked when a RESET packet arrives.
pub trait SystemReset {
    /// Transfers control away from the application. Never returns.
    fn system_reset(&mut self) -> !;
}

/// Typed packet link over the frame-facing transport half.
#[derive(Debug)]
pub struct Protocol<'a, R> {
    frames: FrameHalf<'a>,
    reset: R,
    enc_buf: [u8; PACKET_BUF_LEN],
    candidate: [u8; PACKET_BUF_LEN],
    scratch: [u8; PACKET_BUF_LEN],
    rx_good: u16,
    rx_bad: u16,
    tx_good: u16,
}

impl<'a, R: SystemReset> Protocol<'a, R> {
    /// Builds a protocol instance over `frames`, dispatching RESET packets
    /// to `reset`.
    pub fn new(frames: FrameHalf<'a>, reset: R) -> Self {
        Self {
            frames,
            reset,
            enc_buf: [0; PACKET_BUF_LEN],
            candidate: [0; PACKET_BUF_LEN],
            scratch: [0; PACKET_BUF_LEN],
            rx_good: 0,
            rx_bad: 0,
            tx_good: 0,
        }
    }

    /// Frames accepted and dispatched since construction. Wraps.
    pub fn rx_good(&self) -> u16 {
        self.rx_good
    }

    /// Frames discarded for framing, CRC or version faults. Wraps.
    pub fn rx_bad(&self) -> u16 {
        self.rx_bad
    }

    /// Frames queued outbound since construction. Wraps.
    pub fn tx_good(&self) -> u16 {
        self.tx_good
    }

    /// Builds and queues one packet; all-or-nothing.
    ///
    /// Returns `false`, leaving the outbound ring untouched, when the
    /// payload exceeds [`PACKET_PAYLOAD_MAX`] or the ring lacks room for the
    /// whole encoded frame. Both are transient conditions the caller may
    /// retry on a later poll.
    pub fn send(&mut self, packet_type: OutboundType, payload: &[u8]) -> bool {
        if payload.len() > PACKET_PAYLOAD_MAX {
            return false;
        }
        let header = [PROTOCOL_VERSION, packet_type as u8];
        let mut crc = crc32(&header, CRC32_SEED);
        crc = crc32(payload, crc);

        let mut encoder = Encoder::new(&mut self.enc_buf);
        if encoder.push(&header).is_err()
            || encoder.push(payload).is_err()
            || encoder.push(&crc.to_le_bytes()).is_err()
        {
            return false;
        }
        let frame_len = match encoder.finish() {
            Ok(len) => len,
            Err(_) => return false,
        };
        if !self.frames.send_frame(&self.enc_buf[..frame_len]) {
            return false;
        }
        self.tx_good = self.tx_good.wrapping_add(1);
        true
    }

    /// Queues a NOP keep-alive.
    pub fn send_nop(&mut self) -> bool {
        self.send(OutboundType::Nop, &[])
    }

    /// Queues a MEASUREMENTS packet.
    pub fn send_measurements(&mut self, measurements: &Measurements) -> bool {
        self.send(OutboundType::Measurements, &measurements.to_payload())
    }

    /// Queues a HEALTH packet carrying `uptime_ms` and the traffic counters.
    pub fn send_health(&mut self, uptime_ms: u32) -> bool {
        let mut payload: heapless::Vec<u8, 8> = heapless::Vec::new();
        let _ = payload.extend_from_slice(&uptime_ms.to_le_bytes());
        let _ = payload.extend_from_slice(&self.rx_good.to_le_bytes());
        let _ = payload.extend_from_slice(&self.rx_bad.to_le_bytes());
        self.send(OutboundType::Health, &payload)
    }

    /// Queues an EVENT packet with a one-byte code.
    pub fn send_event(&mut self, code: u8) -> bool {
        self.send(OutboundType::Event, &[code])
    }

    /// Drains and dispatches every pending inbound frame candidate.
    ///
    /// Malformed candidates are dropped and counted in
    /// [`rx_bad`](Self::rx_bad); the loop keeps going until the inbound ring
    /// is empty. Dispatching a RESET packet does not return.
    pub fn poll_inbound(&mut self) {
        loop {
            let len = self.frames.drain_frame(&mut self.candidate);
            if len == 0 {
                break;
            }
            self.process(len);
        }
    }

    fn process(&mut self, len: usize) {
        // Runs of bare delimiters are inter-frame idle, not a frame.
        if self.candidate[..len].iter().all(|&b| b == FRAME_DELIMITER) {
            return;
        }

        let mut decoder = Decoder::new(&mut self.scratch);
        let packet_len = match decoder.feed(&self.candidate[..len]) {
            Ok(FeedStatus::Complete(n)) if n >= PACKET_HEADER_LEN + PACKET_CRC_LEN => n,
            Ok(_) | Err(_) => {
                #[cfg(feature = "log")]
                log::debug!("inbound discard: bad framing");
                self.rx_bad = self.rx_bad.wrapping_add(1);
                return;
            }
        };

        let packet = &self.scratch[..packet_len];
        if crc32(packet, CRC32_SEED) != 0 {
            #[cfg(feature = "log")]
            log::debug!("inbound discard: crc mismatch");
            self.rx_bad = self.rx_bad.wrapping_add(1);
            return;
        }
        if packet[0] != PROTOCOL_VERSION {
            #[cfg(feature = "log")]
            log::debug!("inbound discard: version {}", packet[0]);
            self.rx_bad = self.rx_bad.wrapping_add(1);
            return;
        }

        self.rx_good = self.rx_good.wrapping_add(1);
        match InboundType::from_wire(packet[1]) {
            Some(InboundType::Nop) => {}
            Some(InboundType::Reset) => self.reset.system_reset(),
            // Unknown types pass validation and are ignored.
            None => {}
        }
    }
}
