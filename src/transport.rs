//! Frame-oriented transport over two SPSC rings.
//!
//! A [`Transport`] owns the inbound ring (link to main loop,
//! [`RX_RING_LEN`] bytes) and the outbound ring (main loop to link,
//! [`TX_RING_LEN`] bytes). [`Transport::split`] produces the two views the
//! firmware wires up:
//!
//! - [`LinkHalf`] lives with the serial hardware: the receive interrupt
//!   pushes one byte per event, and the transmit interrupt or DMA refill
//!   drains whatever is pending.
//! - [`FrameHalf`] lives with the packet protocol: it pulls one delimited
//!   frame candidate per call and submits whole encoded frames,
//!   all-or-nothing.
//!
//! Neither half ever blocks; saturation shows up as a short count or a
//! `false` return and is recoverable by simply retrying on a later poll.

use crate::consts::{FRAME_DELIMITER, RX_RING_LEN, TX_RING_LEN};
use crate::ring::{Consumer, Producer, RingBuffer};
use core::convert::Infallible;

/// The pair of rings connecting the serial link to the packet protocol.
///
/// # Examples
///
/// ```
/// use sensorlink::transport::Transport;
///
/// let mut transport = Transport::new();
/// let (mut link, mut frames) = transport.split();
///
/// // Receive interrupt delivers an encoded frame byte by byte.
/// assert!(link.rx_byte(0x02));
/// assert!(link.rx_byte(0x41));
/// assert!(link.rx_byte(0x00));
///
/// // Main loop pulls it back out as one delimited candidate.
/// let mut buf = [0u8; 8];
/// assert_eq!(frames.drain_frame(&mut buf), 3);
/// assert_eq!(&buf[..3], &[0x02, 0x41, 0x00]);
/// ```
#[derive(Debug)]
pub struct Transport {
    inbound: RingBuffer<RX_RING_LEN>,
    outbound: RingBuffer<TX_RING_LEN>,
}

impl Transport {
    /// Creates the transport with both rings empty. Usable in `static`
    /// initializers.
    pub const fn new() -> Self {
        Self {
            inbound: RingBuffer::new(),
            outbound: RingBuffer::new(),
        }
    }

    /// Splits into the link-facing and frame-facing halves.
    ///
    /// Each ring's producer and consumer end up on opposite halves, so the
    /// SPSC discipline of [`crate::ring`] maps one-to-one onto the interrupt
    /// and main-loop contexts.
    pub fn split(&mut self) -> (LinkHalf<'_>, FrameHalf<'_>) {
        let (rx_in, rx_out) = self.inbound.split();
        let (tx_in, tx_out) = self.outbound.split();
        (
            LinkHalf {
                rx: rx_in,
                tx: tx_out,
            },
            FrameHalf {
                rx: rx_out,
                tx: tx_in,
            },
        )
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side view: byte-wise receive in, bulk or byte-wise transmit out.
#[derive(Debug)]
pub struct LinkHalf<'a> {
    rx: Producer<'a, RX_RING_LEN>,
    tx: Consumer<'a, TX_RING_LEN>,
}

impl LinkHalf<'_> {
    /// Stores one received byte in the inbound ring.
    ///
    /// # Returns
    ///
    /// `false` when the ring is full and the byte was dropped. Dropping is
    /// the contract on overrun; the frame it belonged to fails its CRC later
    /// and is discarded there.
    pub fn rx_byte(&mut self, byte: u8) -> bool {
        self.rx.write(&[byte]) == 1
    }

    /// Moves pending outbound bytes into `out`, e.g. to refill a DMA buffer.
    ///
    /// # Returns
    ///
    /// The number of bytes copied; zero when nothing is pending.
    pub fn tx_drain(&mut self, out: &mut [u8]) -> usize {
        self.tx.read(out)
    }

    /// Takes a single outbound byte, for TX-empty interrupt handlers.
    ///
    /// # Errors
    ///
    /// [`nb::Error::WouldBlock`] when the outbound ring is empty.
    pub fn tx_next(&mut self) -> nb::Result<u8, Infallible> {
        let mut byte = [0u8; 1];
        if self.tx.read(&mut byte) == 1 {
            Ok(byte[0])
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// Main-loop view: delimited frame candidates in, whole frames out.
#[derive(Debug)]
pub struct FrameHalf<'a> {
    rx: Consumer<'a, RX_RING_LEN>,
    tx: Producer<'a, TX_RING_LEN>,
}

impl FrameHalf<'_> {
    /// Pulls at most one pending frame candidate from the inbound ring.
    ///
    /// Stops after the first [`FRAME_DELIMITER`] (included in the output), so
    /// repeated calls step through the ring frame by frame. A candidate
    /// without a trailing delimiter was cut short by ring saturation or by
    /// `out` running out of room; the decoder rejects it downstream.
    ///
    /// # Returns
    ///
    /// The candidate length, or zero when the ring is empty.
    pub fn drain_frame(&mut self, out: &mut [u8]) -> usize {
        self.rx.read_until(out, FRAME_DELIMITER)
    }

    /// Queues one encoded frame on the outbound ring, all-or-nothing.
    ///
    /// # Returns
    ///
    /// `false` if the ring lacks room for the whole frame; nothing is written
    /// in that case, so the wire never carries a torn frame.
    pub fn send_frame(&mut self, frame: &[u8]) -> bool {
        if frame.len() > self.tx.free() {
            return false;
        }
        let written = self.tx.write(frame);
        debug_assert_eq!(written, frame.len());
        written == frame.len()
    }
}
