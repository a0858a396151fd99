//! Constants shared across the transport and framing implementation.
//!
//! This module defines the protocol-wide constants used for buffer
//! sizing, header layout, frame delimiting, and bus timing.
//!
//! ## Key Concepts
//!
//! - **Packet buffer**: every packet, encoded or decoded, must fit in one
//!   fixed staging buffer; there is no dynamic allocation anywhere.
//! - **Header**: fixed 2-byte format carrying the protocol version and the
//!   packet type.
//! - **Delimiter**: COBS encoding removes interior zero bytes, so a single
//!   `0x00` unambiguously separates frames on the wire.
//! - **Ring sizing**: the inbound ring is sized for the short command frames
//!   the host sends, with generous slack; the outbound ring is twice that,
//!   since telemetry is produced faster than a slow link drains it.

/// Protocol version expected in byte 0 of every packet header.
///
/// Inbound packets carrying any other value are discarded without dispatch.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size (in bytes) of the packet staging buffers.
///
/// Bounds both the raw (decoded) and the COBS-encoded form of a packet,
/// including the two frame delimiters.
pub const PACKET_BUF_LEN: usize = 128;

/// Length (in bytes) of the packet header: version, then type.
pub const PACKET_HEADER_LEN: usize = 2;

/// Length (in bytes) of the trailing CRC32 field.
pub const PACKET_CRC_LEN: usize = 4;

/// Fixed framing overhead of an encoded packet: the leading delimiter, the
/// first COBS code byte, and the trailing delimiter.
///
/// Raw packets short enough to fit [`PACKET_BUF_LEN`] never span a 254-byte
/// COBS block, so the encoded frame is exactly the raw length plus this.
pub const FRAME_OVERHEAD: usize = 3;

/// Maximum payload length accepted by the packet protocol.
///
/// Derived so that header, payload, CRC, and framing overhead together fill
/// [`PACKET_BUF_LEN`] exactly at the limit.
pub const PACKET_PAYLOAD_MAX: usize =
    PACKET_BUF_LEN - PACKET_HEADER_LEN - PACKET_CRC_LEN - FRAME_OVERHEAD;

/// Byte value delimiting frames on the wire.
pub const FRAME_DELIMITER: u8 = 0x00;

/// Capacity (in bytes) of the inbound transport ring.
pub const RX_RING_LEN: usize = 128;

/// Capacity (in bytes) of the outbound transport ring.
pub const TX_RING_LEN: usize = 256;

/// Default bound (in milliseconds) for one two-wire bus transaction.
///
/// Generous for the 4-byte transactions the sensor driver issues at
/// standard-mode clock rates.
pub const DEFAULT_BUS_TIMEOUT_MS: u32 = 10;
