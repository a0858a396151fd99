//! Incremental COBS framing codec.
//!
//! COBS (Consistent Overhead Byte Stuffing) rewrites a byte string so that it
//! contains no zero bytes, letting a single `0x00` delimit frames on the
//! wire. Runs of non-zero bytes are prefixed with a length code; a code of
//! `0xFF` marks a maximal 254-byte run that continues without an implicit
//! zero.
//!
//! ## Encoding
//!
//! [`Encoder`] writes a complete delimited frame
//! (`0x00 | encoded | 0x00`) into a caller-provided buffer. Appends are
//! incremental, so the packet layer can stream header, payload, and trailing
//! CRC from three separate sources without staging their concatenation
//! anywhere.
//!
//! ## Decoding
//!
//! [`Decoder`] consumes encoded bytes as they arrive and emits decoded bytes
//! into a fixed destination buffer. It reports a complete frame when the
//! terminating delimiter is seen, asks for more input otherwise, and fails if
//! the destination would overflow or a delimiter arrives in the middle of an
//! encoded block. Delimiters in front of any frame content are treated as
//! inter-frame padding and skipped, so the decoder resynchronizes on a lossy
//! link.

use crate::consts::FRAME_DELIMITER;
use thiserror::Error;

/// Longest run of non-zero bytes one COBS code byte can describe.
const MAX_BLOCK: u8 = 0xFF;

/// Errors produced while encoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum EncodeError {
    /// The encoded frame does not fit the destination buffer.
    #[error("encoded frame does not fit the destination buffer")]
    Overflow,
}

/// Errors produced while decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DecodeError {
    /// The decoded frame does not fit the destination buffer.
    #[error("decoded frame does not fit the destination buffer")]
    Overflow,
    /// A delimiter arrived inside an encoded block; the frame was cut short.
    #[error("delimiter inside an encoded block")]
    Truncated,
}

/// Outcome of feeding encoded bytes to a [`Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FeedStatus {
    /// All input was consumed without reaching a terminating delimiter.
    Incomplete,
    /// A full frame was decoded; the value is its decoded length in bytes.
    Complete(usize),
}

/// Streaming COBS encoder producing one delimited frame.
///
/// # Examples
///
/// ```
/// use sensorlink::cobs::Encoder;
///
/// let mut buf = [0u8; 16];
/// let mut enc = Encoder::new(&mut buf);
/// enc.push(&[0x11, 0x22, 0x00, 0x33]).unwrap();
/// let len = enc.finish().unwrap();
///
/// assert_eq!(&buf[..len], &[0x00, 0x03, 0x11, 0x22, 0x02, 0x33, 0x00]);
/// ```
#[derive(Debug)]
pub struct Encoder<'a> {
    buf: &'a mut [u8],
    /// Index of the code byte of the block currently being filled.
    code_idx: usize,
    /// Next free slot.
    cursor: usize,
    code: u8,
    /// A maximal block was just closed; the next data byte opens a new one.
    full_block: bool,
}

impl<'a> Encoder<'a> {
    /// Starts a frame at the beginning of `buf`.
    ///
    /// Nothing is written until [`push`](Self::push) or
    /// [`finish`](Self::finish); a buffer too small for the frame surfaces as
    /// [`EncodeError::Overflow`] from those calls.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            code_idx: 1,
            cursor: 2,
            code: 1,
            full_block: false,
        }
    }

    /// Appends `data` to the frame body.
    ///
    /// May be called any number of times; the bytes are encoded as one
    /// contiguous string regardless of how they were split across calls.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Overflow`] if the encoded form outgrows the buffer. The
    /// encoder is then spent and the frame must be abandoned.
    pub fn push(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        for &byte in data {
            if self.full_block {
                self.open_block()?;
            }
            if byte == FRAME_DELIMITER {
                self.put(self.code_idx, self.code)?;
                self.open_block()?;
            } else {
                self.put(self.cursor, byte)?;
                self.cursor += 1;
                self.code += 1;
                if self.code == MAX_BLOCK {
                    self.put(self.code_idx, MAX_BLOCK)?;
                    self.full_block = true;
                }
            }
        }
        Ok(())
    }

    /// Closes the frame: writes both delimiters and the final code byte.
    ///
    /// # Returns
    ///
    /// The total frame length, delimiters included.
    pub fn finish(mut self) -> Result<usize, EncodeError> {
        self.put(0, FRAME_DELIMITER)?;
        if !self.full_block {
            self.put(self.code_idx, self.code)?;
        }
        self.put(self.cursor, FRAME_DELIMITER)?;
        Ok(self.cursor + 1)
    }

    fn open_block(&mut self) -> Result<(), EncodeError> {
        if self.cursor >= self.buf.len() {
            return Err(EncodeError::Overflow);
        }
        self.code_idx = self.cursor;
        self.cursor += 1;
        self.code = 1;
        self.full_block = false;
        Ok(())
    }

    fn put(&mut self, index: usize, byte: u8) -> Result<(), EncodeError> {
        if index >= self.buf.len() {
            return Err(EncodeError::Overflow);
        }
        self.buf[index] = byte;
        Ok(())
    }
}

/// Streaming COBS decoder reassembling one frame into a fixed buffer.
///
/// # Examples
///
/// ```
/// use sensorlink::cobs::{Decoder, FeedStatus};
///
/// let mut out = [0u8; 16];
/// let mut dec = Decoder::new(&mut out);
/// let status = dec.feed(&[0x00, 0x03, 0x11, 0x22, 0x02, 0x33, 0x00]).unwrap();
///
/// assert_eq!(status, FeedStatus::Complete(4));
/// assert_eq!(&out[..4], &[0x11, 0x22, 0x00, 0x33]);
/// ```
#[derive(Debug)]
pub struct Decoder<'a> {
    dst: &'a mut [u8],
    pos: usize,
    /// Data bytes still expected in the current block (0 = expecting a code).
    remaining: u8,
    /// Code of the last closed block, for the implicit-zero decision.
    last_code: u8,
    /// A code byte has been seen; delimiters are terminators from here on.
    started: bool,
    done: bool,
}

impl<'a> Decoder<'a> {
    /// Starts decoding a frame into `dst`.
    pub fn new(dst: &'a mut [u8]) -> Self {
        Self {
            dst,
            pos: 0,
            remaining: 0,
            last_code: 0,
            started: false,
            done: false,
        }
    }

    /// Consumes encoded bytes, in as many chunks as they arrive.
    ///
    /// Input past a terminating delimiter is ignored; feeding a finished
    /// decoder keeps reporting the same completed length.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Overflow`] if `dst` fills up, [`DecodeError::Truncated`]
    /// if a delimiter lands inside an encoded block. Either way the frame is
    /// unusable and the decoder should be dropped.
    pub fn feed(&mut self, src: &[u8]) -> Result<FeedStatus, DecodeError> {
        if self.done {
            return Ok(FeedStatus::Complete(self.pos));
        }
        for &byte in src {
            if self.remaining > 0 {
                if byte == FRAME_DELIMITER {
                    return Err(DecodeError::Truncated);
                }
                self.emit(byte)?;
                self.remaining -= 1;
            } else if byte == FRAME_DELIMITER {
                if self.started {
                    self.done = true;
                    return Ok(FeedStatus::Complete(self.pos));
                }
                // Leading or repeated delimiter between frames.
            } else {
                self.started = true;
                if self.last_code != 0 && self.last_code != MAX_BLOCK {
                    self.emit(FRAME_DELIMITER)?;
                }
                self.last_code = byte;
                self.remaining = byte - 1;
            }
        }
        Ok(FeedStatus::Incomplete)
    }

    fn emit(&mut self, byte: u8) -> Result<(), DecodeError> {
        if self.pos >= self.dst.len() {
            return Err(DecodeError::Overflow);
        }
        self.dst[self.pos] = byte;
        self.pos += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(data: &[u8], buf: &mut [u8]) -> usize {
        let mut enc = Encoder::new(buf);
        enc.push(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_encode_known_frame() {
        let mut buf = [0u8; 16];
        let len = encode(&[0x11, 0x22, 0x00, 0x33], &mut buf);
        assert_eq!(&buf[..len], &[0x00, 0x03, 0x11, 0x22, 0x02, 0x33, 0x00]);
    }

    #[test]
    fn test_encode_empty_body() {
        let mut buf = [0u8; 4];
        let len = encode(&[], &mut buf);
        assert_eq!(&buf[..len], &[0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_only_zeros() {
        let mut buf = [0u8; 8];
        let len = encode(&[0x00, 0x00], &mut buf);
        assert_eq!(&buf[..len], &[0x00, 0x01, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_incremental_append_matches_single_push() {
        let mut split_buf = [0u8; 32];
        let mut enc = Encoder::new(&mut split_buf);
        enc.push(&[0x01, 0x02]).unwrap();
        enc.push(&[]).unwrap();
        enc.push(&[0x00, 0x03]).unwrap();
        let split_len = enc.finish().unwrap();

        let mut whole_buf = [0u8; 32];
        let whole_len = encode(&[0x01, 0x02, 0x00, 0x03], &mut whole_buf);

        assert_eq!(split_buf[..split_len], whole_buf[..whole_len]);
    }

    #[test]
    fn test_encode_overflow_reported() {
        let mut buf = [0u8; 6];
        let mut enc = Encoder::new(&mut buf);
        assert_eq!(enc.push(&[1, 2, 3, 4, 5, 6]), Err(EncodeError::Overflow));

        let mut tight = [0u8; 4];
        let mut enc = Encoder::new(&mut tight);
        enc.push(&[1, 2]).unwrap();
        assert_eq!(enc.finish(), Err(EncodeError::Overflow));
    }

    #[test]
    fn test_round_trip_across_block_boundary() {
        let mut data = [0u8; 300];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = if i % 7 == 0 { 0 } else { (i % 251) as u8 };
        }

        let mut frame = [0u8; 400];
        let mut out = [0u8; 400];
        for len in 0..data.len() {
            let frame_len = encode(&data[..len], &mut frame);
            assert!(
                frame[1..frame_len - 1].iter().all(|&b| b != 0),
                "interior zero at input length {len}"
            );

            let mut dec = Decoder::new(&mut out);
            let status = dec.feed(&frame[..frame_len]).unwrap();
            assert_eq!(status, FeedStatus::Complete(len));
            assert_eq!(&out[..len], &data[..len]);
        }
    }

    #[test]
    fn test_maximal_block_has_no_phantom_zero() {
        // 254 non-zero bytes encode to a single 0xFF block with no implicit
        // zero afterwards; 255 spill into a second block.
        let data = [0x42u8; 255];

        let mut frame = [0u8; 300];
        let len = encode(&data[..254], &mut frame);
        assert_eq!(len, 257);
        assert_eq!(frame[1], 0xFF);

        let mut out = [0u8; 300];
        let mut dec = Decoder::new(&mut out);
        assert_eq!(
            dec.feed(&frame[..len]).unwrap(),
            FeedStatus::Complete(254)
        );
        assert_eq!(&out[..254], &data[..254]);

        let len = encode(&data, &mut frame);
        assert_eq!(len, 259);
        assert_eq!(frame[256], 0x02);

        let mut dec = Decoder::new(&mut out);
        assert_eq!(
            dec.feed(&frame[..len]).unwrap(),
            FeedStatus::Complete(255)
        );
        assert_eq!(&out[..255], &data[..]);
    }

    #[test]
    fn test_decoder_split_feed() {
        let mut frame = [0u8; 16];
        let frame_len = encode(&[0xAA, 0x00, 0xBB], &mut frame);

        let mut out = [0u8; 16];
        let mut dec = Decoder::new(&mut out);
        assert_eq!(
            dec.feed(&frame[..3]).unwrap(),
            FeedStatus::Incomplete
        );
        let status = dec.feed(&frame[3..frame_len]).unwrap();
        assert_eq!(status, FeedStatus::Complete(3));
        assert_eq!(&out[..3], &[0xAA, 0x00, 0xBB]);
    }

    #[test]
    fn test_decoder_skips_leading_delimiters() {
        let mut out = [0u8; 8];
        let mut dec = Decoder::new(&mut out);
        let status = dec.feed(&[0x00, 0x00, 0x02, 0x41, 0x00]).unwrap();
        assert_eq!(status, FeedStatus::Complete(1));
        assert_eq!(out[0], 0x41);
    }

    #[test]
    fn test_lone_delimiter_is_incomplete() {
        let mut out = [0u8; 8];
        let mut dec = Decoder::new(&mut out);
        assert_eq!(dec.feed(&[0x00]).unwrap(), FeedStatus::Incomplete);
    }

    #[test]
    fn test_truncated_block_rejected() {
        let mut out = [0u8; 8];
        let mut dec = Decoder::new(&mut out);
        assert_eq!(
            dec.feed(&[0x05, 0x11, 0x00]),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn test_decode_overflow_reported() {
        let mut frame = [0u8; 16];
        let frame_len = encode(&[1, 2, 3, 4, 5], &mut frame);

        let mut tiny = [0u8; 3];
        let mut dec = Decoder::new(&mut tiny);
        assert_eq!(
            dec.feed(&frame[..frame_len]),
            Err(DecodeError::Overflow)
        );
    }
}
