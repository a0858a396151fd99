//! Lock-free single-producer/single-consumer byte ring buffer.
//!
//! One [`RingBuffer`] is shared between exactly two execution contexts: a
//! producer (typically a receive interrupt) and a consumer (typically the
//! cooperative main loop). [`RingBuffer::split`] hands out one [`Producer`]
//! and one [`Consumer`] handle, so the single-writer/single-reader discipline
//! is enforced by ownership rather than by convention.
//!
//! ## Memory model
//!
//! Each cursor is written by exactly one side. The producer publishes new
//! bytes with a release store of the write cursor after filling slots; the
//! consumer observes them with an acquire load, and frees slots with a
//! release store of the read cursor. No mutual exclusion is involved, so the
//! producer side is safe to call from an interrupt handler that must never
//! block.
//!
//! ## Capacity
//!
//! One slot is sacrificed to tell a full buffer from an empty one, so a
//! `RingBuffer<N>` holds at most `N - 1` bytes. All operations return short
//! counts instead of errors; a zero return from [`Producer::write`] means the
//! buffer was full.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity circular byte queue safe across one interrupt context and
/// one cooperative-loop context.
///
/// # Examples
///
/// ```
/// use sensorlink::ring::RingBuffer;
///
/// let mut ring = RingBuffer::<16>::new();
/// let (mut tx, mut rx) = ring.split();
///
/// assert_eq!(tx.write(b"abc"), 3);
///
/// let mut out = [0u8; 8];
/// assert_eq!(rx.read(&mut out), 3);
/// assert_eq!(&out[..3], b"abc");
/// ```
pub struct RingBuffer<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    read: AtomicUsize,
    write: AtomicUsize,
}

// Slots between the cursors are touched by exactly one side at a time; the
// split handles keep it that way.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    /// Creates an empty ring. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; N]),
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        }
    }

    /// Splits the ring into its producer and consumer halves.
    ///
    /// The exclusive borrow guarantees no other handles exist; both halves
    /// borrow the ring for the same lifetime and may move to different
    /// execution contexts.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let ring = &*self;
        (Producer { ring }, Consumer { ring })
    }

    fn slot_write(&self, index: usize, byte: u8) {
        let base = self.buf.get().cast::<u8>();
        unsafe { base.add(index).write(byte) };
    }

    fn slot_read(&self, index: usize) -> u8 {
        let base = self.buf.get().cast::<u8>();
        unsafe { base.add(index).read() }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for RingBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N.saturating_sub(1))
            .field("read", &self.read.load(Ordering::Relaxed))
            .field("write", &self.write.load(Ordering::Relaxed))
            .finish()
    }
}

/// Writing half of a [`RingBuffer`]. Exactly one exists per ring.
#[derive(Debug)]
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Appends as many bytes of `data` as fit before the buffer would become
    /// full.
    ///
    /// # Returns
    ///
    /// The number of bytes actually stored; a short count signals saturation.
    /// Never blocks, never errors.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let ring = self.ring;
        let mut w = ring.write.load(Ordering::Relaxed);
        let r = ring.read.load(Ordering::Acquire);

        let mut written = 0;
        for &byte in data {
            let next = (w + 1) % N;
            if next == r {
                break;
            }
            ring.slot_write(w, byte);
            w = next;
            written += 1;
        }

        ring.write.store(w, Ordering::Release);
        written
    }

    /// Number of bytes the ring can currently accept without dropping.
    ///
    /// Only a lower bound from the producer's point of view: the consumer may
    /// free more space at any moment, never less.
    pub fn free(&self) -> usize {
        let ring = self.ring;
        let w = ring.write.load(Ordering::Relaxed);
        let r = ring.read.load(Ordering::Acquire);
        let used = (w + N - r) % N;
        N - 1 - used
    }
}

/// Reading half of a [`RingBuffer`]. Exactly one exists per ring.
#[derive(Debug)]
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Copies up to `out.len()` readable bytes without consuming them.
    pub fn peek(&mut self, out: &mut [u8]) -> usize {
        self.copy_out(out, false)
    }

    /// Copies up to `out.len()` readable bytes and consumes them.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        self.copy_out(out, true)
    }

    /// Reads bytes one at a time until `out` is full, the ring runs dry, or a
    /// byte equal to `delimiter` has been copied.
    ///
    /// The delimiter byte is included in the output and in the returned
    /// count, so a caller draining delimited frames sees exactly one frame
    /// candidate (or a partial one, if the ring held no delimiter) per call.
    pub fn read_until(&mut self, out: &mut [u8], delimiter: u8) -> usize {
        let ring = self.ring;
        let mut r = ring.read.load(Ordering::Relaxed);
        let w = ring.write.load(Ordering::Acquire);

        let mut copied = 0;
        for slot in out.iter_mut() {
            if r == w {
                break;
            }
            let byte = ring.slot_read(r);
            r = (r + 1) % N;
            *slot = byte;
            copied += 1;
            if byte == delimiter {
                break;
            }
        }

        ring.read.store(r, Ordering::Release);
        copied
    }

    fn copy_out(&mut self, out: &mut [u8], advance: bool) -> usize {
        let ring = self.ring;
        let mut r = ring.read.load(Ordering::Relaxed);
        let w = ring.write.load(Ordering::Acquire);

        let mut copied = 0;
        for slot in out.iter_mut() {
            if r == w {
                break;
            }
            *slot = ring.slot_read(r);
            r = (r + 1) % N;
            copied += 1;
        }

        if advance {
            ring.read.store(r, Ordering::Release);
        }
        copied
    }
}
