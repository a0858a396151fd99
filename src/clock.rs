//! Monotonic millisecond time source used for dwell and timeout accounting.
//!
//! The transport core never reads a hardware timer directly. Everything that
//! needs wall-clock progress (sensor dwell times, bus transaction timeouts)
//! takes a [`Monotonic`] collaborator, typically a thin handle over a 1 ms
//! SysTick counter. Differences are always taken with [`elapsed_ms`] so that
//! counter wraparound (every ~49.7 days at 1 ms resolution) is harmless.

/// A free-running millisecond counter.
///
/// Implementations are expected to be cheap to call and monotonic modulo
/// `u32` wraparound. A shared reference is enough; implementors backed by a
/// hardware counter or an atomic need no interior mutability beyond that.
pub trait Monotonic {
    /// Returns the number of milliseconds elapsed since an arbitrary epoch,
    /// wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed between two [`Monotonic::now_ms`] readings.
///
/// `newer` is a reading taken after `older`. The result is exact under
/// wraparound: `newer - older mod 2^32`.
///
/// # Examples
///
/// ```
/// use sensorlink::clock::elapsed_ms;
///
/// assert_eq!(elapsed_ms(1000, 250), 750);
/// assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
/// ```
pub fn elapsed_ms(newer: u32, older: u32) -> u32 {
    newer.wrapping_sub(older)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_simple() {
        assert_eq!(elapsed_ms(100, 40), 60);
        assert_eq!(elapsed_ms(40, 40), 0);
    }

    #[test]
    fn test_elapsed_wraparound() {
        assert_eq!(elapsed_ms(5, 0xFFFF_FFFB), 10);
        assert_eq!(elapsed_ms(0, u32::MAX), 1);
    }

    #[test]
    fn test_monotonic_by_reference() {
        struct Fixed(u32);

        impl Monotonic for Fixed {
            fn now_ms(&self) -> u32 {
                self.0
            }
        }

        let clock = Fixed(1234);
        let by_ref: &Fixed = &clock;
        assert_eq!(by_ref.now_ms(), 1234);
    }
}
