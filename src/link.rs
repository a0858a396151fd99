//! Interrupt-handler access to the link half of a [`Transport`].
//!
//! Interrupt handlers cannot capture the [`LinkHalf`] returned by
//! [`Transport::split`], so firmware keeps it in a `critical-section`
//! protected global slot: declare the static with [`global_link_init`],
//! install the half once from `main` with [`global_link_setup`], then call
//! the accessor matching each interrupt source. The critical section only
//! guards the slot itself; the ring cursors underneath stay lock-free, so
//! the main-loop side never contends with these calls.
//!
//! [`Transport`]: crate::transport::Transport
//! [`Transport::split`]: crate::transport::Transport::split

use crate::transport::LinkHalf;
use core::cell::RefCell;
use core::convert::Infallible;
use critical_section::Mutex;

/// Global slot holding the interrupt side of the transport.
pub type GlobalLink = Mutex<RefCell<Option<LinkHalf<'static>>>>;

/// Initializer for the global link slot.
///
/// # Example
/// ```ignore
/// use sensorlink::link::{GlobalLink, global_link_init};
///
/// static LINK: GlobalLink = global_link_init();
/// ```
pub const fn global_link_init() -> GlobalLink {
    Mutex::new(RefCell::new(None))
}

/// Installs the link half produced by splitting a `'static` transport.
///
/// # Example
/// ```ignore
/// fn main() -> ! {
///     let (link, frames) = TRANSPORT.split();
///     global_link_setup(&LINK, link);
///     // hand `frames` to the packet protocol and loop
/// }
/// ```
pub fn global_link_setup(global_link: &'static GlobalLink, half: LinkHalf<'static>) {
    critical_section::with(|cs| {
        let _ = global_link.borrow(cs).replace(Some(half));
    });
}

/// Stores one received byte, to be called from the UART receive interrupt.
///
/// # Returns
///
/// `false` when the byte was dropped, either because the inbound ring is
/// full or because no link half is installed yet. Drops are silent by
/// contract; the damaged frame is discarded at CRC check time.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn USART2() {
///     if let Some(byte) = read_data_register() {
///         let _ = global_link_rx_byte(&LINK, byte);
///     }
/// }
/// ```
pub fn global_link_rx_byte(global_link: &'static GlobalLink, byte: u8) -> bool {
    critical_section::with(|cs| {
        match global_link.borrow(cs).borrow_mut().as_mut() {
            Some(link) => link.rx_byte(byte),
            None => false,
        }
    })
}

/// Refills a transmit buffer from the outbound ring, e.g. on DMA complete.
///
/// # Returns
///
/// The number of bytes copied into `out`; zero when nothing is pending or no
/// link half is installed.
pub fn global_link_tx_drain(global_link: &'static GlobalLink, out: &mut [u8]) -> usize {
    critical_section::with(|cs| {
        match global_link.borrow(cs).borrow_mut().as_mut() {
            Some(link) => link.tx_drain(out),
            None => 0,
        }
    })
}

/// Takes the next outbound byte, for TX-empty interrupt handlers.
///
/// # Errors
///
/// [`nb::Error::WouldBlock`] when the outbound ring is empty or no link half
/// is installed.
pub fn global_link_tx_next(global_link: &'static GlobalLink) -> nb::Result<u8, Infallible> {
    critical_section::with(|cs| {
        match global_link.borrow(cs).borrow_mut().as_mut() {
            Some(link) => link.tx_next(),
            None => Err(nb::Error::WouldBlock),
        }
    })
}
