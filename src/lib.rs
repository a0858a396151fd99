//! # sensorlink
//!
//! A portable, no_std transport and acquisition core for a serially linked
//! environmental sensor node, built around an HTU21D temperature/humidity
//! sensor and a COBS-framed, CRC-protected packet link.
//!
//! The crate implements:
//! - lock-free single-producer single-consumer byte rings bridging the
//!   receive/transmit interrupts and the cooperative main loop
//! - an incremental COBS frame codec with zero-byte delimiters
//! - a versioned packet protocol with CRC-32 validation (measurements,
//!   health, events outbound; no-op and reset inbound)
//! - a polled HTU21D acquisition state machine over `embedded-hal` I2C
//! - a bounded-time two-wire transaction engine so a wedged bus degrades
//!   into a failed cycle instead of a hung loop
//!
//! ## Crate features
//! | Feature              | Description |
//! |----------------------|-------------|
//! | `std`                | Disables `#![no_std]` for hosted builds and tests |
//! | `link-isr` (default) | `critical-section` guarded global link half for ISR use |
//! | `defmt-0-3`          | Adds `defmt::Format` derives to public types |
//! | `log`                | Emits `log` records when inbound frames are discarded |
//!
//! ## Usage
//!
//! The main loop owns the packet side; interrupts own the link side:
//!
//! ```rust
//! use sensorlink::packet::{Measurements, Protocol, SystemReset};
//! use sensorlink::transport::Transport;
//!
//! struct Reboot;
//!
//! impl SystemReset for Reboot {
//!     fn system_reset(&mut self) -> ! {
//!         panic!("jump to the resident bootloader");
//!     }
//! }
//!
//! let mut transport = Transport::new();
//! let (mut link, frames) = transport.split();
//! let mut protocol = Protocol::new(frames, Reboot);
//!
//! // One completed acquisition goes out as a delimited frame.
//! assert!(protocol.send_measurements(&Measurements {
//!     temperature: 2250,
//!     relative_humidity: 4700,
//! }));
//!
//! let mut wire = [0u8; 64];
//! let n = link.tx_drain(&mut wire);
//! assert!(n > 0);
//!
//! // Each main-loop turn also dispatches whatever the far side sent; the
//! // receive interrupt feeds it in with `link.rx_byte(byte)`.
//! protocol.poll_inbound();
//! ```
//!
//! With the `link-isr` feature the link half lives in a `critical-section`
//! protected global so interrupt handlers can reach it:
//!
//! ```rust,ignore
//! static LINK: sensorlink::link::GlobalLink = sensorlink::link::global_link_init();
//!
//! #[interrupt]
//! fn USART1() {
//!     let _ = sensorlink::link::global_link_rx_byte(&LINK, read_data_register());
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - [`transport::Transport`] must outlive both halves; park it in a
//!   `static` (or leak it) before installing the link half for ISRs
//! - Poll [`bridge::SensorBridge`] (or [`packet::Protocol`] and
//!   [`htu21d::Htu21d`] separately) as fast as the loop spins; all dwell
//!   and timeout logic is internal
//! - A RESET packet diverges into [`packet::SystemReset`]; install a
//!   handler that really does not return
//!
//! ## Status
//!
//! Core protocol and acquisition paths are complete and covered by hosted
//! tests.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "link-isr")]
pub use critical_section;

pub mod bridge;
pub mod bus;
pub mod clock;
pub mod cobs;
pub mod consts;
pub mod crc;
pub mod htu21d;
#[cfg(feature = "link-isr")]
pub mod link;
pub mod packet;
pub mod ring;
pub mod transport;
