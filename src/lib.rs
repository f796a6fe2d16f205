//! DHT Sensor Family Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the single-wire
//! temperature and humidity sensors of the DHT family (DHT11, DHT12,
//! DHT22/AM2302, AM2301, SI7021 adapters) and the MS01 soil moisture probe,
//! built on top of the [`embedded-hal`] traits.
//!
//! The sensor answers a start pulse with 40 bits whose value is encoded in
//! the length of each high phase. The driver times every phase with
//! interrupts disabled, then decodes each byte against a threshold derived
//! from that byte's own low phases, so sensors with a slow or fast clock
//! still decode correctly.
//!
//! # Features
//! - Blocking synchronous API using `embedded-hal` traits
//! - Designed for `no_std` environments
//! - Adaptive bit decoding and rollover checksum validation
//! - Per-model start pulse and conversion formula
//! - An ITG3205 gyroscope driver with sample averaging
//!
//! # Dependencies
//! This driver depends on the following `embedded-hal` traits:
//! - [`InputPin`] and [`OutputPin`] for GPIO access
//! - [`DelayNs`] for accurate timing
//! - [`I2c`] for the gyroscope
//!
//! It also needs a microsecond [`Clock`] and a [`critical-section`]
//! implementation for the target, usually provided by the HAL.
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and logs through `defmt`
//! - `log`: Logs through the `log` facade
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`critical-section`]: https://docs.rs/critical-section
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`I2c`]: embedded_hal::i2c::I2c

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod capture;
pub mod decode;
pub mod dht;
pub mod error;
pub mod frame;
pub mod gyro;
pub mod model;

#[cfg(test)]
mod sim;

pub use capture::Clock;
pub use dht::{Dht, Reading};
pub use error::{DhtError, UnknownModel};
pub use frame::RawFrame;
pub use gyro::{AveragingGyro, Axes, GyroConfig, Itg3205};
pub use model::{Formula, SensorModel};
