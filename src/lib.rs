//! **r502-touchpanel** is the firmware core of a touchscreen fingerprint terminal built around
//! the HZ Grow R502 (and similar) fingerprint module.
//!
//! It contains an embedded-hal driver for the module's USART protocol, a scan engine, a
//! two-sample enrollment state machine and the glue that runs them from a cooperative UI loop.
//! Rendering and touch handling belong to the graphics library; this crate only sees them
//! through [`app::Frontend`].
//!
//! Every sensor exchange is bounded and every loop iteration makes at most one unit of
//! progress, so the UI keeps redrawing while a finger is being placed or lifted.
//!
//! ## Example
//!
//! To check whether a finger is on the sensor:
//! ```
//! # use embedded_hal::serial::{Read, Write};
//! use r502_touchpanel::{Sensor, SensorResponse, R502};
//! # struct TestTx;
//! # struct TestRx(usize);
//! #
//! # impl Write<u8> for TestTx {
//! #     type Error = ();
//! #     fn write(&mut self, _word: u8) -> nb::Result<(), Self::Error> {
//! #         return Ok(());
//! #     }
//! #     fn flush(&mut self) -> nb::Result<(), Self::Error> {
//! #         return Ok(());
//! #     }
//! # }
//! #
//! # const RES_DATA: &[u8] = &[ 0xef, 0x01, 0xff, 0xff, 0xff, 0xff, 0x07, 0x00, 0x03, 0x02, 0x00, 0x0c ];
//! #
//! # impl Read<u8> for TestRx {
//! #     type Error = ();
//! #     fn read(&mut self) -> nb::Result<u8, Self::Error> {
//! #         let word = RES_DATA[self.0];
//! #         self.0 += 1;
//! #         return Ok(word);
//! #     }
//! # }
//! # let rx = TestRx(0);
//! # let tx = TestTx;
//!
//! // Obtain tx, rx from some serial port implementation
//! let mut r502 = R502::new(tx, rx, 0xffffffff);
//! match r502.capture() {
//!     SensorResponse::Ok => println!("Image taken"),
//!     SensorResponse::NoFinger => println!("No finger"),
//!     other => println!("Error: {}", other),
//! }
//! ```
//!
//! For host-side programs that talk to a real module, see the `demos` directory.
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod app;
pub mod calibration;
mod commands;
pub mod controller;
mod driver;
pub mod enroll;
pub mod matcher;
mod responses;
pub mod sensor;
pub mod ui;
mod utils;

#[cfg(test)]
mod mock;

pub use crate::commands::Command;
pub use crate::driver::{SensorConfig, R502};
pub use crate::responses::{
    AckResult, PasswordVerificationState, ReadSysParaResult, Reply, SearchResult, SensorResponse,
    SystemParameters, TemplateNumResult, VfyPwdResult,
};
pub use crate::sensor::{Match, Sensor, Slot, TemplateId};
pub use crate::utils::Error;
