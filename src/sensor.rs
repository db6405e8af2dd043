//! The typed operations the engines need from a fingerprint sensor.
//!
//! [`R502`](crate::R502) implements [`Sensor`] over a serial link. The engines
//! only ever see this trait, so every call is one request/response exchange
//! and never retries on its own.

use core::fmt;

pub use crate::responses::{SensorResponse, SystemParameters};

/// One of the two character buffers on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    /// Buffer id as sent on the wire.
    pub fn buffer(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

/// Identity of a stored template.
///
/// IDs chosen by the user are limited to `1..=127`. IDs reported back by a
/// search are whatever library page the sensor matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemplateId(u16);

impl TemplateId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 127;

    /// Validates a user supplied ID.
    pub fn new(id: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Some(TemplateId(id))
        } else {
            None
        }
    }

    pub(crate) fn from_page(page: u16) -> Self {
        TemplateId(page)
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A positive search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Match {
    pub id: TemplateId,
    pub confidence: u16,
}

/// Blocking, bounded operations against a fingerprint sensor.
///
/// Timeouts and malformed replies are reported as
/// [`SensorResponse::PacketError`].
pub trait Sensor {
    /// Password handshake, used once at startup to find the sensor.
    fn verify_password(&mut self) -> SensorResponse;

    /// Takes an image into the sensor's image buffer.
    fn capture(&mut self) -> SensorResponse;

    /// Extracts features of the last image into `slot`.
    fn convert_to_template(&mut self, slot: Slot) -> SensorResponse;

    /// Searches the library with the template in slot 1. Never returns
    /// `Err(SensorResponse::Ok)`.
    fn search(&mut self) -> Result<Match, SensorResponse>;

    /// Merges both slots into one template.
    fn merge_templates(&mut self) -> SensorResponse;

    /// Writes the merged template to the library under `id`, replacing
    /// whatever was stored there.
    fn store(&mut self, id: TemplateId) -> SensorResponse;

    /// Number of templates in the library.
    fn template_count(&mut self) -> Result<u16, SensorResponse>;

    fn system_parameters(&mut self) -> Option<SystemParameters> {
        None
    }
}

impl<S: Sensor + ?Sized> Sensor for &mut S {
    fn verify_password(&mut self) -> SensorResponse {
        (**self).verify_password()
    }

    fn capture(&mut self) -> SensorResponse {
        (**self).capture()
    }

    fn convert_to_template(&mut self, slot: Slot) -> SensorResponse {
        (**self).convert_to_template(slot)
    }

    fn search(&mut self) -> Result<Match, SensorResponse> {
        (**self).search()
    }

    fn merge_templates(&mut self) -> SensorResponse {
        (**self).merge_templates()
    }

    fn store(&mut self, id: TemplateId) -> SensorResponse {
        (**self).store(id)
    }

    fn template_count(&mut self) -> Result<u16, SensorResponse> {
        (**self).template_count()
    }

    fn system_parameters(&mut self) -> Option<SystemParameters> {
        (**self).system_parameters()
    }
}
