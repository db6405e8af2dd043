//! Single-shot identification against the sensor library.

use log::{debug, info, warn};

use crate::sensor::{Match, Sensor, SensorResponse, Slot};

/// What one scan tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanOutcome {
    NoFinger,
    /// A capture, conversion or search failure. Scanning continues.
    Failed(SensorResponse),
    NoMatch,
    Matched(Match),
}

/// Runs capture, convert and search once. Every step stops at the first
/// failure; nothing here ends scanning mode.
pub fn scan_once<S: Sensor>(sensor: &mut S) -> ScanOutcome {
    match sensor.capture() {
        SensorResponse::Ok => debug!("image taken"),
        SensorResponse::NoFinger => return ScanOutcome::NoFinger,
        failure => {
            warn!("capture failed: {}", failure);
            return ScanOutcome::Failed(failure);
        }
    }

    match sensor.convert_to_template(Slot::One) {
        SensorResponse::Ok => debug!("image converted"),
        failure => {
            warn!("conversion failed: {}", failure);
            return ScanOutcome::Failed(failure);
        }
    }

    match sensor.search() {
        Ok(found) => {
            info!("found ID #{} with confidence of {}", found.id, found.confidence);
            ScanOutcome::Matched(found)
        }
        Err(SensorResponse::NotFound) => {
            info!("did not find a match");
            ScanOutcome::NoMatch
        }
        Err(failure) => {
            warn!("search failed: {}", failure);
            ScanOutcome::Failed(failure)
        }
    }
}
