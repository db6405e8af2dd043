//! Persisted touch calibration.
//!
//! The blob is opaque here; only the touch driver knows its layout.

use core::fmt::Debug;
use log::{info, warn};

pub const CALIBRATION_LEN: usize = 14;

pub type CalibrationData = [u8; CALIBRATION_LEN];

/// Small persistent storage for the calibration blob.
pub trait CalibrationStore {
    type Error: Debug;

    /// Returns `Ok(None)` when no complete blob is stored.
    fn load(&mut self) -> Result<Option<CalibrationData>, Self::Error>;

    fn save(&mut self, data: &CalibrationData) -> Result<(), Self::Error>;
}

/// Reads the stored calibration, or runs `calibrate` and stores its result
/// when nothing usable is there. A failed save is logged and the fresh data is
/// still returned.
pub fn load_or_calibrate<C, F>(store: &mut C, calibrate: F) -> CalibrationData
where
    C: CalibrationStore,
    F: FnOnce() -> CalibrationData,
{
    match store.load() {
        Ok(Some(data)) => {
            info!("using stored touch calibration");
            return data;
        }
        Ok(None) => info!("no touch calibration stored"),
        Err(e) => warn!("reading touch calibration failed: {:?}", e),
    }

    let data = calibrate();
    if let Err(e) = store.save(&data) {
        warn!("storing touch calibration failed: {:?}", e);
    }
    data
}
