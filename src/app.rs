//! Startup and the cooperative scheduler loop.
//!
//! Each iteration reads the pointer once, applies at most one command, runs
//! one engine tick, updates the label and flushes the display. Nothing inside
//! an iteration waits on the user.

use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayMs;
use log::{error, info, warn};

use crate::calibration::{self, CalibrationData, CalibrationStore};
use crate::controller::{Controller, ModeKind};
use crate::sensor::{Sensor, SensorResponse};
use crate::ui::{self, Line, UiCommand};
use crate::utils::Error;

/// Graphics library side of the firmware: pointer input, label and button
/// state, frame buffer.
pub trait Frontend {
    type Error: Debug;

    /// Reads the pointer once. Returns the command a completed gesture maps
    /// to, if any.
    fn poll(&mut self) -> Option<UiCommand<'_>>;

    /// Sets the status label and shows the controls that belong to `mode`.
    fn show(&mut self, line: &str, mode: ModeKind);

    /// Pushes pending pixel regions to the panel.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Runs the interactive touch calibration.
    fn calibrate(&mut self) -> CalibrationData;

    fn set_calibration(&mut self, data: &CalibrationData);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    /// Pause between loop iterations.
    pub tick_ms: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { tick_ms: 5 }
    }
}

#[derive(Debug)]
pub struct App<S, F> {
    controller: Controller<S>,
    frontend: F,
    config: AppConfig,
    shown: Option<(Line, ModeKind)>,
}

impl<S, F> App<S, F>
where
    S: Sensor,
    F: Frontend,
{
    /// Finds the sensor, reports what it holds and applies touch calibration.
    /// A sensor that fails the handshake is fatal.
    pub fn start<C: CalibrationStore>(
        mut sensor: S,
        mut frontend: F,
        store: &mut C,
        config: AppConfig,
    ) -> Result<Self, Error> {
        match sensor.verify_password() {
            SensorResponse::Ok => info!("found fingerprint sensor"),
            response => {
                error!("did not find fingerprint sensor: {}", response);
                return Err(Error::SensorNotFound);
            }
        }

        if let Some(params) = sensor.system_parameters() {
            info!(
                "status {:#06x}, sys id {:#06x}, capacity {}, security level {}, address {:#010x}, packet size code {}, baud {}",
                params.status_register,
                params.system_identifier_code,
                params.finger_library_size,
                params.security_level,
                params.device_address,
                params.packet_size,
                params.baud_rate(),
            );
        }

        match sensor.template_count() {
            Ok(0) => info!("sensor doesn't contain any fingerprint data, enroll a finger first"),
            Ok(count) => info!("sensor contains {} templates", count),
            Err(response) => warn!("could not read template count: {}", response),
        }

        let data = calibration::load_or_calibrate(store, || frontend.calibrate());
        frontend.set_calibration(&data);

        Ok(Self {
            controller: Controller::new(sensor),
            frontend,
            config,
            shown: None,
        })
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// One loop iteration. Only a display failure is returned; refused
    /// commands are logged and dropped.
    pub fn tick(&mut self) -> Result<(), Error> {
        if let Some(cmd) = self.frontend.poll() {
            if let Err(e) = self.controller.dispatch(cmd) {
                warn!("command ignored: {}", e);
            }
        }

        let line = ui::render(self.controller.tick());
        let mode = self.controller.mode();
        let unchanged = match &self.shown {
            Some((shown, shown_mode)) => shown.as_str() == line.as_str() && *shown_mode == mode,
            None => false,
        };
        if !unchanged {
            self.frontend.show(&line, mode);
            self.shown = Some((line, mode));
        }

        self.frontend.flush().map_err(|e| {
            error!("display flush failed: {:?}", e);
            Error::Display
        })
    }

    /// Runs until the display fails.
    pub fn run<D: DelayMs<u8>>(&mut self, delay: &mut D) -> Error {
        loop {
            if let Err(e) = self.tick() {
                return e;
            }
            delay.delay_ms(self.config.tick_ms);
        }
    }
}
