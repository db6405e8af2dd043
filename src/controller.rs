//! Session context owned by the scheduler loop.

use log::{info, warn};

use crate::enroll::Enroller;
use crate::matcher::scan_once;
use crate::sensor::Sensor;
use crate::ui::{self, Status, UiCommand};
use crate::utils::Error;

/// Which engine receives ticks. Holding the enroller inside the variant keeps
/// scanning and enrollment mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Scanning,
    Enrolling(Enroller),
}

/// Field-free view of [`Mode`], handed to the frontend to pick visible controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeKind {
    Idle,
    Scanning,
    Enrolling,
}

#[derive(Debug)]
pub struct Controller<S> {
    sensor: S,
    mode: Mode,
    status: Status,
}

impl<S: Sensor> Controller<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor, mode: Mode::Idle, status: Status::Ready }
    }

    pub fn mode(&self) -> ModeKind {
        match self.mode {
            Mode::Idle => ModeKind::Idle,
            Mode::Scanning => ModeKind::Scanning,
            Mode::Enrolling(_) => ModeKind::Enrolling,
        }
    }

    pub fn enroller(&self) -> Option<&Enroller> {
        match &self.mode {
            Mode::Enrolling(enroller) => Some(enroller),
            _ => None,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn release(self) -> S {
        self.sensor
    }

    /// Applies a UI command. Commands that do not belong to the current mode
    /// are refused with [`Error::InvalidState`] and change nothing.
    pub fn dispatch(&mut self, cmd: UiCommand<'_>) -> Result<(), Error> {
        match (cmd, &mut self.mode) {
            (UiCommand::StartScan, Mode::Idle) => {
                info!("scanning");
                self.mode = Mode::Scanning;
                self.status = Status::ScanStarted;
            }
            (UiCommand::StopScan, Mode::Scanning) => {
                info!("scanning stopped");
                self.mode = Mode::Idle;
                self.status = Status::ReturnedToMenu;
            }
            (UiCommand::StartEnroll, Mode::Idle) => {
                let mut enroller = Enroller::new();
                self.status = Status::Enroll(enroller.begin()?);
                self.mode = Mode::Enrolling(enroller);
            }
            (UiCommand::CancelEnroll, Mode::Enrolling(enroller)) => {
                enroller.reset();
                self.mode = Mode::Idle;
                self.status = Status::ReturnedToMenu;
            }
            (UiCommand::SubmitId(text), Mode::Enrolling(enroller)) => {
                self.status = Status::Enroll(enroller.submit_id(ui::parse_id(text))?);
            }
            (cmd, _) => {
                warn!("{:?} refused while {:?}", cmd, self.mode());
                return Err(Error::InvalidState);
            }
        }
        Ok(())
    }

    /// One unit of progress for whichever engine is active.
    pub fn tick(&mut self) -> &Status {
        match &mut self.mode {
            Mode::Idle => {}
            Mode::Scanning => self.status = Status::Scan(scan_once(&mut self.sensor)),
            Mode::Enrolling(enroller) => self.status = Status::Enroll(enroller.poll(&mut self.sensor)),
        }
        &self.status
    }
}
