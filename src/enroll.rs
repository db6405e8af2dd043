//! Two-sample enrollment, advanced one sensor call per tick.
//!
//! ```text
//! Idle -> AwaitingId -> AwaitingFirstFinger -> FirstCaptured
//!      -> AwaitingFingerRemoval -> AwaitingSecondFinger -> SecondCaptured
//!      -> Merging -> Storing -> Success
//! ```
//!
//! Any failure after the ID is accepted ends in `Failed` and drops the
//! session together with both slots. `Success` and `Failed` stay put until
//! [`Enroller::reset`].

use core::mem;

use log::{debug, error, info, warn};

use crate::sensor::{Sensor, SensorResponse, Slot, TemplateId};
use crate::utils::Error;

/// Externally visible phase of the enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    AwaitingId,
    /// Polling for the first finger placement.
    AwaitingFirstFinger,
    /// First image taken, conversion into slot 1 is next.
    FirstCaptured,
    /// Polling until the finger is lifted.
    AwaitingFingerRemoval,
    /// Polling for the second finger placement.
    AwaitingSecondFinger,
    /// Second image taken, conversion into slot 2 is next.
    SecondCaptured,
    Merging,
    Storing,
    Success,
    Failed,
}

/// Which of the two placements a prompt refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sample {
    First,
    Second,
}

/// Why an enrollment ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failure {
    Capture(Sample, SensorResponse),
    Convert(Sample, SensorResponse),
    Merge(SensorResponse),
    Store(SensorResponse),
}

impl Failure {
    pub fn reason(&self) -> SensorResponse {
        match self {
            Failure::Capture(_, reason)
            | Failure::Convert(_, reason)
            | Failure::Merge(reason)
            | Failure::Store(reason) => *reason,
        }
    }
}

/// Prompt-level status after a tick or a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnrollStatus {
    Idle,
    PromptId,
    InvalidId,
    PlaceFinger { id: TemplateId, sample: Sample },
    /// Capture hit a transient imaging error; the same placement is retried.
    CaptureRetry { id: TemplateId, sample: Sample, reason: SensorResponse },
    ImageTaken { id: TemplateId, sample: Sample },
    RemoveFinger { id: TemplateId },
    Merging { id: TemplateId },
    Storing { id: TemplateId },
    Enrolled(TemplateId),
    Failed(Failure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AwaitFinger(Sample),
    Convert(Sample),
    AwaitRemoval,
    Merge,
    Store,
}

/// State of an enrollment in progress. Only exists between an accepted ID and
/// a terminal phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSession {
    id: TemplateId,
    step: Step,
    first_slot: bool,
    second_slot: bool,
}

impl EnrollmentSession {
    fn new(id: TemplateId) -> Self {
        Self {
            id,
            step: Step::AwaitFinger(Sample::First),
            first_slot: false,
            second_slot: false,
        }
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        match self.step {
            Step::AwaitFinger(Sample::First) => Phase::AwaitingFirstFinger,
            Step::Convert(Sample::First) => Phase::FirstCaptured,
            Step::AwaitRemoval => Phase::AwaitingFingerRemoval,
            Step::AwaitFinger(Sample::Second) => Phase::AwaitingSecondFinger,
            Step::Convert(Sample::Second) => Phase::SecondCaptured,
            Step::Merge => Phase::Merging,
            Step::Store => Phase::Storing,
        }
    }

    /// Whether `slot` holds a converted template from this session.
    pub fn holds(&self, slot: Slot) -> bool {
        match slot {
            Slot::One => self.first_slot,
            Slot::Two => self.second_slot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    AwaitingId,
    Active(EnrollmentSession),
    Success(TemplateId),
    Failed(Failure),
}

enum Progress {
    Continue(EnrollStatus),
    Fail(Failure),
    Done,
}

/// Drives one enrollment at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enroller {
    state: State,
    status: EnrollStatus,
}

impl Default for Enroller {
    fn default() -> Self {
        Self::new()
    }
}

impl Enroller {
    pub fn new() -> Self {
        Self { state: State::Idle, status: EnrollStatus::Idle }
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Idle => Phase::Idle,
            State::AwaitingId => Phase::AwaitingId,
            State::Active(session) => session.phase(),
            State::Success(_) => Phase::Success,
            State::Failed(_) => Phase::Failed,
        }
    }

    pub fn status(&self) -> EnrollStatus {
        self.status
    }

    pub fn session(&self) -> Option<&EnrollmentSession> {
        match &self.state {
            State::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Success(_) | State::Failed(_))
    }

    /// `Idle -> AwaitingId`. Any other phase must be reset first.
    pub fn begin(&mut self) -> Result<EnrollStatus, Error> {
        if self.state != State::Idle {
            return Err(Error::InvalidState);
        }
        info!("ready to enroll a fingerprint");
        self.state = State::AwaitingId;
        self.status = EnrollStatus::PromptId;
        Ok(self.status)
    }

    /// Accepts the target ID. Anything outside `1..=127` re-prompts and keeps
    /// waiting for an ID.
    pub fn submit_id(&mut self, raw: u16) -> Result<EnrollStatus, Error> {
        if self.state != State::AwaitingId {
            return Err(Error::InvalidState);
        }
        self.status = match TemplateId::new(raw) {
            Some(id) => {
                info!("enrolling ID #{}", id);
                self.state = State::Active(EnrollmentSession::new(id));
                EnrollStatus::PlaceFinger { id, sample: Sample::First }
            }
            None => {
                warn!("rejected enrollment ID {}", raw);
                EnrollStatus::InvalidId
            }
        };
        Ok(self.status)
    }

    /// Returns to `Idle` from any phase. A session still in progress is
    /// discarded and handed back; a request already sent to the sensor
    /// completes on its own and its answer is never looked at.
    pub fn reset(&mut self) -> Option<EnrollmentSession> {
        self.status = EnrollStatus::Idle;
        match mem::replace(&mut self.state, State::Idle) {
            State::Active(session) => {
                info!("enrollment of #{} cancelled in {:?}", session.id, session.phase());
                Some(session)
            }
            _ => None,
        }
    }

    /// Advances by at most one sensor call. Outside an active session this
    /// does nothing and reports the current status.
    pub fn poll<S: Sensor>(&mut self, sensor: &mut S) -> EnrollStatus {
        let session = match &mut self.state {
            State::Active(session) => session,
            _ => return self.status,
        };
        let id = session.id;

        let progress = match session.step {
            Step::AwaitFinger(sample) => match sensor.capture() {
                SensorResponse::Ok => {
                    debug!("image taken");
                    session.step = Step::Convert(sample);
                    Progress::Continue(EnrollStatus::ImageTaken { id, sample })
                }
                SensorResponse::NoFinger => Progress::Continue(EnrollStatus::PlaceFinger { id, sample }),
                SensorResponse::ImageFail => {
                    warn!("imaging error, retrying");
                    Progress::Continue(EnrollStatus::CaptureRetry { id, sample, reason: SensorResponse::ImageFail })
                }
                failure => Progress::Fail(Failure::Capture(sample, failure)),
            },

            Step::Convert(sample) => {
                let slot = match sample {
                    Sample::First => Slot::One,
                    Sample::Second => Slot::Two,
                };
                match sensor.convert_to_template(slot) {
                    SensorResponse::Ok => {
                        debug!("image converted into slot {}", slot.buffer());
                        match sample {
                            Sample::First => {
                                session.first_slot = true;
                                session.step = Step::AwaitRemoval;
                                Progress::Continue(EnrollStatus::RemoveFinger { id })
                            }
                            Sample::Second => {
                                session.second_slot = true;
                                session.step = Step::Merge;
                                Progress::Continue(EnrollStatus::Merging { id })
                            }
                        }
                    }
                    failure => Progress::Fail(Failure::Convert(sample, failure)),
                }
            }

            // Anything but "no finger" means the finger is still down.
            Step::AwaitRemoval => match sensor.capture() {
                SensorResponse::NoFinger => {
                    session.step = Step::AwaitFinger(Sample::Second);
                    Progress::Continue(EnrollStatus::PlaceFinger { id, sample: Sample::Second })
                }
                _ => Progress::Continue(EnrollStatus::RemoveFinger { id }),
            },

            Step::Merge => match sensor.merge_templates() {
                SensorResponse::Ok => {
                    session.step = Step::Store;
                    Progress::Continue(EnrollStatus::Storing { id })
                }
                failure => Progress::Fail(Failure::Merge(failure)),
            },

            Step::Store => match sensor.store(id) {
                SensorResponse::Ok => Progress::Done,
                failure => Progress::Fail(Failure::Store(failure)),
            },
        };

        self.status = match progress {
            Progress::Continue(status) => status,
            Progress::Fail(failure) => {
                error!("enrollment of #{} failed: {:?}", id, failure);
                self.state = State::Failed(failure);
                EnrollStatus::Failed(failure)
            }
            Progress::Done => {
                info!("fingerprint enrolled as #{}", id);
                self.state = State::Success(id);
                EnrollStatus::Enrolled(id)
            }
        };
        self.status
    }
}
