//! Text projection of engine status, and the commands the UI can issue.

use arrayvec::ArrayString;
use core::fmt::{self, Write};
use log::warn;

use crate::enroll::{EnrollStatus, Failure, Sample};
use crate::matcher::ScanOutcome;
use crate::sensor::SensorResponse;

pub const LINE_CAPACITY: usize = 96;

/// One rendered status line.
pub type Line = ArrayString<[u8; LINE_CAPACITY]>;

/// Commands raised by user gestures. These are the only way to switch which
/// engine receives ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand<'a> {
    StartScan,
    StopScan,
    StartEnroll,
    /// Leaves enrollment, whether in progress or finished.
    CancelEnroll,
    /// Raw text from the numeric keyboard.
    SubmitId(&'a str),
}

/// Everything the status label can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    ScanStarted,
    ReturnedToMenu,
    Scan(ScanOutcome),
    Enroll(EnrollStatus),
}

/// Parses keyboard input into a raw ID.
///
/// Accepted: optional surrounding whitespace, an optional leading `+`, then
/// decimal digits only. Anything else, including trailing characters such as
/// `"12abc"`, becomes `0`, which enrollment rejects.
pub fn parse_id(text: &str) -> u16 {
    text.trim().parse::<u16>().unwrap_or(0)
}

/// Renders `status` into a single line.
pub fn render(status: &Status) -> Line {
    let mut line = Line::new();
    if write!(line, "{}", status).is_err() {
        warn!("status line truncated: {:?}", status);
    }
    line
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "Ready"),
            Status::ScanStarted => write!(f, "Scanning..."),
            Status::ReturnedToMenu => write!(f, "Returning to main menu..."),
            Status::Scan(outcome) => write!(f, "{}", outcome),
            Status::Enroll(status) => write!(f, "{}", status),
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::NoFinger => write!(f, "{}", SensorResponse::NoFinger),
            ScanOutcome::NoMatch => write!(f, "{}", SensorResponse::NotFound),
            ScanOutcome::Failed(reason) => write!(f, "{}", reason),
            ScanOutcome::Matched(found) => {
                write!(f, "Fingerprint ID: {} (confidence {})", found.id, found.confidence)
            }
        }
    }
}

impl fmt::Display for EnrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollStatus::Idle => write!(f, "Ready to enroll a fingerprint!"),
            EnrollStatus::PromptId => write!(f, "Type in the ID # (from 1 to 127) to save this finger as"),
            EnrollStatus::InvalidId => write!(f, "Invalid ID, enter a number from 1 to 127"),
            EnrollStatus::PlaceFinger { id, sample: Sample::First } => {
                write!(f, "Waiting for valid finger to enroll as #{}", id)
            }
            EnrollStatus::PlaceFinger { id, sample: Sample::Second } => {
                write!(f, "Place same finger again for #{}", id)
            }
            EnrollStatus::CaptureRetry { reason, .. } => write!(f, "{}, place finger again", reason),
            EnrollStatus::ImageTaken { .. } => write!(f, "Image taken"),
            EnrollStatus::RemoveFinger { .. } => write!(f, "Image converted, remove finger"),
            EnrollStatus::Merging { id } => write!(f, "Creating model for #{}", id),
            EnrollStatus::Storing { id } => write!(f, "Storing model for #{}", id),
            EnrollStatus::Enrolled(id) => write!(f, "Fingerprint enrolled successfully as ID #{}", id),
            EnrollStatus::Failed(failure) => write!(f, "Enrollment failed: {}", failure),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Store(reason) if *reason != SensorResponse::PacketError => {
                write!(f, "Failed to store ({})", reason)
            }
            _ => write!(f, "{}", self.reason()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{Match, TemplateId};

    fn id(raw: u16) -> TemplateId {
        TemplateId::new(raw).unwrap()
    }

    #[test]
    fn parse_id_treats_garbage_as_zero() {
        assert_eq!(parse_id("12"), 12);
        assert_eq!(parse_id(" 127\n"), 127);
        assert_eq!(parse_id(""), 0);
        assert_eq!(parse_id("abc"), 0);
        assert_eq!(parse_id("-4"), 0);
        assert_eq!(parse_id("99999"), 0);
        assert_eq!(parse_id("+12"), 12);
        assert_eq!(parse_id("12abc"), 0);
    }

    #[test]
    fn scan_lines() {
        assert_eq!(render(&Status::Scan(ScanOutcome::NoFinger)).as_str(), "No Finger Detected");
        assert_eq!(render(&Status::Scan(ScanOutcome::NoMatch)).as_str(), "No Match Found");
        assert_eq!(
            render(&Status::Scan(ScanOutcome::Matched(Match { id: id(4), confidence: 61 }))).as_str(),
            "Fingerprint ID: 4 (confidence 61)"
        );
        assert_eq!(
            render(&Status::Scan(ScanOutcome::Failed(SensorResponse::ImageTooMessy))).as_str(),
            "Image too messy"
        );
    }

    #[test]
    fn enrollment_success_line() {
        let line = render(&Status::Enroll(EnrollStatus::Enrolled(id(12))));
        assert!(line.ends_with("enrolled successfully as ID #12"));
    }

    #[test]
    fn mismatch_and_transport_errors_read_differently() {
        let mismatch = render(&Status::Enroll(EnrollStatus::Failed(Failure::Merge(SensorResponse::EnrollMismatch))));
        let transport = render(&Status::Enroll(EnrollStatus::Failed(Failure::Merge(SensorResponse::PacketError))));
        assert_eq!(mismatch.as_str(), "Enrollment failed: Fingerprints did not match");
        assert_eq!(transport.as_str(), "Enrollment failed: Communication error");
    }

    #[test]
    fn store_failures_name_the_sensor_reason() {
        let flash = render(&Status::Enroll(EnrollStatus::Failed(Failure::Store(SensorResponse::FlashError))));
        let link = render(&Status::Enroll(EnrollStatus::Failed(Failure::Store(SensorResponse::PacketError))));
        let capture = Failure::Capture(Sample::Second, SensorResponse::PacketError);
        assert!(flash.as_str().starts_with("Enrollment failed: Failed to store ("));
        assert_eq!(link.as_str(), "Enrollment failed: Communication error");
        assert_eq!(capture.reason(), SensorResponse::PacketError);
        assert_eq!(render(&Status::Enroll(EnrollStatus::Failed(capture))).as_str(), link.as_str());
    }

    #[test]
    fn longest_lines_fit() {
        let failure = Failure::Store(SensorResponse::Unknown(0xFF));
        let line = render(&Status::Enroll(EnrollStatus::Failed(failure)));
        assert_eq!(line.as_str(), "Enrollment failed: Failed to store (Unknown error 0xff)");
        let line = render(&Status::Enroll(EnrollStatus::PromptId));
        assert!(line.starts_with("Type in the ID #"));
    }
}
