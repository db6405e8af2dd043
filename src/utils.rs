use core::fmt;

/// Decodes a reply structure from the payload of an acknowledge packet.
/// The payload starts at the confirmation code and excludes the checksum.
pub trait FromPayload: Sized {
    fn from_payload(payload: &[u8]) -> Option<Self>;
}

pub trait CommandWriter {
    fn write_cmd_bytes(&mut self, bytes: &[u8]);
}

pub trait ToPayload {
    fn to_payload(&self, writer: &mut dyn CommandWriter);
}

/// Errors raised by the driver and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The UART reported an error while reading or writing a word.
    Serial,

    /// No reply byte arrived within the configured poll budget.
    Timeout,

    /// A reply did not start with `0xEF 0x01`.
    BadHeader,

    /// A reply came from a different device address.
    AddressMismatch,

    /// The checksum trailing a reply did not match its contents.
    BadChecksum,

    /// A reply carried a packet identifier other than acknowledge (`0x07`).
    UnexpectedPacket(u8),

    /// A reply announced a payload larger than the receive buffer.
    PayloadTooLarge(usize),

    /// A command did not fit into the transmit buffer.
    BufferOverflow,

    /// A reply was well-formed but too short for the command it answers.
    ShortReply,

    /// The startup handshake with the sensor failed.
    SensorNotFound,

    /// A UI command arrived in a mode that does not accept it.
    InvalidState,

    /// The display collaborator failed to flush a frame.
    Display,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Serial => write!(f, "serial link error"),
            Error::Timeout => write!(f, "timed out waiting for the sensor"),
            Error::BadHeader => write!(f, "reply has an invalid header"),
            Error::AddressMismatch => write!(f, "reply from an unexpected address"),
            Error::BadChecksum => write!(f, "reply checksum mismatch"),
            Error::UnexpectedPacket(pid) => write!(f, "unexpected packet id {:#04x}", pid),
            Error::PayloadTooLarge(len) => write!(f, "reply payload too large ({} bytes)", len),
            Error::BufferOverflow => write!(f, "command does not fit the transmit buffer"),
            Error::ShortReply => write!(f, "reply too short"),
            Error::SensorNotFound => write!(f, "did not find fingerprint sensor"),
            Error::InvalidState => write!(f, "command not valid in the current mode"),
            Error::Display => write!(f, "display flush failed"),
        }
    }
}
