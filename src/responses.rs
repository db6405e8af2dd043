use byteorder::{BigEndian, ByteOrder};
use core::fmt;

use crate::commands::Command;
use crate::utils::FromPayload;

/// Outcome of a single sensor operation, decoded from the confirmation code of
/// its acknowledge packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorResponse {
    /// `0x00`
    Ok,
    /// `0x01`, also reported for timeouts and malformed replies.
    PacketError,
    /// `0x02`
    NoFinger,
    /// `0x03`
    ImageFail,
    /// `0x06`
    ImageTooMessy,
    /// `0x07`
    FeatureExtractFailed,
    /// `0x09`
    NotFound,
    /// `0x0A`: the two character buffers are not the same finger.
    EnrollMismatch,
    /// `0x0B`: page id beyond the library.
    BadLocation,
    /// `0x13`
    WrongPassword,
    /// `0x15`
    InvalidImage,
    /// `0x18`
    FlashError,
    Unknown(u8),
}

impl SensorResponse {
    pub fn from_code(byte: u8) -> Self {
        match byte {
            0x00 => Self::Ok,
            0x01 => Self::PacketError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageTooMessy,
            0x07 => Self::FeatureExtractFailed,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x13 => Self::WrongPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketError => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageFail => 0x03,
            Self::ImageTooMessy => 0x06,
            Self::FeatureExtractFailed => 0x07,
            Self::NotFound => 0x09,
            Self::EnrollMismatch => 0x0A,
            Self::BadLocation => 0x0B,
            Self::WrongPassword => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashError => 0x18,
            Self::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for SensorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::PacketError => write!(f, "Communication error"),
            Self::NoFinger => write!(f, "No Finger Detected"),
            Self::ImageFail => write!(f, "Imaging error"),
            Self::ImageTooMessy => write!(f, "Image too messy"),
            Self::FeatureExtractFailed | Self::InvalidImage => {
                write!(f, "Could not find fingerprint features")
            }
            Self::NotFound => write!(f, "No Match Found"),
            Self::EnrollMismatch => write!(f, "Fingerprints did not match"),
            Self::BadLocation => write!(f, "Could not store in that location"),
            Self::WrongPassword => write!(f, "Wrong sensor password"),
            Self::FlashError => write!(f, "Error writing to flash"),
            Self::Unknown(code) => write!(f, "Unknown error {:#04x}", code),
        }
    }
}

/// Responses to commands returned by the R502. Names are the same as commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Contains system status and configuration information
    ReadSysPara(ReadSysParaResult),

    VfyPwd(VfyPwdResult),

    GenImg(AckResult),

    Img2Tz(AckResult),

    Search(SearchResult),

    RegModel(AckResult),

    Store(AckResult),

    TemplateNum(TemplateNumResult),
}

impl Reply {
    /// Decodes the acknowledge `payload` (confirmation code onwards, checksum
    /// excluded) as the reply to `cmd`.
    pub(crate) fn decode(cmd: &Command, address: u32, payload: &[u8], checksum: u16) -> Option<Self> {
        let code = SensorResponse::from_code(*payload.first()?);
        let ack = AckResult { address, confirmation_code: code, checksum };
        let reply = match cmd {
            Command::GenImg => Reply::GenImg(ack),
            Command::Img2Tz { .. } => Reply::Img2Tz(ack),
            Command::RegModel => Reply::RegModel(ack),
            Command::Store { .. } => Reply::Store(ack),
            Command::VfyPwd { .. } => Reply::VfyPwd(VfyPwdResult {
                address,
                confirmation_code: PasswordVerificationState::from(payload[0]),
                checksum,
            }),
            Command::Search { .. } => {
                // Failures may come back without the page/score words.
                let (match_id, match_score) = if payload.len() >= 5 {
                    (BigEndian::read_u16(&payload[1..3]), BigEndian::read_u16(&payload[3..5]))
                } else if code.is_ok() {
                    return None;
                } else {
                    (0, 0)
                };
                Reply::Search(SearchResult { address, confirmation_code: code, match_id, match_score, checksum })
            }
            Command::TemplateNum => {
                let template_num = if payload.len() >= 3 {
                    BigEndian::read_u16(&payload[1..3])
                } else if code.is_ok() {
                    return None;
                } else {
                    0
                };
                Reply::TemplateNum(TemplateNumResult { address, confirmation_code: code, template_num, checksum })
            }
            Command::ReadSysPara => Reply::ReadSysPara(ReadSysParaResult {
                address,
                confirmation_code: code,
                system_parameters: SystemParameters::from_payload(payload.get(1..17)?)?,
                checksum,
            }),
        };
        Some(reply)
    }
}

/// Reply that carries nothing but a confirmation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckResult {
    pub address: u32,
    pub confirmation_code: SensorResponse,
    pub checksum: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSysParaResult {
    pub address: u32,
    pub confirmation_code: SensorResponse,
    pub system_parameters: SystemParameters,
    pub checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfyPwdResult {
    pub address: u32,
    /// Handshake result
    pub confirmation_code: PasswordVerificationState,
    pub checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub address: u32,
    pub confirmation_code: SensorResponse,
    /// Library page of the matching template. Only meaningful on `Ok`.
    pub match_id: u16,
    /// Match confidence. Only meaningful on `Ok`.
    pub match_score: u16,
    pub checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateNumResult {
    pub address: u32,
    pub confirmation_code: SensorResponse,
    pub template_num: u16,
    pub checksum: u16,
}

/// System status and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemParameters {
    /// Status information. Use instance methods of SystemParameters to get to individual bits.
    pub status_register: u16,

    /// System identifier code, whatever that means - datasheet says this has a constant value of
    /// 0x0009
    pub system_identifier_code: u16,

    /// Finger library size.
    pub finger_library_size: u16,

    /// Security level [1-5]
    pub security_level: u16,

    /// Device address, in case you forgot, but then you'd need the device address to send it the
    /// `ReadSysPara` command... 🤔
    pub device_address: u32,

    /// Packet size. Actually a size code [0-3]:\
    /// 0 = 32 bytes\
    /// 1 = 64 bytes\
    /// 2 = 128 bytes (the default)\
    /// 3 = 256 bytes
    pub packet_size: u16,

    /// Baud setting. To get actual baud value, multiply by 9600.
    ///
    /// The default value is 6 for 57,600 baud.
    pub baud_setting: u16,
}

impl SystemParameters {
    /// True if the R502 is busy executing another command.
    ///
    /// *Busy* in the datasheet.
    pub fn busy(&self) -> bool {
        self.status_register & (1u16 << 0) != 0
    }

    /// True if the module found a matching finger - however you should
    /// always check the response to the actual matching request.
    ///
    /// *Pass* in the datasheet.
    pub fn has_finger_match(&self) -> bool {
        self.status_register & (1u16 << 1) != 0
    }

    /// True if the password given in the handshake is correct.
    ///
    /// *PWD* in the datasheet.
    pub fn password_ok(&self) -> bool {
        self.status_register & (1u16 << 2) != 0
    }

    /// True if the image buffer contains a valid image.
    ///
    /// *ImgBufStat* in the datasheet.
    pub fn has_valid_image(&self) -> bool {
        self.status_register & (1u16 << 3) != 0
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_setting as u32 * 9600
    }
}

impl FromPayload for SystemParameters {
    fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() < 16 {
            return None;
        }
        // HZ R502's datasheet is a little inconsistent - sometimes the sizes are given in bytes
        // and sometimes in words; words are 16 bit (2 byte).
        Some(SystemParameters {
            status_register: BigEndian::read_u16(&payload[0..2]),
            system_identifier_code: BigEndian::read_u16(&payload[2..4]),
            finger_library_size: BigEndian::read_u16(&payload[4..6]),
            security_level: BigEndian::read_u16(&payload[6..8]),
            device_address: BigEndian::read_u32(&payload[8..12]),
            packet_size: BigEndian::read_u16(&payload[12..14]),
            baud_setting: BigEndian::read_u16(&payload[14..16]),
        })
    }
}

/// Enum for the password handshake result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PasswordVerificationState {
    Correct,
    Incorrect,
    Error,
}

impl From<u8> for PasswordVerificationState {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::Correct,
            0x13 => Self::Incorrect,
            _ => Self::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_are_preserved() {
        let response = SensorResponse::from_code(0x42);
        assert_eq!(response, SensorResponse::Unknown(0x42));
        assert_eq!(response.code(), 0x42);
    }

    #[test]
    fn known_codes_survive_the_trip_back() {
        for code in [0x00u8, 0x01, 0x02, 0x03, 0x06, 0x07, 0x09, 0x0A, 0x0B, 0x13, 0x15, 0x18].iter() {
            assert_eq!(SensorResponse::from_code(*code).code(), *code);
        }
    }

    #[test]
    fn search_reply_reads_page_and_score() {
        let payload = [0x00, 0x00, 0x0C, 0x00, 0x57];
        let reply = Reply::decode(
            &Command::Search { buffer: 1, start_index: 0, page_count: 0xA3 },
            0xFFFF_FFFF,
            &payload,
            0,
        );
        match reply {
            Some(Reply::Search(result)) => {
                assert_eq!(result.confirmation_code, SensorResponse::Ok);
                assert_eq!(result.match_id, 12);
                assert_eq!(result.match_score, 0x57);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn successful_search_without_page_words_is_rejected() {
        let reply = Reply::decode(
            &Command::Search { buffer: 1, start_index: 0, page_count: 0xA3 },
            0xFFFF_FFFF,
            &[0x00],
            0,
        );
        assert_eq!(reply, None);
    }

    #[test]
    fn system_parameters_decode_all_words() {
        let payload = [
            0x00, 0x04, 0x00, 0x09, 0x00, 0xC8, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x02, 0x00, 0x06,
        ];
        let params = SystemParameters::from_payload(&payload).unwrap();
        assert!(params.password_ok());
        assert!(!params.busy());
        assert_eq!(params.system_identifier_code, 9);
        assert_eq!(params.finger_library_size, 200);
        assert_eq!(params.security_level, 3);
        assert_eq!(params.device_address, 0xFFFF_FFFF);
        assert_eq!(params.packet_size, 2);
        assert_eq!(params.baud_rate(), 57_600);
    }

    #[test]
    fn descriptions_for_the_user() {
        use std::string::ToString;
        assert_eq!(SensorResponse::ImageTooMessy.to_string(), "Image too messy");
        assert_eq!(SensorResponse::NotFound.to_string(), "No Match Found");
        assert_eq!(SensorResponse::EnrollMismatch.to_string(), "Fingerprints did not match");
    }
}
