use crate::utils::{CommandWriter, ToPayload};
//# Naming conventions etc follow the R502 datasheet, see:
//# https://www.dropbox.com/sh/epucei8lmoz7xpp/AAAmon04b1DiSOeh1q4nAhzAa?dl=0&preview=R502+fingerprint+module+user+manual-V1.2.pdf

/// Packet identifier of a command packet.
pub(crate) const PID_COMMAND: u8 = 0x01;

/// Enum for commands one can send to the R502. Names match the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Reads system status and basic configuration
    ReadSysPara,

    /// Performs a handshake with the device to verify the password.
    /// The default password on the R502 is 0x00000000.
    VfyPwd {
        /// The device password.
        password: u32,
    },

    /// Captures an image of the fingerprint
    GenImg,

    /// Processes an image into a _character buffer_
    Img2Tz {
        /// Which buffer to store the processed fingerprint data into (there are 2).
        ///
        /// **Note:** The buffers are named **1** and **2**. Any other value defaults to 2.
        buffer: u8,
    },

    /// Matches the captured fingerprint against a number of stored templates.
    Search {
        /// Which buffer holds the fingerprint data to search with.
        buffer: u8,

        /// First library page to compare against.
        start_index: u16,

        /// Number of library pages to compare against, starting at `start_index`.
        page_count: u16,
    },

    /// Combines both character buffers into one template, left in both buffers.
    RegModel,

    /// Writes a character buffer into the flash library.
    Store {
        /// Which buffer to store.
        buffer: u8,

        /// Library page (template ID) to write to.
        index: u16,
    },

    /// Reads how many templates the library holds.
    TemplateNum,
}

impl Command {
    /// Instruction code as listed in the datasheet.
    pub fn instruction(&self) -> u8 {
        match self {
            Self::GenImg => 0x01,
            Self::Img2Tz { .. } => 0x02,
            Self::Search { .. } => 0x04,
            Self::RegModel => 0x05,
            Self::Store { .. } => 0x06,
            Self::ReadSysPara => 0x0F,
            Self::VfyPwd { .. } => 0x13,
            Self::TemplateNum => 0x1D,
        }
    }
}

impl ToPayload for Command {
    fn to_payload(&self, writer: &mut dyn CommandWriter) {
        writer.write_cmd_bytes(&[PID_COMMAND]);
        match self {
            // Required packet:
            // headr  | 0xEF 0x01 [2]
            // addr   | cmd.address [4]
            // ident  | 0x01 [1]
            // length | 0x00 0x03 [2]
            // instr  | cmd.instruction() [1]
            // chksum | checksum [2]
            Self::ReadSysPara | Self::GenImg | Self::RegModel | Self::TemplateNum => {
                writer.write_cmd_bytes(&[0x00, 0x03]);
                writer.write_cmd_bytes(&[self.instruction()]);
            }

            // Required packet:
            // headr  | 0xEF 0x01 [2]
            // addr   | cmd.address [4]
            // ident  | 0x01 [1]
            // length | 0x00 0x07 [2]
            // instr  | 0x13 [1]
            // passwd | cmd.password [4]
            // chksum | checksum [2]
            Self::VfyPwd { password } => {
                writer.write_cmd_bytes(&[0x00, 0x07]);
                writer.write_cmd_bytes(&[self.instruction()]);
                writer.write_cmd_bytes(&password.to_be_bytes()[..]);
            }

            Self::Img2Tz { buffer } => {
                writer.write_cmd_bytes(&[0x00, 0x04]);
                writer.write_cmd_bytes(&[self.instruction()]);
                writer.write_cmd_bytes(&[*buffer]);
            }

            // Required packet:
            // headr  | 0xEF 0x01 [2]
            // addr   | cmd.address [4]
            // ident  | 0x01 [1]
            // length | 0x00 0x08 [2]
            // instr  | 0x04 [1]
            // bufid  | buffer [1]
            // sstart | start_index [2]
            // scount | page_count [2]
            // chksum | checksum [2]
            Self::Search { buffer, start_index, page_count } => {
                writer.write_cmd_bytes(&[0x00, 0x08]);
                writer.write_cmd_bytes(&[self.instruction()]);
                writer.write_cmd_bytes(&[*buffer]);
                writer.write_cmd_bytes(&start_index.to_be_bytes()[..]);
                writer.write_cmd_bytes(&page_count.to_be_bytes()[..]);
            }

            // Required packet:
            // headr  | 0xEF 0x01 [2]
            // addr   | cmd.address [4]
            // ident  | 0x01 [1]
            // length | 0x00 0x06 [2]
            // instr  | 0x06 [1]
            // bufid  | buffer [1]
            // page   | index [2]
            // chksum | checksum [2]
            Self::Store { buffer, index } => {
                writer.write_cmd_bytes(&[0x00, 0x06]);
                writer.write_cmd_bytes(&[self.instruction()]);
                writer.write_cmd_bytes(&[*buffer]);
                writer.write_cmd_bytes(&index.to_be_bytes()[..]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct Bytes(Vec<u8>);

    impl CommandWriter for Bytes {
        fn write_cmd_bytes(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
    }

    fn encode(cmd: Command) -> Vec<u8> {
        let mut out = Bytes(Vec::new());
        cmd.to_payload(&mut out);
        out.0
    }

    #[test]
    fn length_field_covers_instruction_params_and_checksum() {
        for cmd in [
            Command::GenImg,
            Command::RegModel,
            Command::TemplateNum,
            Command::ReadSysPara,
            Command::VfyPwd { password: 0 },
            Command::Img2Tz { buffer: 1 },
            Command::Search { buffer: 1, start_index: 0, page_count: 0xA3 },
            Command::Store { buffer: 1, index: 12 },
        ]
        .iter()
        {
            let bytes = encode(*cmd);
            let length = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
            // pid + length field, then instruction and params
            assert_eq!(length, bytes.len() - 3 + 2, "{:?}", cmd);
            assert_eq!(bytes[3], cmd.instruction());
        }
    }

    #[test]
    fn store_encodes_page_big_endian() {
        assert_eq!(
            encode(Command::Store { buffer: 1, index: 0x0102 }),
            [0x01, 0x00, 0x06, 0x06, 0x01, 0x01, 0x02]
        );
    }

    #[test]
    fn search_encodes_range() {
        assert_eq!(
            encode(Command::Search { buffer: 1, start_index: 0, page_count: 0x00A3 }),
            [0x01, 0x00, 0x08, 0x04, 0x01, 0x00, 0x00, 0x00, 0xA3]
        );
    }
}
