use arrayvec::ArrayVec;
use byteorder::{BigEndian, ByteOrder};
use embedded_hal::serial::{Read, Write};
use log::{debug, warn};
use nb::block;

use crate::commands::Command;
use crate::responses::{PasswordVerificationState, Reply, SensorResponse, SystemParameters};
use crate::sensor::{Match, Sensor, Slot, TemplateId};
use crate::utils::{CommandWriter, Error, ToPayload};

const HEADER: [u8; 2] = [0xEF, 0x01];
const PID_ACK: u8 = 0x07;

/// Header, address, packet id and length field.
const PREAMBLE_LEN: usize = 9;

const CMD_BUFFER_SIZE: usize = 32;
const RX_BUFFER_SIZE: usize = 64;

/// Most bytes skipped while looking for a packet start.
const STALE_LIMIT: usize = RX_BUFFER_SIZE * 2;

/// Link settings for an R502.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Device address; the factory default is `0xFFFFFFFF`.
    pub address: u32,

    /// Handshake password; the factory default is `0x00000000`.
    pub password: u32,

    /// How many `WouldBlock` polls to tolerate while waiting for a single
    /// reply byte before giving up with [`Error::Timeout`].
    pub read_poll_budget: u32,

    /// First library page searched.
    pub search_start: u16,

    /// Number of library pages searched.
    pub search_pages: u16,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: 0xFFFF_FFFF,
            password: 0x0000_0000,
            read_poll_budget: 2_000_000,
            search_start: 0,
            search_pages: 0x00A3,
        }
    }
}

/// Represents a R502 device connected to a U(S)ART.
#[derive(Debug)]
pub struct R502<TX, RX> {
    tx: TX,
    rx: RX,
    config: SensorConfig,
    received: ArrayVec<[u8; RX_BUFFER_SIZE]>,
    cmd_buffer: ArrayVec<[u8; CMD_BUFFER_SIZE]>,
    /// Set when an exchange gave up before its reply was fully read.
    stale: bool,
}

impl<TX, RX> R502<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    pub fn new(tx: TX, rx: RX, address: u32) -> Self {
        Self::with_config(tx, rx, SensorConfig { address, ..SensorConfig::default() })
    }

    pub fn with_config(tx: TX, rx: RX, config: SensorConfig) -> Self {
        Self {
            tx,
            rx,
            config,
            received: ArrayVec::new(),
            cmd_buffer: ArrayVec::new(),
            stale: false,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Gives back the serial halves.
    pub fn release(self) -> (TX, RX) {
        (self.tx, self.rx)
    }

    /// Sends a command to the R502 and then waits for the reply. The wait for
    /// each reply byte is bounded by [`SensorConfig::read_poll_budget`].
    pub fn send_command(&mut self, cmd: Command) -> Result<Reply, Error> {
        debug!("r502 <- {:?}", cmd);
        self.prepare_cmd(&cmd)?;

        if self.stale {
            self.discard_stale();
            self.stale = false;
        }

        for byte in self.cmd_buffer.iter() {
            block!(self.tx.write(*byte)).map_err(|_| Error::Serial)?;
        }
        block!(self.tx.flush()).map_err(|_| Error::Serial)?;

        if let Err(e) = self.receive() {
            self.stale = true;
            return Err(e);
        }
        self.parse_reply(&cmd)
    }

    /// Drops what is left of a reply an earlier exchange gave up on, so it is
    /// not taken for the answer to the next command. Stops at the first empty
    /// poll or after one whole packet.
    fn discard_stale(&mut self) {
        let mut skipped = 0usize;
        let mut previous = None;
        let mut in_packet = false;
        while skipped < STALE_LIMIT {
            let byte = match self.rx.read() {
                Ok(byte) => byte,
                Err(_) => break,
            };
            skipped += 1;
            if previous == Some(HEADER[0]) && byte == HEADER[1] {
                in_packet = true;
                break;
            }
            previous = Some(byte);
        }

        if in_packet {
            let mut preamble = [0u8; PREAMBLE_LEN - 2];
            let mut complete = true;
            for slot in preamble.iter_mut() {
                match self.rx.read() {
                    Ok(byte) => {
                        *slot = byte;
                        skipped += 1;
                    }
                    Err(_) => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                let length = BigEndian::read_u16(&preamble[5..7]) as usize;
                for _ in 0..length.min(RX_BUFFER_SIZE) {
                    if self.rx.read().is_err() {
                        break;
                    }
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("discarded {} stale bytes", skipped);
        }
    }

    fn prepare_cmd(&mut self, cmd: &Command) -> Result<(), Error> {
        self.cmd_buffer.clear();
        let mut writer = PacketWriter { buffer: &mut self.cmd_buffer, overflow: false };
        writer.write_cmd_bytes(&HEADER);
        writer.write_cmd_bytes(&self.config.address.to_be_bytes()[..]);
        cmd.to_payload(&mut writer);
        let chk = checksum(&writer.buffer[6..]);
        writer.write_cmd_bytes(&chk.to_be_bytes()[..]);

        if writer.overflow {
            return Err(Error::BufferOverflow);
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<(), Error> {
        let skipped = self.sync_header()?;
        if skipped > 0 {
            warn!("skipped {} bytes before packet header", skipped);
        }

        self.received.clear();
        for byte in HEADER.iter() {
            self.received.push(*byte);
        }
        for _ in HEADER.len()..PREAMBLE_LEN {
            let byte = self.read_byte()?;
            self.received.push(byte);
        }

        // Expected packet:
        // headr  | 0xEF 0x01 [2]
        // addr   | address [4]
        // ident  | 0x07 [1]
        // length | payload + 2 [2]
        // confrm | code [1]
        // params | (params) [length - 3]
        // chksum | checksum [2]
        if BigEndian::read_u32(&self.received[2..6]) != self.config.address {
            return Err(Error::AddressMismatch);
        }
        if self.received[6] != PID_ACK {
            return Err(Error::UnexpectedPacket(self.received[6]));
        }

        let length = BigEndian::read_u16(&self.received[7..9]) as usize;
        if length < 3 {
            return Err(Error::ShortReply);
        }
        if PREAMBLE_LEN + length > RX_BUFFER_SIZE {
            return Err(Error::PayloadTooLarge(length));
        }

        for _ in 0..length {
            let byte = self.read_byte()?;
            self.received.try_push(byte).map_err(|_| Error::PayloadTooLarge(length))?;
        }

        let end = self.received.len();
        let expected = BigEndian::read_u16(&self.received[end - 2..end]);
        if checksum(&self.received[6..end - 2]) != expected {
            return Err(Error::BadChecksum);
        }
        Ok(())
    }

    /// Reads up to and including the `0xEF 0x01` start of a packet. Returns
    /// how many bytes came before it.
    fn sync_header(&mut self) -> Result<usize, Error> {
        let mut skipped = 0;
        let mut previous = self.read_byte()?;
        loop {
            let byte = self.read_byte()?;
            if previous == HEADER[0] && byte == HEADER[1] {
                return Ok(skipped);
            }
            skipped += 1;
            if skipped > STALE_LIMIT {
                return Err(Error::BadHeader);
            }
            previous = byte;
        }
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        let mut polls = 0u32;
        loop {
            match self.rx.read() {
                Ok(byte) => return Ok(byte),
                Err(nb::Error::WouldBlock) => {
                    polls += 1;
                    if polls >= self.config.read_poll_budget {
                        return Err(Error::Timeout);
                    }
                }
                Err(nb::Error::Other(_)) => return Err(Error::Serial),
            }
        }
    }

    fn parse_reply(&self, cmd: &Command) -> Result<Reply, Error> {
        let end = self.received.len();
        let address = BigEndian::read_u32(&self.received[2..6]);
        let checksum = BigEndian::read_u16(&self.received[end - 2..end]);
        let payload = &self.received[PREAMBLE_LEN..end - 2];
        let reply = Reply::decode(cmd, address, payload, checksum).ok_or(Error::ShortReply)?;
        debug!("r502 -> {:?}", reply);
        Ok(reply)
    }

    /// Sends a command answered by a bare confirmation code.
    fn acknowledge(&mut self, cmd: Command) -> SensorResponse {
        match self.send_command(cmd) {
            Ok(Reply::GenImg(ack))
            | Ok(Reply::Img2Tz(ack))
            | Ok(Reply::RegModel(ack))
            | Ok(Reply::Store(ack)) => ack.confirmation_code,
            Ok(reply) => {
                warn!("{:?} answered with {:?}", cmd, reply);
                SensorResponse::PacketError
            }
            Err(e) => {
                warn!("{:?} failed: {}", cmd, e);
                SensorResponse::PacketError
            }
        }
    }
}

impl<TX, RX> Sensor for R502<TX, RX>
where
    TX: Write<u8>,
    RX: Read<u8>,
{
    fn verify_password(&mut self) -> SensorResponse {
        let cmd = Command::VfyPwd { password: self.config.password };
        match self.send_command(cmd) {
            Ok(Reply::VfyPwd(result)) => match result.confirmation_code {
                PasswordVerificationState::Correct => SensorResponse::Ok,
                PasswordVerificationState::Incorrect => SensorResponse::WrongPassword,
                PasswordVerificationState::Error => SensorResponse::PacketError,
            },
            Ok(reply) => {
                warn!("handshake answered with {:?}", reply);
                SensorResponse::PacketError
            }
            Err(e) => {
                warn!("handshake failed: {}", e);
                SensorResponse::PacketError
            }
        }
    }

    fn capture(&mut self) -> SensorResponse {
        self.acknowledge(Command::GenImg)
    }

    fn convert_to_template(&mut self, slot: Slot) -> SensorResponse {
        self.acknowledge(Command::Img2Tz { buffer: slot.buffer() })
    }

    fn search(&mut self) -> Result<Match, SensorResponse> {
        let cmd = Command::Search {
            buffer: Slot::One.buffer(),
            start_index: self.config.search_start,
            page_count: self.config.search_pages,
        };
        match self.send_command(cmd) {
            Ok(Reply::Search(result)) if result.confirmation_code.is_ok() => Ok(Match {
                id: TemplateId::from_page(result.match_id),
                confidence: result.match_score,
            }),
            Ok(Reply::Search(result)) => Err(result.confirmation_code),
            Ok(reply) => {
                warn!("search answered with {:?}", reply);
                Err(SensorResponse::PacketError)
            }
            Err(e) => {
                warn!("search failed: {}", e);
                Err(SensorResponse::PacketError)
            }
        }
    }

    fn merge_templates(&mut self) -> SensorResponse {
        self.acknowledge(Command::RegModel)
    }

    fn store(&mut self, id: TemplateId) -> SensorResponse {
        self.acknowledge(Command::Store { buffer: Slot::One.buffer(), index: id.get() })
    }

    fn template_count(&mut self) -> Result<u16, SensorResponse> {
        match self.send_command(Command::TemplateNum) {
            Ok(Reply::TemplateNum(result)) if result.confirmation_code.is_ok() => Ok(result.template_num),
            Ok(Reply::TemplateNum(result)) => Err(result.confirmation_code),
            Ok(reply) => {
                warn!("template count answered with {:?}", reply);
                Err(SensorResponse::PacketError)
            }
            Err(e) => {
                warn!("template count failed: {}", e);
                Err(SensorResponse::PacketError)
            }
        }
    }

    fn system_parameters(&mut self) -> Option<SystemParameters> {
        match self.send_command(Command::ReadSysPara) {
            Ok(Reply::ReadSysPara(result)) if result.confirmation_code.is_ok() => Some(result.system_parameters),
            Ok(reply) => {
                warn!("system parameters answered with {:?}", reply);
                None
            }
            Err(e) => {
                warn!("reading system parameters failed: {}", e);
                None
            }
        }
    }
}

struct PacketWriter<'a> {
    buffer: &'a mut ArrayVec<[u8; CMD_BUFFER_SIZE]>,
    overflow: bool,
}

impl CommandWriter for PacketWriter<'_> {
    fn write_cmd_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            if self.buffer.try_push(*byte).is_err() {
                self.overflow = true;
            }
        }
    }
}

/// Sum of the packet id, length and payload bytes, truncated to 16 bits.
fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |sum, byte| sum.wrapping_add(*byte as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Debug, Default)]
    struct TestTx(Vec<u8>);

    impl Write<u8> for TestTx {
        type Error = ();

        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            self.0.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    /// Replays scripted words; `None` reads as `WouldBlock`.
    #[derive(Debug, Default)]
    struct TestRx(VecDeque<Option<u8>>);

    impl TestRx {
        fn replying(frames: &[Vec<u8>]) -> Self {
            TestRx(frames.iter().flatten().map(|b| Some(*b)).collect())
        }
    }

    impl Read<u8> for TestRx {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            match self.0.pop_front() {
                Some(Some(word)) => Ok(word),
                _ => Err(nb::Error::WouldBlock),
            }
        }
    }

    fn ack(payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, PID_ACK];
        frame.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        frame.extend_from_slice(payload);
        let chk = checksum(&frame[6..]);
        frame.extend_from_slice(&chk.to_be_bytes());
        frame
    }

    fn sensor(frames: &[Vec<u8>]) -> R502<TestTx, TestRx> {
        let config = SensorConfig { read_poll_budget: 16, ..SensorConfig::default() };
        R502::with_config(TestTx::default(), TestRx::replying(frames), config)
    }

    #[test]
    fn gen_img_packet_on_the_wire() {
        let mut r502 = sensor(&[ack(&[0x02])]);
        assert_eq!(r502.capture(), SensorResponse::NoFinger);
        let (tx, _) = r502.release();
        assert_eq!(tx.0, [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]);
    }

    #[test]
    fn convert_reports_sensor_code() {
        let mut r502 = sensor(&[ack(&[0x06])]);
        assert_eq!(r502.convert_to_template(Slot::Two), SensorResponse::ImageTooMessy);
        let (tx, _) = r502.release();
        // instruction, then buffer 2
        assert_eq!(&tx.0[9..11], &[0x02, 0x02]);
    }

    #[test]
    fn search_hit_yields_identity_and_confidence() {
        let mut r502 = sensor(&[ack(&[0x00, 0x00, 0x05, 0x00, 0x64])]);
        assert_eq!(
            r502.search(),
            Ok(Match { id: TemplateId::new(5).unwrap(), confidence: 100 })
        );
    }

    #[test]
    fn search_miss_yields_not_found() {
        let mut r502 = sensor(&[ack(&[0x09, 0x00, 0x00, 0x00, 0x00])]);
        assert_eq!(r502.search(), Err(SensorResponse::NotFound));
    }

    #[test]
    fn template_count_reads_word() {
        let mut r502 = sensor(&[ack(&[0x00, 0x00, 0x03])]);
        assert_eq!(r502.template_count(), Ok(3));
    }

    #[test]
    fn wrong_password_is_distinguished() {
        let mut r502 = sensor(&[ack(&[0x13])]);
        assert_eq!(r502.verify_password(), SensorResponse::WrongPassword);
    }

    #[test]
    fn silence_times_out_as_packet_error() {
        let mut r502 = sensor(&[]);
        assert_eq!(r502.capture(), SensorResponse::PacketError);
        assert_eq!(r502.send_command(Command::GenImg), Err(Error::Timeout));
    }

    #[test]
    fn late_bytes_within_budget_are_accepted() {
        let mut rx = TestRx::default();
        for _ in 0..8 {
            rx.0.push_back(None);
        }
        rx.0.extend(ack(&[0x00]).into_iter().map(Some));
        let config = SensorConfig { read_poll_budget: 16, ..SensorConfig::default() };
        let mut r502 = R502::with_config(TestTx::default(), rx, config);
        assert_eq!(r502.capture(), SensorResponse::Ok);
    }

    #[test]
    fn late_reply_is_not_taken_for_the_next_one() {
        let mut rx = TestRx::default();
        for _ in 0..16 {
            rx.0.push_back(None);
        }
        // GenImg answers after the driver gave up, then Img2Tz answers
        rx.0.extend(ack(&[0x00]).into_iter().map(Some));
        rx.0.extend(ack(&[0x06]).into_iter().map(Some));
        let config = SensorConfig { read_poll_budget: 16, ..SensorConfig::default() };
        let mut r502 = R502::with_config(TestTx::default(), rx, config);

        assert_eq!(r502.capture(), SensorResponse::PacketError);
        assert_eq!(r502.convert_to_template(Slot::One), SensorResponse::ImageTooMessy);
        assert_eq!(r502.capture(), SensorResponse::PacketError);
    }

    #[test]
    fn partial_late_reply_is_dropped() {
        let mut rx = TestRx::default();
        for _ in 0..16 {
            rx.0.push_back(None);
        }
        rx.0.extend(ack(&[0x00])[..5].iter().map(|b| Some(*b)));
        rx.0.push_back(None);
        rx.0.extend(ack(&[0x02]).into_iter().map(Some));
        let config = SensorConfig { read_poll_budget: 16, ..SensorConfig::default() };
        let mut r502 = R502::with_config(TestTx::default(), rx, config);

        assert_eq!(r502.capture(), SensorResponse::PacketError);
        assert_eq!(r502.capture(), SensorResponse::NoFinger);
    }

    #[test]
    fn noise_before_header_is_skipped() {
        let mut frame = vec![0x00, 0x42, 0xEF];
        frame.extend(ack(&[0x09, 0x00, 0x00, 0x00, 0x00]));
        let mut r502 = sensor(&[frame]);
        assert_eq!(r502.search(), Err(SensorResponse::NotFound));
    }

    #[test]
    fn endless_noise_is_a_bad_header() {
        let mut r502 = sensor(&[vec![0x55; STALE_LIMIT + 4]]);
        assert_eq!(r502.send_command(Command::GenImg), Err(Error::BadHeader));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut frame = ack(&[0x00]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let mut r502 = sensor(&[frame]);
        assert_eq!(r502.send_command(Command::GenImg), Err(Error::BadChecksum));
    }

    #[test]
    fn foreign_packet_id_is_rejected() {
        let mut frame = ack(&[0x00]);
        frame[6] = 0x02;
        let mut r502 = sensor(&[frame]);
        assert_eq!(r502.send_command(Command::GenImg), Err(Error::UnexpectedPacket(0x02)));
    }

    #[test]
    fn reads_system_parameters() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&[
            0x00, 0x04, 0x00, 0x09, 0x00, 0xC8, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x02, 0x00, 0x06,
        ]);
        let mut r502 = sensor(&[ack(&payload)]);
        let params = r502.system_parameters().unwrap();
        assert_eq!(params.finger_library_size, 200);
        assert!(params.password_ok());
    }
}
