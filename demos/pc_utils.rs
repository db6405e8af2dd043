#![allow(dead_code)]
// This allows us to share code between different PC-based demos.

use embedded_hal::serial::{Read, Write};
use log::{LevelFilter, Metadata, Record};
use serialport::prelude::*;
use serialport::{available_ports, open};
use std::cell::RefCell;
use std::io::{Read as IoRead, Write as IoWrite};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 57600;

// We're cheating here and will use the host OS's serial port
// as our UART, and for that we have to implement the read/write
// interfaces from embedded-hal.

pub struct SerialReader<'a>(pub &'a RefCell<Box<dyn SerialPort>>);
pub struct SerialWriter<'a>(pub &'a RefCell<Box<dyn SerialPort>>);

impl Read<u8> for SerialReader<'_> {
    type Error = std::io::Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut buf: [u8; 1] = [0u8];
        match self.0.borrow_mut().read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(nb::Error::WouldBlock),
            // The port timeout already bounded this read.
            Err(e) => Err(nb::Error::Other(e)),
        }
    }
}

impl Write<u8> for SerialWriter<'_> {
    type Error = std::io::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        match self.0.borrow_mut().write(&[word]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.0.borrow_mut().flush().map_err(nb::Error::Other)
    }
}

pub fn print_ports() {
    let ports = available_ports().unwrap();
    for port in ports {
        println!("Available port: {} ({:#?})", port.port_name, port.port_type);
    }
}

pub fn open_port(port_name: &str) -> RefCell<Box<dyn SerialPort>> {
    println!("Using port {}", port_name);
    let mut port = open(port_name).unwrap();
    port.set_baud_rate(DEFAULT_BAUD_RATE).unwrap();
    port.set_timeout(Duration::from_secs(2)).unwrap();
    RefCell::new(port)
}

struct StdoutLogger;

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            println!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

pub fn init_logging(level: LevelFilter) {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(level);
}
