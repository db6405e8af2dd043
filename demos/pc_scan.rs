use log::LevelFilter;
use r502_touchpanel::controller::Controller;
use r502_touchpanel::ui::{self, UiCommand};
use r502_touchpanel::{Sensor, SensorResponse, R502};
use std::{env, thread, time::Duration};

mod pc_utils;
use pc_utils::{init_logging, open_port, print_ports, SerialReader, SerialWriter};

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        2 => run_scan(args[1].as_str()),
        _ => panic!("Usage: pc_scan [port_name]"),
    };
}

fn run_scan(port_name: &str) {
    init_logging(LevelFilter::Info);
    let port_cell = open_port(port_name);

    let reader = SerialReader(&port_cell);
    let writer = SerialWriter(&port_cell);
    let mut r502 = R502::new(writer, reader, 0xffffffff);

    match r502.verify_password() {
        SensorResponse::Ok => println!("Found fingerprint sensor!"),
        other => panic!("Did not find fingerprint sensor: {}", other),
    }
    match r502.template_count() {
        Ok(count) => println!("Sensor contains {} templates", count),
        Err(e) => println!("Could not read template count: {}", e),
    }

    let mut controller = Controller::new(r502);
    controller.dispatch(UiCommand::StartScan).unwrap();

    let mut last = ui::render(controller.status());
    println!("{}", last);
    loop {
        let line = ui::render(controller.tick());
        if line != last {
            println!("{}", line);
            last = line;
        }
        thread::sleep(Duration::from_millis(200));
    }
}
