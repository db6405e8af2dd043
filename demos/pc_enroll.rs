use log::LevelFilter;
use r502_touchpanel::controller::Controller;
use r502_touchpanel::enroll::Phase;
use r502_touchpanel::ui::{self, UiCommand};
use r502_touchpanel::{Sensor, SensorResponse, R502};
use std::{env, thread, time::Duration};

mod pc_utils;
use pc_utils::{init_logging, open_port, print_ports, SerialReader, SerialWriter};

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => print_ports(),
        3 => enroll_to_id(args[1].as_str(), args[2].as_str()),
        _ => panic!("Usage: pc_enroll [port_name] [id]"),
    };
}

fn enroll_to_id(port_name: &str, id: &str) {
    init_logging(LevelFilter::Debug);
    let port_cell = open_port(port_name);

    let reader = SerialReader(&port_cell);
    let writer = SerialWriter(&port_cell);
    let mut r502 = R502::new(writer, reader, 0xffffffff);

    match r502.verify_password() {
        SensorResponse::Ok => println!("Found fingerprint sensor!"),
        other => panic!("Did not find fingerprint sensor: {}", other),
    }

    let mut controller = Controller::new(r502);
    controller.dispatch(UiCommand::StartEnroll).unwrap();
    controller.dispatch(UiCommand::SubmitId(id)).unwrap();
    println!("{}", ui::render(controller.status()));

    let mut last = ui::render(controller.status());
    loop {
        let line = ui::render(controller.tick());
        if line != last {
            println!("{}", line);
            last = line;
        }
        match controller.enroller().map(|e| e.phase()) {
            Some(Phase::Success) | Some(Phase::Failed) | Some(Phase::AwaitingId) => break,
            _ => {}
        }
        thread::sleep(Duration::from_millis(50));
    }

    let mut r502 = controller.release();
    match r502.template_count() {
        Ok(count) => println!("Sensor now contains {} templates", count),
        Err(e) => println!("Could not read template count: {}", e),
    }
}
