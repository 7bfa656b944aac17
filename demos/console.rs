use std::{env, sync::Arc, time::Duration};

use autolabor_serial::{
    decode::Command,
    packets::Telemetry,
    serial::{self, DEFAULT_BAUD_RATE},
    FrameHandler, LinkConfig, RobotLink,
};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};

struct PrintHandler;

impl FrameHandler for PrintHandler {
    fn on_decoded(&mut self, command: Command) {
        let line = command.to_string();
        match Telemetry::from_command(command) {
            Telemetry::Encoder(report) => {
                info!("Encoder: left {} | right {}", report.left, report.right)
            }
            Telemetry::Battery(report) => info!("Battery: {}", report.level),
            Telemetry::Timeout => warn!("Chassis timed out"),
            Telemetry::Other(_) => {}
        }
        info!("{}", line);
    }

    fn on_checksum_failure(&mut self, raw: Vec<u8>) {
        warn!("received but check failed: {}", Command::checksum_failure(raw));
    }
}

const HELP: &str = "commands: drive <left> <right> | w | s | a | d | x | speed <level> | clear | quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )?;

    let Some(path) = env::args().nth(1) else {
        info!("usage: console <port> [baud]");
        for port in tokio_serial::available_ports()? {
            info!("available: {}", port.port_name);
        }
        return Ok(());
    };
    let baud_rate = match env::args().nth(2) {
        Some(baud) => baud.parse()?,
        None => DEFAULT_BAUD_RATE,
    };

    let (transport, reader) = serial::open(&path, baud_rate, Duration::from_secs(1))?;
    let link = Arc::new(RobotLink::new(transport, LinkConfig::default()));
    let reader = serial::spawn_reader(reader, link.clone(), PrintHandler);
    let config = link.supervisor().config();
    info!(
        "Polling battery every {:?}, repeating velocity every {:?}",
        config.battery_interval, config.velocity_interval
    );
    link.start();

    info!("{}", HELP);

    // The prompt blocks, so it lives on its own thread and hands lines over.
    let (lines_tx, mut lines) = tokio::sync::mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                error!("Could not open prompt: {}", e);
                return;
            }
        };
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    if lines_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    error!("Prompt failed: {}", e);
                    break;
                }
            }
        }
    });

    while let Some(line) = lines.recv().await {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["drive", left, right] => match (left.parse(), right.parse()) {
                (Ok(left), Ok(right)) => {
                    link.drive(left, right).await;
                }
                _ => error!("wheel values must be 16-bit integers"),
            },
            ["w"] => {
                link.drive(1, 1).await;
            }
            ["s"] => {
                link.drive(-1, -1).await;
            }
            ["a"] => {
                link.drive(-1, 1).await;
            }
            ["d"] => {
                link.drive(1, -1).await;
            }
            ["x"] => {
                link.drive(0, 0).await;
            }
            ["speed", level] => match level.parse() {
                Ok(level) => link.supervisor().set_speed_level(level),
                Err(_) => error!("speed level must be between 0 and 255"),
            },
            ["clear"] => {
                link.clear_encoder().await?;
            }
            ["quit"] => break,
            [] => {}
            _ => info!("{}", HELP),
        }
    }

    link.shutdown().await;
    reader.await??;

    Ok(())
}
