use std::env;

use inquire::Select;
use psu364x::{Outcome, PsuClient, config::LinkConfig};
use serialport::SerialPort;

// Configuration constants - adjust these for your setup
const PSU_ADDRESS: u8 = 0x00;
const OUTPUT_VOLTAGE_V: f32 = 5.5;
const CURRENT_LIMIT_A: f32 = 0.1;
const STABILIZATION_DELAY_MS: u64 = 1000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            // serialport reports an expired read timeout as TimedOut.
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::ReadReady for PortWrapper {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let waiting = self
            .0
            .bytes_to_read()
            .map_err(|e| IoError(std::io::Error::from(e)))?;
        Ok(waiting > 0)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn report<T>(what: &str, outcome: Outcome<T>) -> Option<T> {
    match outcome {
        Outcome::Accepted(value) => Some(value),
        Outcome::Rejected { code, result } => {
            eprintln!("{} rejected by PSU (code=0x{:02X} result=0x{:02X})", what, code, result);
            None
        }
    }
}

fn main() {
    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        // List available serial ports
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        // Interactive selection
        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let config = LinkConfig {
        address: PSU_ADDRESS,
        ..Default::default()
    };
    config.validate().expect("Invalid link configuration");

    // Open serial port
    let port = serialport::new(&port_name, config.baud_rate)
        .timeout(std::time::Duration::from_millis(
            config.response_timeout.to_millis() as u64,
        ))
        .open()
        .expect("Failed to open serial port");

    let port = PortWrapper(port);

    // Create a PSU object
    let mut psu = PsuClient::from_config(port, &config).unwrap();

    // Get and display the identification
    println!("Establishing communication with PSU...");
    if let Some(info) = report("READ_INFO", psu.probe().unwrap()) {
        println!("Power supply {}, serial number {}", info.model, info.serial);
    }

    // Take control away from the front panel
    report("Remote control", psu.enable_remote_control().unwrap());

    // Set output voltage and current limit
    report("Set voltage", psu.set_voltage(OUTPUT_VOLTAGE_V).unwrap());
    println!("Set output voltage to {}V", OUTPUT_VOLTAGE_V);
    report("Set current", psu.set_max_current(CURRENT_LIMIT_A).unwrap());
    println!("Set current limit to {}A", CURRENT_LIMIT_A);

    // Enable the output
    report("Output on", psu.enable_output().unwrap());
    println!("Output enabled");

    // Wait for output to stabilize
    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    // Read and display the operating parameters
    if let Some(params) = report("READ", psu.read_parameters().unwrap()) {
        println!("\n--- Operating Parameters ---");
        println!("Set voltage     : {:<6.2}V", params.voltage_set);
        println!("Maximum voltage : {:<6.2}V", params.max_voltage);
        println!("Maximum current : {:<6.2}A", params.max_current);
        println!("Maximum power   : {:<6.2}W", params.max_power);
        println!("Output state    : {}", if params.output_enabled { "ON" } else { "OFF" });
        println!("Output mode     : {}", if params.excessive_current { "CC" } else { "Normal" });
        println!("Output voltage  : {:<6.3}V", params.measure_voltage);
        println!("Output current  : {:<6.3}A", params.measure_current);
        println!("Output power    : {:<6.2}W", params.measure_power);
    }

    report("Output off", psu.disable_output().unwrap());

    println!("\nClosing connection...");
    psu.close().unwrap();
}
