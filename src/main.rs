use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mettler_toledo_device::device::shaker::DEFAULT_SPEED_TARGET;
use mettler_toledo_device::serial::list_candidate_ports;
use mettler_toledo_device::{
    Balance, DeviceFamily, Discovery, PortOpener, SerialConfig, SerialConnector, SerialInterface,
    Shaker,
};

#[derive(Parser)]
#[command(name = "mtsics")]
#[command(about = "Talk to Mettler Toledo balances and BioShake shakers over MT-SICS")]
struct Cli {
    /// Path to a JSON serial configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the device; found by discovery when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Override the baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Probe only these ports during discovery
    #[arg(long = "try-port")]
    try_ports: Vec<String>,

    /// Log every request and reply
    #[arg(long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the serial ports discovery would probe
    Ports,
    /// Probe candidate ports for devices of a family (balance or shaker)
    Scan { family: DeviceFamily },
    /// Balance operations
    Balance {
        #[command(subcommand)]
        op: BalanceOp,
    },
    /// Shaker operations
    Shaker {
        #[command(subcommand)]
        op: ShakerOp,
    },
}

#[derive(Subcommand)]
enum BalanceOp {
    /// Immediate weight, stable or dynamic
    Weight,
    /// Stable weight, if the balance has settled
    WeightStable,
    /// Zero immediately
    Zero,
    /// Zero once stable
    ZeroStable,
    /// Serial number
    Serial,
    /// Identification data
    Info,
    /// Soft reset
    Reset,
}

#[derive(Subcommand)]
enum ShakerOp {
    /// Model description, version and state
    Info,
    /// Shake and ELM state
    State,
    /// Start shaking
    On {
        #[arg(long, default_value_t = DEFAULT_SPEED_TARGET)]
        speed: u32,
        /// Stop automatically after this many seconds
        #[arg(long)]
        runtime: Option<u64>,
    },
    /// Stop shaking and return home
    Off,
    /// Start temperature control
    TempOn { celsius: f64 },
    /// Stop temperature control
    TempOff,
    /// Target, actual and limit temperatures
    Temps,
    /// Lock the microplate
    Lock,
    /// Unlock the microplate
    Unlock,
    /// Edge Locking Mechanism state
    Elm,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&cli)?;
    let connector = SerialConnector::new(config.clone());

    match cli.command {
        Commands::Ports => {
            for port in list_candidate_ports(&config)? {
                println!("{}", port);
            }
        }
        Commands::Scan { family } => {
            let devices = Discovery::new(&connector)
                .with_tracing(config.debug)
                .scan(family)?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        Commands::Balance { op } => {
            let transport = open(&connector, cli.port.as_deref(), DeviceFamily::Balance)?;
            let mut balance = Balance::new(transport).with_tracing(config.debug);
            let outcome = run_balance(&mut balance, op);
            finish(outcome, balance.close())?;
        }
        Commands::Shaker { op } => {
            let transport = open(&connector, cli.port.as_deref(), DeviceFamily::Shaker)?;
            let mut shaker = Shaker::new(transport).with_tracing(config.debug);
            let outcome = run_shaker(&mut shaker, op);
            finish(outcome, shaker.close())?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<SerialConfig> {
    let mut config = match &cli.config {
        Some(path) => SerialConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => SerialConfig::default(),
    };

    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if !cli.try_ports.is_empty() {
        config.try_ports = Some(cli.try_ports.clone());
    }
    config.debug |= cli.debug;

    log::debug!("Serial config: {:?}", config);
    Ok(config)
}

fn open(
    connector: &SerialConnector,
    port: Option<&str>,
    family: DeviceFamily,
) -> Result<SerialInterface> {
    match port {
        Some(port) => connector
            .open(port)
            .with_context(|| format!("Failed to open {}", port)),
        None => Discovery::new(connector)
            .with_tracing(connector.config().debug)
            .connect(family)
            .with_context(|| format!("Failed to find a {}", family)),
    }
}

/// Report the operation's error first; a close failure only matters if the operation succeeded.
fn finish(outcome: Result<()>, closed: mettler_toledo_device::device::Result<()>) -> Result<()> {
    match (outcome, closed) {
        (Err(e), Err(close_error)) => {
            log::warn!("Failed to close port: {}", close_error);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed.context("Failed to close port"),
    }
}

fn run_balance(balance: &mut Balance<SerialInterface>, op: BalanceOp) -> Result<()> {
    match op {
        BalanceOp::Weight => println!("{}", balance.get_weight()?),
        BalanceOp::WeightStable => match balance.get_weight_stable()? {
            Some(reading) => println!("{}", reading),
            None => println!("No stable weight available"),
        },
        BalanceOp::Zero => println!("Zeroed ({:?})", balance.zero()?),
        BalanceOp::ZeroStable => {
            if balance.zero_stable()? {
                println!("Zeroed");
            } else {
                println!("Balance not stable, not zeroed");
            }
        }
        BalanceOp::Serial => println!("{}", balance.get_serial_number()?),
        BalanceOp::Info => {
            println!("Serial number: {}", balance.get_serial_number()?);
            println!("Balance data: {}", balance.get_balance_data()?.join(" "));
            println!("Software version: {}", balance.get_software_version()?.join(" "));
            println!("MT-SICS level: {}", balance.get_mtsics_level()?.join(" "));
        }
        BalanceOp::Reset => balance.reset()?,
    }
    Ok(())
}

fn run_shaker(shaker: &mut Shaker<SerialInterface>, op: ShakerOp) -> Result<()> {
    match op {
        ShakerOp::Info => {
            println!("Description: {}", shaker.get_description()?);
            println!("Version: {}", shaker.get_version()?);
            println!("{}", shaker.info()?);
        }
        ShakerOp::State => {
            let shake = shaker.get_shake_state()?;
            let elm = shaker.get_elm_state()?;
            println!("Shake state: {} {}", shake.code, shake.description);
            println!("ELM state: {} {}", elm.code, elm.description);
            println!("Actual speed: {} rpm", shaker.get_shake_actual_speed()?);
        }
        ShakerOp::On { speed, runtime } => match runtime {
            Some(secs) => shaker.shake_on_with_runtime(Duration::from_secs(secs), speed)?,
            None => shaker.shake_on(speed)?,
        },
        ShakerOp::Off => shaker.shake_off()?,
        ShakerOp::TempOn { celsius } => shaker.temp_on(celsius)?,
        ShakerOp::TempOff => shaker.temp_off()?,
        ShakerOp::Temps => {
            println!("Target: {} °C", shaker.get_temp_target()?);
            println!("Actual: {} °C", shaker.get_temp_actual()?);
            println!(
                "Range: {} to {} °C",
                shaker.get_temp_min()?,
                shaker.get_temp_max()?
            );
        }
        ShakerOp::Lock => shaker.set_elm_lock_pos()?,
        ShakerOp::Unlock => shaker.set_elm_unlock_pos()?,
        ShakerOp::Elm => {
            let elm = shaker.get_elm_state()?;
            println!("{} {}", elm.code, elm.description);
        }
    }
    Ok(())
}
