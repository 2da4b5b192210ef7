//! freestyle-hid - command line access to FreeStyle meters over HID.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use freestyle_hid as app;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::export::{ExportFormat, write_records};
use app::freestyle::{FreestyleDevice, HidrawTransport};

/// Talk to FreeStyle blood glucose meters over their HID text protocol.
#[derive(Parser)]
#[command(name = "freestyle-hid", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// hidraw device node, overrides the config file
    #[arg(long)]
    device: Option<PathBuf>,

    /// Enable debug logging (packet dumps)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show firmware version, serial number, patient name and clock
    Info,
    /// Read or set the meter clock
    Datetime {
        /// New clock value, e.g. 2025-01-31T14:05
        #[arg(long, conflicts_with = "now")]
        set: Option<String>,
        /// Set the clock to the current local time
        #[arg(long)]
        now: bool,
    },
    /// Read or set the patient name
    PatientName {
        #[arg(long)]
        set: Option<String>,
    },
    /// Dump a multi-record table, e.g. `$result?`
    Records {
        command: String,
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
    /// Send a text command and print the reply
    Raw { command: String },
    /// Write a default config file
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => config,
        ConfigLoadResult::Missing => AppConfig::default(),
        ConfigLoadResult::Invalid(e) => {
            return Err(e).with_context(|| format!("Invalid config {}", config_path.display()));
        }
    };
    if let Some(device) = cli.device {
        config.device.path = device;
    }

    let _guard = init_logging(&config.logging, cli.verbose)?;
    tracing::debug!("Config path: {:?}", config_path);

    if let Command::InitConfig = cli.command {
        config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let transport = HidrawTransport::open(&config.device.path)
        .with_context(|| format!("Failed to open {}", config.device.path.display()))?;
    let mut device = FreestyleDevice::with_options(transport, config.device.protocol_options());
    device.connect().context("Device initialization failed")?;

    let result = run(&mut device, cli.command);
    device.disconnect();
    result
}

fn run(device: &mut FreestyleDevice<HidrawTransport>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Info => {
            println!("Version:       {}", device.version()?);
            println!("Serial number: {}", device.serial_number()?);
            println!(
                "Patient name:  {}",
                device.patient_name()?.as_deref().unwrap_or("(not set)")
            );
            match device.datetime() {
                Ok(datetime) => println!("Clock:         {datetime}"),
                Err(e) => println!("Clock:         {e}"),
            }
        }
        Command::Datetime { set, now } => {
            let datetime = match (set, now) {
                (Some(value), _) => device.set_datetime(parse_datetime(&value)?)?,
                (None, true) => device.set_datetime_now()?,
                (None, false) => device.datetime()?,
            };
            println!("{datetime}");
        }
        Command::PatientName { set: Some(name) } => {
            device.set_patient_name(&name)?;
            println!("Patient name set");
        }
        Command::PatientName { set: None } => match device.patient_name()? {
            Some(name) => println!("{name}"),
            None => println!("(not set)"),
        },
        Command::Records { command, format } => {
            let records = device
                .multirecord(command.as_bytes())?
                .collect::<app::Result<Vec<_>>>()?;
            let count = write_records(&mut io::stdout().lock(), &command, records, format)?;
            tracing::info!("Exported {count} records");
        }
        Command::Raw { command } => {
            print!("{}", device.send_text_command(command.as_bytes())?);
        }
        Command::InitConfig => bail!("init-config does not talk to the device"),
    }
    Ok(())
}

fn parse_datetime(value: &str) -> anyhow::Result<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("Unrecognized date/time {value:?}, expected YYYY-MM-DDTHH:MM"))
}

/// Install the tracing subscriber. The returned guard flushes the log file on drop.
fn init_logging(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let Some(file) = &logging.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    };

    let dir = file.parent().unwrap_or(Path::new("."));
    let name = file.file_name().context("Log file path has no file name")?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr.and(writer))
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
