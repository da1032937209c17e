use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use linef1_lib::{EngineConfig, LineF1, SerialConfig};
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Beam measurement to stream. The instrument runs one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Beam {
    Distance,
    Velocity,
    Off,
}

/// Stream measurements from a LINE F1 laser interferometer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port of the instrument (e.g. COM7, /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,
    /// Beam measurement to enable.
    #[arg(short, long, value_enum, default_value_t = Beam::Distance)]
    beam: Beam,
    /// Do not enable the meteo (air/material) stream.
    #[arg(long)]
    no_meteo: bool,
    /// Number of one-second iterations.
    #[arg(short, long, default_value_t = 1)]
    seconds: u32,
    /// Acknowledgment timeout per attempt, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    ack_timeout_ms: u64,
    /// Retransmissions before a command is given up.
    #[arg(long, default_value_t = 10)]
    retries: u32,
    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    if let Err(e) = run(&cli) {
        error!("Application failed: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();

    let Some(path) = &cli.log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
        return Ok(None);
    };

    let file = std::fs::File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn run(cli: &Cli) -> Result<()> {
    let serial = SerialConfig::new(&cli.port);
    let config = EngineConfig::default()
        .with_ack_timeout(Duration::from_millis(cli.ack_timeout_ms))
        .with_max_retries(cli.retries);

    let device =
        LineF1::open_serial(&serial, config).with_context(|| format!("Failed to open instrument on {}", cli.port))?;

    configure(&device, cli).context("Failed to configure instrument")?;

    info!("--- Entering Measurement Loop ---");
    for i in 0..cli.seconds {
        // Drop the backlog so every iteration shows fresh values
        device.flush();

        match cli.beam {
            Beam::Distance => println!("[{}] {}", i + 1, device.read_distance()?),
            Beam::Velocity => println!("[{}] {}", i + 1, device.read_velocity()?),
            Beam::Off => {}
        }
        if !cli.no_meteo {
            println!("[{}] {}", i + 1, device.read_meteo_air()?);
            println!("[{}] {}", i + 1, device.read_meteo_mat()?);
        }

        sleep(Duration::from_secs(1));
    }

    device.stop_all_streams().context("Failed to stop streams")?;
    let stats = device.stats();
    info!(
        measurements = stats.measurements,
        acks = stats.acks,
        desyncs = stats.desyncs,
        short_reads = stats.short_reads,
        "Link statistics"
    );
    device.close().context("Failed to close connection")?;
    Ok(())
}

fn configure(device: &LineF1, cli: &Cli) -> Result<()> {
    info!("--- Configuring Streams ---");
    // Switch the unused beam off first; both may never be on together
    match cli.beam {
        Beam::Distance => {
            device.set_velocity_stream(false)?;
            device.set_distance_stream(true)?;
        }
        Beam::Velocity => {
            device.set_distance_stream(false)?;
            device.set_velocity_stream(true)?;
        }
        Beam::Off => {
            device.set_distance_stream(false)?;
            device.set_velocity_stream(false)?;
        }
    }
    device.set_meteo_stream(!cli.no_meteo)?;

    info!("--- Clearing Flags ---");
    device.clear_velocity_overflow_flag()?;
    device.clear_small_signal_flag()?;

    device.reset_origin()?;
    info!("Instrument configured.");
    Ok(())
}
