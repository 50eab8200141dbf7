//! `gcsim` command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand, ValueEnum};
use gcsim_emulator::{
    catalog, dump_frame, ConfigOverrides, CorruptionSettings, DeviceTransport, Emulator,
    EmulatorConfig, EmulatorError, SharedTransport,
};
use gcsim_metrics::InMemoryRecorder;
use gcsim_packet::PacketKind;
use gcsim_uart_protocol::InterfaceMode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gcsim", version, about = "Ground-control link emulator")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Emulate AV, GSE and GCS traffic into a device.
    Run(RunArgs),
    /// Print one rendered frame and its values as JSON.
    Dump(DumpArgs),
    /// Print the packet catalog.
    Catalog,
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// YAML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device path to write frames to.
    #[arg(long)]
    device: Option<PathBuf>,

    #[arg(long, value_enum)]
    interface_type: Option<InterfaceArg>,

    /// Cycle normally-constant fields through their edge states.
    #[arg(long)]
    experimental: bool,

    /// Enable bit-flip corruption.
    #[arg(long)]
    corruption: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Print collected metrics to stdout when the run ends.
    #[arg(long, value_enum)]
    metrics_output: Option<MetricsOutput>,
}

#[derive(Debug, clap::Args)]
struct DumpArgs {
    /// Packet kind, e.g. AV_TO_GCS_DATA_1 or av-to-gcs-data-1.
    #[arg(long)]
    kind: String,

    /// Seconds since start to synthesize values for.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    #[arg(long, value_enum, default_value_t = InterfaceArg::Raw)]
    interface_type: InterfaceArg,

    /// Noise coefficient, 0 for clean signals.
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    #[arg(long)]
    experimental: bool,

    #[arg(long)]
    corruption: bool,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InterfaceArg {
    Raw,
    TextUart,
}

impl From<InterfaceArg> for InterfaceMode {
    fn from(arg: InterfaceArg) -> Self {
        match arg {
            InterfaceArg::Raw => InterfaceMode::Raw,
            InterfaceArg::TextUart => InterfaceMode::TextUart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricsOutput {
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Dump(args) => dump(args),
        Commands::Catalog => {
            print_catalog();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: RunArgs) -> Result<(), EmulatorError> {
    let mut config = match &args.config {
        Some(path) => EmulatorConfig::load(path)?,
        None => EmulatorConfig::default(),
    };
    ConfigOverrides {
        device_path: args.device,
        interface_mode: args.interface_type.map(Into::into),
        experimental: args.experimental,
        corruption: args.corruption,
        seed: args.seed,
        run_for_secs: args.duration,
    }
    .apply(&mut config)?;

    // without a recorder the metrics macros are no-ops
    let recorder = args.metrics_output.map(|_| InMemoryRecorder::new());
    if let Some(recorder) = &recorder {
        if metrics::set_global_recorder(recorder.clone()).is_ok() {
            gcsim_metrics::describe_metrics();
        }
    }

    let transport = DeviceTransport::new(config.require_device_path()?);
    let emulator = Emulator::new(config, SharedTransport::new(transport))?;

    let stop = emulator.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })?;

    let summary = emulator.run()?;
    for (device, stats) in &summary.devices {
        info!(
            "{}: {} generated, {} written, {} dropped, {} gated, {} corrupted, {} encode errors, {} transport errors",
            device,
            stats.generated,
            stats.written,
            stats.dropped,
            stats.gated,
            stats.corrupted,
            stats.encode_errors,
            stats.transport_errors
        );
    }

    if let (Some(MetricsOutput::Json), Some(recorder)) = (args.metrics_output, &recorder) {
        match serde_json::to_string_pretty(&recorder.export()) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to serialize metrics: {}", e),
        }
    }
    Ok(())
}

fn dump(args: DumpArgs) -> Result<(), EmulatorError> {
    let kind: PacketKind = args.kind.parse()?;
    let config = EmulatorConfig {
        noise_coefficient: args.noise,
        interface_mode: args.interface_type.into(),
        experimental: args.experimental,
        seed: args.seed,
        corruption: CorruptionSettings {
            enabled: args.corruption,
            ..Default::default()
        },
        ..Default::default()
    };

    let dump = dump_frame(&config, kind, args.time)?;
    match serde_json::to_string_pretty(&dump) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("failed to serialize frame dump: {}", e),
    }
    Ok(())
}

fn print_catalog() {
    let rule = |l: &str, m: &str, r: &str| {
        println!(
            "{}{}{}{}{}{}{}{}{}{}{}",
            l,
            "─".repeat(29),
            m,
            "─".repeat(6),
            m,
            "─".repeat(8),
            m,
            "─".repeat(9),
            m,
            "─".repeat(10),
            r
        );
    };

    rule("┌", "┬", "┐");
    println!(
        "│ {:^27} │ {:^4} │ {:^6} │ {:^7} │ {:^8} │",
        "Packet", "ID", "Origin", "Raw len", "UART LEN"
    );
    rule("├", "┼", "┤");
    for entry in catalog() {
        println!(
            "│ {:27} │ 0x{:02X} │ {:6} │ {:>7} │ {:>8} │",
            entry.kind.name(),
            entry.id,
            entry.origin.name(),
            entry.raw_len,
            entry.uart_len
        );
    }
    rule("└", "┴", "┘");
}
