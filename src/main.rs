// SPDX-License-Identifier: GPL-3.0-only

use camera_photo::backends::camera::{CapturePreset, DeviceSelection};
use camera_photo::config::Config;
use camera_photo::terminal;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-photo")]
#[command(about = "Rotated camera preview with still capture")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Capture device: test-pattern, camera or file:<path>
    #[arg(short, long, global = true)]
    device: Option<DeviceSelection>,

    /// Streaming resolution preset
    #[arg(long, global = true, value_enum)]
    preset: Option<PresetArg>,

    /// Rasterize on the GPU (needs the 'gpu' feature)
    #[arg(long, global = true)]
    gpu: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Take a photo
    Photo {
        /// Output file path (default: import into the photo library)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Photo,
    High,
    Medium,
    Low,
}

impl From<PresetArg> for CapturePreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Photo => CapturePreset::Photo,
            PresetArg::High => CapturePreset::High,
            PresetArg::Medium => CapturePreset::Medium,
            PresetArg::Low => CapturePreset::Low,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The terminal viewer owns the screen, so it logs to a file
    init_logging(cli.command.is_none())?;

    let mut config = Config::load();
    if let Some(device) = cli.device {
        config.device = device;
    }
    if let Some(preset) = cli.preset {
        config.preset = preset.into();
    }
    if cli.gpu {
        config.use_gpu = true;
    }

    match cli.command {
        Some(Commands::List) => cli::list_devices(),
        Some(Commands::Photo { output }) => cli::take_photo(config, output),
        None => terminal::run(config),
    }
}

fn init_logging(to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_photo=debug, RUST_LOG=info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if to_file {
        let path = terminal::log_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.init();
    }

    Ok(())
}
