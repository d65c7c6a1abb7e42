//! # HayBox Config
//!
//! Inspect and edit the game mode configuration of a HayBox controller.
//!
//! The device is reached through a snapshot file (see
//! [`haybox_config::device::snapshot`]). Serial discovery lists the USB
//! serial ports a controller could be attached to and test-opens the one
//! that would be used.
//!
//! # Examples
//!
//! ```bash
//! haybox-config init-snapshot b0xx.json --device-name B0XX
//! haybox-config --snapshot b0xx.json modes
//! haybox-config --snapshot b0xx.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use haybox_config::connection::{ConnectionManager, ConnectionStatus};
use haybox_config::device::snapshot::{SnapshotConnector, SnapshotFile, SnapshotPortProvider};
use haybox_config::device::PortProvider;
use haybox_config::serial::{list_ports, SerialPortProvider};
use haybox_config::settings::{LoggingSettings, Settings};
use haybox_config::shell::{Shell, Terminal};
use haybox_config::view;

/// Settings file picked up from the working directory when present
const DEFAULT_SETTINGS_FILE: &str = "haybox-config.toml";

#[derive(Debug, Parser)]
#[command(name = "haybox-config", version, about = "HayBox controller configuration tool")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Device snapshot file, overrides the settings
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive configuration session (default)
    Shell,

    /// Connect and print device information
    Info,

    /// Connect and print the game mode list
    Modes,

    /// List serial ports a controller may be attached to
    Ports,

    /// Write an empty device snapshot
    InitSnapshot {
        /// Snapshot file to create
        path: PathBuf,

        /// Device name recorded in the snapshot
        #[arg(long, default_value = "HayBox")]
        device_name: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None if Path::new(DEFAULT_SETTINGS_FILE).exists() => Settings::load(DEFAULT_SETTINGS_FILE)
            .with_context(|| format!("Failed to load settings from {}", DEFAULT_SETTINGS_FILE)),
        None => Ok(Settings::default()),
    }
}

/// Set up tracing; logs go to stderr, or to a file when one is configured
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must live until exit so buffered file output is flushed.
fn init_logging(logging: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_ascii_lowercase()));

    if logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    let path = Path::new(&logging.file);
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", logging.file))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

fn snapshot_manager(path: &Path) -> ConnectionManager<SnapshotPortProvider, SnapshotConnector> {
    ConnectionManager::new(SnapshotPortProvider::new(path), SnapshotConnector)
}

async fn connect_or_bail(
    manager: &mut ConnectionManager<SnapshotPortProvider, SnapshotConnector>,
) -> Result<()> {
    manager.connect().await;
    if manager.status() != ConnectionStatus::Connected {
        bail!("{}", view::connection_summary(manager.status(), manager.error_message()));
    }
    Ok(())
}

async fn run_shell(snapshot: &Path) -> Result<()> {
    let term = Terminal::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let mut shell = Shell::new(snapshot_manager(snapshot), term);

    tokio::select! {
        result = shell.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    let _log_guard = init_logging(&settings.logging)?;

    info!("HayBox Config v{} starting...", env!("CARGO_PKG_VERSION"));

    let snapshot = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.device.snapshot_path));
    debug!("Using snapshot {}", snapshot.display());

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(&snapshot).await?,
        Commands::Info => {
            let mut manager = snapshot_manager(&snapshot);
            connect_or_bail(&mut manager).await?;
            if let Some(info) = manager.device_info() {
                println!("{}", view::device_info(info));
            }
        }
        Commands::Modes => {
            let mut manager = snapshot_manager(&snapshot);
            connect_or_bail(&mut manager).await?;
            match manager.config() {
                Some(config) => println!("{}", view::mode_list(&config.game_mode_configs)),
                None => println!("Device returned no configuration"),
            }
        }
        Commands::Ports => {
            let candidates = list_ports(&settings.serial.usb_vendor_ids)?;
            println!("{}", view::port_list(&candidates));

            let provider = SerialPortProvider::new(
                settings.serial_port().map(str::to_string),
                settings.serial.baud_rate,
                settings.serial.usb_vendor_ids.clone(),
            );
            match provider.request_port().await {
                Ok(port) => println!("Selected: {} (opens at {} baud)", port, settings.serial.baud_rate),
                Err(e) => println!("No usable port: {}", e),
            }
        }
        Commands::InitSnapshot {
            path,
            device_name,
            force,
        } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            SnapshotFile::blank(&device_name)
                .write(&path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Created {}", path.display());
        }
    }

    Ok(())
}
