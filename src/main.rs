use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::brightness::BrightnessProcessor;
use crate::config::{AppConfig, DisplayMode};
use crate::daemon::BrightnessDaemon;
use crate::error::Result;
use crate::monitor::{CompositeController, DisplayBackend, DisplayManager, MonitorDiscovery, MonitorInfo};
use crate::protocols::DisplayProtocol;
use crate::transport::LineSource;

#[macro_use]
extern crate tracing;

mod brightness;
mod calibration;
mod config;
mod daemon;
mod error;
mod monitor;
mod protocols;
mod sensor;
mod transport;

#[derive(Parser, Debug)]
#[command(name = "ambient-brightness")]
#[command(version)]
#[command(about = "Adjust display brightness from a serial ambient-light sensor")]
#[command(long_about = "Adjust display brightness from a serial ambient-light sensor

Reads JSON telemetry lines ({\"deviceId\", \"sensorId\", \"ts\", \"value\"}) from
a serial port and drives built-in backlights and DDC/CI monitors.

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Enable debug logging

FILES:
    ~/.config/ambient-brightness/appsettings.json   Default configuration")]
struct Cli {
    /// Path to appsettings.json
    config: Option<PathBuf>,

    /// Override serial.portName from the config file
    #[arg(long)]
    port: Option<String>,

    /// List detected displays and exit
    #[arg(long)]
    list_monitors: bool,

    /// Skip startup calibration
    #[arg(long)]
    no_calibration: bool,
}

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=info",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> ExitCode {
    setup_logs();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(AppConfig::resolve_default_path);
    let mut config = AppConfig::load(&path)?;
    if let Some(port) = cli.port {
        config.serial.port_name = port;
        config.validate()?;
    }
    if cli.no_calibration {
        config.calibration.enabled = false;
    }

    let mut discovery = MonitorDiscovery::new(config.displays.backlight_root.clone());
    let mut backends = discovery.discover();

    if cli.list_monitors {
        discovery.log_detected(&backends);
        list_monitors(&mut backends);
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let source = transport::open_serial(&config.serial)?;
    info!("Running. Press Ctrl+C to stop.");

    let new_processor =
        || BrightnessProcessor::new(config.processing.clone(), config.brightness.clone());

    match config.displays.mode {
        DisplayMode::PerMonitor => {
            discovery.log_detected(&backends);
            let mut manager = DisplayManager::new();
            for backend in backends {
                manager.add(backend, new_processor());
            }
            start(source, manager, &config, running)
        }
        DisplayMode::Combined => {
            let composite = CompositeController::new(backends);
            composite.log_detected_monitors(&mut discovery);
            let mut manager = DisplayManager::new();
            manager.add(composite, new_processor());
            start(source, manager, &config, running)
        }
    }
}

fn start<S: LineSource, C: DisplayProtocol>(
    mut source: S,
    mut manager: DisplayManager<C>,
    config: &AppConfig,
    running: Arc<AtomicBool>,
) -> Result<()> {
    if manager.is_empty() {
        warn!("No displays to drive, sensor readings will only be parsed");
    }

    calibration::calibrate_displays(&mut manager, &mut source, &config.calibration, &running)?;

    BrightnessDaemon::new(source, manager, running).run()
}

fn list_monitors(backends: &mut [DisplayBackend]) {
    if backends.is_empty() {
        println!("No brightness-capable monitors detected.");
        return;
    }

    for backend in backends {
        let MonitorInfo { source, name } = MonitorInfo::of(&*backend);
        let id = backend.id();
        match backend.get_brightness() {
            Ok(value) => println!("{source}: {name} ({id}) - {value}%"),
            Err(e) => println!("{source}: {name} ({id}) - brightness unavailable: {e:#}"),
        }
    }
}
