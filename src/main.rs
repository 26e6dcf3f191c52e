use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;

use sat_overlay::config::{Config, ConfigError};
use sat_overlay::hud::RecordingSurface;
use sat_overlay::propagation::{
    parse_element_sets, ObserverCoordinate, PropagationEngine, TrackerError,
};
use sat_overlay::scene::{HeadlessBackend, SceneError};
use sat_overlay::sensor::{NullBackend, SensorBackend, SimulatedBackend};
use sat_overlay::view::{ArSettings, ArView, FrameLoop, GlobeSettings, GlobeView, Session};

#[derive(Parser)]
#[command(name = "sat-overlay")]
#[command(about = "Satellite tracking overlay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an element-set JSON file
    Validate { elements: String },
    /// Run a headless tracking session
    Run {
        #[arg(long)]
        config: String,
        #[arg(long, value_enum, default_value_t = ViewKind::Globe)]
        view: ViewKind,
        #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
        duration: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ViewKind {
    Globe,
    Ar,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("tracker: {0}")]
    Tracker(#[from] TrackerError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { elements } => validate(&elements),
        Commands::Run {
            config,
            view,
            duration,
        } => match run(&config, view, duration) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn validate(path: &str) -> ExitCode {
    let json = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sets = match parse_element_sets(&json) {
        Ok(sets) => sets,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match PropagationEngine::new(&sets, ObserverCoordinate::default()) {
        Ok(engine) => {
            println!(
                "Element sets are valid ({} of {} usable)",
                engine.len(),
                sets.len()
            );
            for (i, set) in sets.iter().enumerate() {
                println!(
                    "  {}: {} [{}] epoch {}",
                    i + 1,
                    set.object_name,
                    set.norad_cat_id,
                    set.epoch
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("No usable element sets: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str, view: ViewKind, duration: Duration) -> Result<(), RunError> {
    let config = Config::from_file(path)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(config, view, duration))
}

async fn run_session(config: Config, view: ViewKind, duration: Duration) -> Result<(), RunError> {
    let sensors: Box<dyn SensorBackend> = if config.sensors.simulated {
        Box::new(SimulatedBackend::new(
            config.observer,
            config.sensors.frequency_hz,
        ))
    } else {
        Box::new(NullBackend)
    };

    let mut session = Session::new(sensors);
    session.start(
        config.tracker.elements.clone(),
        config.observer,
        config.tracker.period,
    )?;

    let mut frames = FrameLoop::new(config.view.frame_interval());
    let cancel = frames.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        cancel.cancel();
    });

    let (width, height) = (config.view.width, config.view.height);
    println!("Running {:?} view for {:?}", view, duration);
    match view {
        ViewKind::Globe => {
            let settings = GlobeSettings {
                period: config.tracker.period,
                stall_factor: config.tracker.stall_factor,
                ..GlobeSettings::default()
            };
            let mut globe = GlobeView::new(HeadlessBackend::new(), width, height, settings);
            globe.attach(&mut session)?;
            globe.run(&mut frames).await;
            println!(
                "{} frames, {} objects on the globe",
                globe.backend().frames_drawn(),
                globe.instances().count()
            );
            globe.detach();
        }
        ViewKind::Ar => {
            let settings = ArSettings {
                period: config.tracker.ar_period,
                stall_factor: config.tracker.stall_factor,
                ..ArSettings::default()
            };
            let mut ar = ArView::new(
                HeadlessBackend::new(),
                RecordingSurface::new(width, height),
                settings,
            );
            ar.attach(&mut session, config.sensors.camera);
            ar.run(&mut session, &mut frames).await;
            println!(
                "{} frames, {} targets above the horizon, capability {}",
                ar.backend().frames_drawn(),
                ar.pool().len(),
                session.sensors.capability()
            );
            for label in ar.surface().labels() {
                println!("  {}", label.text);
            }
            ar.detach();
        }
    }

    let status = session.tracker.status();
    println!("Tracker {:?} after {} ticks", status.mode, status.ticks);
    session.shutdown().await;
    Ok(())
}
