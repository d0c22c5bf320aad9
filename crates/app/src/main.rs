mod demo;

use std::{path::PathBuf, sync::Arc};

use clap::{builder::TypedValueParser, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use visbridge_core::{
    AppConfig, AudioFormat, Host, Rect, RenderCoordinator, SharedConfig, TickOutcome,
    VisualisationLifecycle, VisualisationSlot,
};

use crate::demo::{DemoFactory, DemoMetadata, LogEvents, LogSurface, SyntheticPlayback};

fn main() -> visbridge_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            vis,
            frames,
            stop_after,
            bits,
        } => run(config.as_ref(), vis, frames, stop_after, bits),
        Commands::Config => {
            println!("{}", AppConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn run(
    config: Option<&PathBuf>,
    vis: Option<String>,
    frames: u64,
    stop_after: Option<u64>,
    bits: u16,
) -> visbridge_core::Result<()> {
    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let surface = config.surface;
    let settings = SharedConfig::new(config);
    if let Some(vis) = vis {
        settings.select(vis.as_str());
    }
    tracing::info!(
        visualisation = %settings.snapshot().visualisation.selected,
        frames,
        bits,
        "starting synthetic playback"
    );

    let playback = Arc::new(SyntheticPlayback::new(
        AudioFormat::new(2, 44_100, bits),
        440.0,
    ));
    let host = Host {
        factory: Arc::new(DemoFactory),
        playback: playback.clone(),
        metadata: Arc::new(DemoMetadata),
        surface: Arc::new(LogSurface::new(surface.width, surface.height)),
        config: Arc::new(settings),
        events: Arc::new(LogEvents),
    };
    let lifecycle = VisualisationLifecycle::new(
        VisualisationSlot::new(),
        host,
        Rect::new(0.0, 0.0, surface.width, surface.height),
    );
    let mut coordinator = RenderCoordinator::new(lifecycle);

    playback.set_playing(true);
    let mut rendered = 0_u64;
    for frame in 0..frames {
        if stop_after == Some(frame) {
            tracing::info!(frame, "stopping playback");
            playback.set_playing(false);
        }
        playback.pump();

        let outcome = coordinator.tick();
        tracing::debug!(frame, ?outcome, "frame");
        if outcome == TickOutcome::Rendered {
            rendered += 1;
        }
    }

    coordinator.release_resources();
    tracing::info!(rendered, "done");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Visualisation host driven by synthetic audio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a test tone through the visualisation pipeline.
    Run {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Visualisation to select, overriding the configuration.
        #[arg(long)]
        vis: Option<String>,
        /// Number of render ticks to run.
        #[arg(long, default_value_t = 120)]
        frames: u64,
        /// Tick at which playback stops.
        #[arg(long)]
        stop_after: Option<u64>,
        /// Bit depth of the generated PCM (8, 16, 24 or 32 for float).
        #[arg(long, default_value_t = 16, value_parser = clap::builder::PossibleValuesParser::new(["8", "16", "24", "32"]).map(|s| s.parse::<u16>().unwrap_or(16)))]
        bits: u16,
    },
    /// Print the default configuration as JSON.
    Config,
}
