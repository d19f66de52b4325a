mod decode;
mod media;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use music_player_core::{
    format_time, AppConfig, AudioPipeline, FrameClock, HttpBackend, LibraryBackend, PixelCanvas,
    PlaybackState, Player, PlayerEvent, Recorder, RecordingSettings, TickOutcome,
    VisualizationMode,
};
use tracing_subscriber::EnvFilter;

use crate::media::HeadlessMedia;

fn main() -> music_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.backend.as_deref())?;

    match cli.command {
        Commands::Library(source) => run_library(&config, &source),
        Commands::AddDir { path } => run_add_dir(&config, &path),
        Commands::Play(options) => run_play(config, &options),
    }
}

fn load_config(path: Option<&Path>, backend: Option<&str>) -> music_player_core::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(url) = backend {
        config.backend.base_url = url.to_string();
    }
    Ok(config)
}

fn fetch_tracks(
    backend: &HttpBackend,
    source: &SourceArgs,
) -> music_player_core::Result<Vec<music_player_core::TrackDescriptor>> {
    if source.online {
        backend.search_online(source.query.as_deref())
    } else {
        backend.list_tracks()
    }
}

fn run_library(config: &AppConfig, source: &SourceArgs) -> music_player_core::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let tracks = fetch_tracks(&backend, source)?;
    if tracks.is_empty() {
        tracing::info!("no songs found");
        return Ok(());
    }

    for (index, track) in tracks.iter().enumerate() {
        println!(
            "{index:>3}  {} - {} [{}] {}",
            track.title,
            track.artist,
            track.album,
            format_time(track.duration_seconds)
        );
    }
    Ok(())
}

fn run_add_dir(config: &AppConfig, path: &str) -> music_player_core::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let pipeline = AudioPipeline::new(config.analysis.clone());
    let media = HeadlessMedia::new(pipeline.clone(), |_| Err("playback disabled".into()));
    let mut player = Player::new(config, pipeline, media, PixelCanvas::new(1, 1))?;

    let count = player.add_directory(&backend, path)?;
    tracing::info!(count, "library now lists {count} songs");
    Ok(())
}

fn run_play(mut config: AppConfig, options: &PlayArgs) -> music_player_core::Result<()> {
    if let Some(mode) = options.mode {
        config.visualization.mode = mode;
    }

    let backend = HttpBackend::new(&config.backend)?;
    let pipeline = AudioPipeline::new(config.analysis.clone());
    let fetcher = backend.clone();
    let media = HeadlessMedia::new(pipeline.clone(), move |url| fetcher.fetch_bytes(url));
    let canvas = PixelCanvas::new(config.surface.width, config.surface.height);
    let mut player = Player::new(&config, pipeline, media, canvas)?;

    let tracks = fetch_tracks(&backend, &options.source)?;
    if tracks.is_empty() {
        tracing::info!("no songs found");
        return Ok(());
    }
    player.replace_playlist(tracks);

    if !player.select(options.start) {
        return Err(music_player_core::PlayerError::InvalidInput("start index out of range"));
    }
    if !options.no_visuals {
        player.enable_visualization();
    }

    let mut recorder = match &options.record {
        Some(dir) => {
            let mut recorder = Recorder::new(RecordingSettings {
                output_dir: dir.clone(),
                every_n_frames: options.every,
            });
            recorder.start()?;
            Some(recorder)
        }
        None => None,
    };

    let mut clock = FrameClock::new(config.visualization.fps);
    let step = clock.interval().as_secs_f64();

    for _ in 0..options.frames {
        if options.realtime {
            clock.wait();
        }

        player.media_mut().advance(step);
        for event in player.media_mut().poll_events() {
            player.handle_media_event(event);
        }
        player.run_enrichment(&backend);

        let outcome = player.tick();
        if let (TickOutcome::Rendered(_), Some(recorder)) = (outcome, recorder.as_mut()) {
            recorder.capture(player.canvas())?;
        }

        for event in player.drain_events() {
            report(&event);
        }
        if player.state() == PlaybackState::Idle {
            tracing::info!("playback stopped");
            break;
        }
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.stop()?;
    }
    let progress = player.progress();
    tracing::info!(
        elapsed = %progress.elapsed_label(),
        total = %progress.total_label(),
        frames = player.render_loop().frames_rendered(),
        "session finished"
    );
    Ok(())
}

fn report(event: &PlayerEvent) {
    match event {
        PlayerEvent::TrackChanged { index, track, .. } => {
            tracing::info!(index, title = %track.title, artist = %track.artist, "now playing");
        }
        PlayerEvent::Loading { index } => tracing::debug!(index, "loading"),
        PlayerEvent::Played { index } => tracing::info!(index, "playing"),
        PlayerEvent::Paused { index } => tracing::info!(?index, "paused"),
        PlayerEvent::Faulted { index, reason } => {
            tracing::error!(?index, %reason, "playback failed");
        }
        PlayerEvent::Progress(progress) => {
            tracing::trace!(
                elapsed = %progress.elapsed_label(),
                remaining = %progress.remaining_label(),
                "progress"
            );
        }
        PlayerEvent::MoodChanged(mood) => tracing::info!(%mood, "mood"),
        PlayerEvent::RecommendationChanged(recommendation) => {
            tracing::info!(%recommendation, "recommended next");
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless music player with audio visualizations", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the backend base URL.
    #[arg(short, long, global = true)]
    backend: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the songs the backend knows about.
    Library(SourceArgs),
    /// Register a directory with the backend for scanning.
    AddDir {
        path: String,
    },
    /// Play a track headlessly while running the visualizer.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Use online songs instead of the local library.
    #[arg(long)]
    online: bool,
    /// Free-text query for online songs.
    #[arg(short, long)]
    query: Option<String>,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Playlist index to start from.
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Visualization mode: fractal, bars, waveform or particles.
    #[arg(short, long)]
    mode: Option<VisualizationMode>,
    /// Number of display refreshes to run.
    #[arg(long, default_value_t = 600)]
    frames: u64,
    /// Write rendered frames as PNG files into this directory.
    #[arg(long)]
    record: Option<PathBuf>,
    /// Keep every n-th rendered frame when recording.
    #[arg(long, default_value_t = 1)]
    every: u32,
    /// Pace refreshes in real time instead of as fast as possible.
    #[arg(long)]
    realtime: bool,
    /// Play without rendering.
    #[arg(long)]
    no_visuals: bool,
}
