//! Core library for the music player's playback and visualization engine.
//!
//! Each module owns one subsystem: the library backend contract, the
//! playlist and playback state machine, the shared analysis pipeline, the
//! visualizers and the render loop that drives them. [`Player`] ties them
//! together for an embedding host, which supplies the media element and the
//! drawing surface.

pub mod analysis;
pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod playback;
pub mod player;
pub mod playlist;
pub mod record;
pub mod render;
pub mod render_loop;
pub mod scene;

pub use analysis::{AnalysisFrame, AnalysisSource, FrameDomain};
pub use audio::{AnalysisHandle, AudioPipeline, PipelineState};
pub use backend::{HttpBackend, LibraryBackend, StreamResolver};
pub use config::{AnalysisConfig, AppConfig, BackendConfig, SurfaceConfig, VisualizationConfig};
pub use error::{PlayerError, Result};
pub use playback::{
    format_time, EnrichmentTicket, MediaElement, MediaEvent, MoodDisplay, PlaybackController,
    PlaybackSession, PlaybackState, PlayerEvent, Progress, RecommendationDisplay,
};
pub use player::Player;
pub use playlist::{AudioLocator, PlaylistState, TrackDescriptor, TrackId};
pub use record::{Recorder, RecordingSettings};
pub use render::{Canvas, PixelCanvas, Rgba};
pub use render_loop::{FrameClock, LoopState, RenderLoop, TickOutcome};
pub use scene::{VisualizationMode, Visualizer, Visualizers};
