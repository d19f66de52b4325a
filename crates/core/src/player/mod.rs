//! The engine object an embedding UI talks to.
//!
//! [`Player`] owns one playback controller, the shared analysis pipeline, the
//! render loop and its drawing surface. Every user action and media
//! notification goes through it so the pipeline can be reset whenever the
//! audio source changes.

use crate::{
    playback::{
        MediaElement, MediaEvent, PlaybackController, PlaybackSession, PlaybackState,
        PlayerEvent, Progress,
    },
    AppConfig, AudioPipeline, Canvas, LibraryBackend, LoopState, PlayerError, PlaylistState,
    RenderLoop, Result, StreamResolver, TickOutcome, TrackDescriptor, VisualizationMode,
    Visualizers,
};

/// Engine object for one embedding context: playback, analysis and
/// visualization behind a single owner.
pub struct Player<M, C> {
    controller: PlaybackController<M>,
    pipeline: AudioPipeline,
    render_loop: RenderLoop,
    canvas: C,
}

impl<M: MediaElement, C: Canvas> Player<M, C> {
    /// Builds the engine around a host media element and drawing surface.
    /// The pipeline is shared with the host, which feeds decoded samples
    /// into it.
    pub fn new(config: &AppConfig, pipeline: AudioPipeline, media: M, mut canvas: C) -> Result<Self> {
        config.validate()?;
        let resolver = StreamResolver::new(&config.backend.base_url)?;

        canvas.resize(config.surface.width, config.surface.height);
        let visualizers =
            Visualizers::new(&config.visualization, canvas.width(), canvas.height());

        tracing::debug!(
            mode = %config.visualization.mode,
            width = canvas.width(),
            height = canvas.height(),
            "player ready"
        );

        Ok(Self {
            controller: PlaybackController::new(media, resolver),
            pipeline,
            render_loop: RenderLoop::new(config.visualization.mode, visualizers),
            canvas,
        })
    }

    /// Read access to the playback state machine (mood, recommendation,
    /// generation).
    pub fn controller(&self) -> &PlaybackController<M> {
        &self.controller
    }

    pub fn media(&self) -> &M {
        self.controller.media()
    }

    /// Lets the host advance its media element and poll its notifications.
    pub fn media_mut(&mut self) -> &mut M {
        self.controller.media_mut()
    }

    /// The analysis pipeline shared with the host media element.
    pub fn pipeline(&self) -> &AudioPipeline {
        &self.pipeline
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// The drawing surface, e.g. for snapshots after a rendered tick.
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn playlist(&self) -> &PlaylistState {
        self.controller.playlist()
    }

    pub fn session(&self) -> PlaybackSession {
        self.controller.session()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn progress(&self) -> Progress {
        self.controller.progress()
    }

    /// Takes the transition events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.controller.drain_events()
    }

    // Library

    /// Reloads the local listing. The active track keeps playing and stays
    /// highlighted when it is still listed.
    pub fn refresh_library(&mut self, backend: &dyn LibraryBackend) -> Result<usize> {
        let tracks = backend.list_tracks().map_err(|err| {
            tracing::warn!(%err, "failed to list tracks");
            err
        })?;
        let count = tracks.len();
        self.controller.replace_playlist_preserving(tracks);
        tracing::info!(count, "library loaded");
        Ok(count)
    }

    /// Replaces the listing with online results.
    pub fn load_online(&mut self, backend: &dyn LibraryBackend, query: Option<&str>) -> Result<usize> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let tracks = backend.search_online(query).map_err(|err| {
            tracing::warn!(%err, ?query, "online search failed");
            err
        })?;
        let count = tracks.len();
        self.controller.replace_playlist(tracks);
        tracing::info!(count, ?query, "online tracks loaded");
        Ok(count)
    }

    /// Registers a directory with the backend and reloads the listing.
    pub fn add_directory(&mut self, backend: &dyn LibraryBackend, path: &str) -> Result<usize> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PlayerError::InvalidInput("Please enter a directory path"));
        }
        backend.add_directory(path).map_err(|err| {
            tracing::warn!(%err, path, "failed to add directory");
            err
        })?;
        tracing::info!(path, "directory added");
        self.refresh_library(backend)
    }

    /// Swaps the listing without consulting the backend; clears the cursor.
    pub fn replace_playlist(&mut self, tracks: Vec<TrackDescriptor>) {
        self.controller.replace_playlist(tracks);
    }

    /// Hides entries not matching `query`.
    pub fn filter(&mut self, query: &str) {
        self.controller.filter(query);
    }

    // Playback

    /// Plays the entry at `index`; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        self.track_source_change(|controller| controller.select(index))
    }

    pub fn next(&mut self) -> bool {
        self.track_source_change(PlaybackController::next)
    }

    pub fn previous(&mut self) -> bool {
        self.track_source_change(PlaybackController::previous)
    }

    /// Play/pause. Without a media source this does nothing.
    pub fn toggle_play(&mut self) {
        self.controller.toggle_play();
    }

    pub fn seek_to_offset(&mut self, offset_x: f64, width: f64) -> Option<f64> {
        self.controller.seek_to_offset(offset_x, width)
    }

    pub fn seek_fraction(&mut self, fraction: f64) -> Option<f64> {
        self.controller.seek_fraction(fraction)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.controller.set_volume(volume);
    }

    /// Forwards a media notification. A natural end that advances to the
    /// next track also resets the analysis window.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        self.track_source_change(|controller| {
            controller.handle_media_event(event);
            false
        });
    }

    /// Runs the outstanding mood and recommendation lookups. Returns how
    /// many answers were applied; stale ones are dropped.
    pub fn run_enrichment(&mut self, backend: &dyn LibraryBackend) -> usize {
        let mut applied = 0;
        for ticket in self.controller.take_enrichment_requests() {
            let mood = backend.classify(&ticket.song_id);
            applied += usize::from(self.controller.apply_mood(&ticket, mood));
            let recommendation = backend.recommend(&ticket.song_id);
            applied += usize::from(self.controller.apply_recommendation(&ticket, recommendation));
        }
        applied
    }

    fn track_source_change<F>(&mut self, action: F) -> bool
    where
        F: FnOnce(&mut PlaybackController<M>) -> bool,
    {
        let before = self.controller.generation();
        let result = action(&mut self.controller);
        if self.controller.generation() != before {
            self.pipeline.clear();
        }
        result
    }

    // Visualization

    /// Shows the surface, resumes the pipeline and schedules the first frame.
    pub fn enable_visualization(&mut self) {
        self.render_loop.enable(&self.pipeline);
    }

    /// Hides the surface. The pipeline stops buffering signal until the
    /// visualization is enabled again.
    pub fn disable_visualization(&mut self) {
        self.render_loop.disable();
        self.pipeline.suspend();
    }

    /// Flips the visualization and reports the resulting loop state.
    pub fn toggle_visualization(&mut self) -> LoopState {
        let state = self.render_loop.toggle(&self.pipeline);
        if state == LoopState::Disabled {
            self.pipeline.suspend();
        }
        state
    }

    /// Takes effect on the next tick.
    pub fn set_visualization_mode(&mut self, mode: VisualizationMode) {
        self.render_loop.set_mode(mode);
    }

    /// Matches the drawing surface to its new layout size.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring empty surface size");
            return;
        }
        self.canvas.resize(width, height);
    }

    /// Services one display refresh.
    pub fn tick(&mut self) -> TickOutcome {
        let analysis = self.pipeline.analysis();
        self.render_loop.tick(&analysis, &mut self.canvas)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        playback::{testing::FakeMedia, MoodDisplay, RecommendationDisplay},
        playlist::tests::{local, online},
        render::testing::RecordingCanvas,
    };

    #[derive(Default)]
    struct MemoryBackend {
        local: RefCell<Vec<TrackDescriptor>>,
        online: Vec<TrackDescriptor>,
        fail_listing: bool,
        reject_directories: bool,
        moods: Vec<(String, String)>,
        directories: RefCell<Vec<String>>,
    }

    impl LibraryBackend for MemoryBackend {
        fn list_tracks(&self) -> Result<Vec<TrackDescriptor>> {
            if self.fail_listing {
                return Err(PlayerError::Library("backend unavailable".to_string()));
            }
            Ok(self.local.borrow().clone())
        }

        fn search_online(&self, query: Option<&str>) -> Result<Vec<TrackDescriptor>> {
            Ok(self
                .online
                .iter()
                .filter(|t| query.map_or(true, |q| t.title.contains(q)))
                .cloned()
                .collect())
        }

        fn classify(&self, song_id: &str) -> Result<Option<String>> {
            Ok(self
                .moods
                .iter()
                .find(|(id, _)| id == song_id)
                .map(|(_, mood)| mood.clone()))
        }

        fn recommend(&self, _song_id: &str) -> Result<Option<String>> {
            Err(PlayerError::msg("recommender offline"))
        }

        fn add_directory(&self, path: &str) -> Result<()> {
            if self.reject_directories {
                return Err(PlayerError::Library("Directory does not exist".to_string()));
            }
            self.directories.borrow_mut().push(path.to_string());
            self.local.borrow_mut().push(local("new", "Fresh", 10.0));
            Ok(())
        }
    }

    fn player() -> Player<FakeMedia, RecordingCanvas> {
        let mut config = AppConfig::default();
        config.surface.width = 120;
        config.surface.height = 60;
        config.visualization.seed = Some(5);
        config.visualization.mode = VisualizationMode::Bars;
        let pipeline = AudioPipeline::new(config.analysis.clone());
        Player::new(&config, pipeline, FakeMedia::default(), RecordingCanvas::new(1, 1)).unwrap()
    }

    fn backend() -> MemoryBackend {
        MemoryBackend {
            local: RefCell::new(vec![local("a", "Alpha", 30.0), local("b", "Beta", 40.0)]),
            online: vec![
                online("10", "Remote One", "https://cdn.example/1.mp3"),
                online("11", "Remote Two", "https://cdn.example/2.mp3"),
            ],
            moods: vec![("a".to_string(), "calm".to_string())],
            ..Default::default()
        }
    }

    #[test]
    fn surface_takes_configured_size() {
        let player = player();
        assert_eq!((player.canvas().width(), player.canvas().height()), (120, 60));
    }

    #[test]
    fn select_play_and_enrich_local_track() {
        let backend = backend();
        let mut player = player();
        player.refresh_library(&backend).unwrap();

        assert!(player.select(0));
        player.handle_media_event(MediaEvent::PlayResolved);

        assert_eq!(player.run_enrichment(&backend), 2);
        assert_eq!(player.controller().mood(), &MoodDisplay::Label("calm".to_string()));
        assert_eq!(player.controller().recommendation(), &RecommendationDisplay::Error);
    }

    #[test]
    fn source_change_clears_the_analysis_window() {
        let backend = backend();
        let mut player = player();
        player.refresh_library(&backend).unwrap();
        player.enable_visualization();
        player.pipeline().push_samples(&[0.9; 512]);

        player.select(1);

        let frame = player.pipeline().analysis().sample_time_domain();
        assert!(frame.values.iter().all(|v| *v == 128));
    }

    #[test]
    fn library_failure_leaves_playlist_untouched() {
        let mut backend = backend();
        let mut player = player();
        player.refresh_library(&backend).unwrap();

        backend.fail_listing = true;
        assert!(player.refresh_library(&backend).is_err());
        assert_eq!(player.playlist().len(), 2);
    }

    #[test]
    fn refresh_keeps_active_track() {
        let backend = backend();
        let mut player = player();
        player.refresh_library(&backend).unwrap();
        player.select(1);

        backend.local.borrow_mut().insert(0, local("z", "Zulu", 5.0));
        player.refresh_library(&backend).unwrap();

        assert_eq!(player.session().current_index, Some(2));
        assert_eq!(player.media().play_requests, 1);
    }

    #[test]
    fn add_directory_validates_and_reloads() {
        let mut backend = backend();
        let mut player = player();

        assert!(matches!(
            player.add_directory(&backend, "   "),
            Err(PlayerError::InvalidInput(_))
        ));
        assert_eq!(player.add_directory(&backend, " /music ").unwrap(), 3);
        assert_eq!(backend.directories.borrow().as_slice(), ["/music".to_string()]);

        backend.reject_directories = true;
        assert!(matches!(
            player.add_directory(&backend, "/missing"),
            Err(PlayerError::Library(_))
        ));
        assert_eq!(player.playlist().len(), 3);
    }

    #[test]
    fn online_listing_replaces_and_resets_cursor() {
        let backend = backend();
        let mut player = player();
        player.refresh_library(&backend).unwrap();
        player.select(0);

        assert_eq!(player.load_online(&backend, Some("Two")).unwrap(), 1);
        assert_eq!(player.session().current_index, None);

        player.next();
        player.handle_media_event(MediaEvent::PlayResolved);
        assert_eq!(player.run_enrichment(&backend), 0);
        assert_eq!(
            player.controller().recommendation(),
            &RecommendationDisplay::Title("Remote Two".to_string())
        );
    }

    #[test]
    fn tick_draws_only_while_enabled() {
        let mut player = player();
        assert_eq!(player.tick(), TickOutcome::Idle);

        player.enable_visualization();
        assert_eq!(player.tick(), TickOutcome::Rendered(VisualizationMode::Bars));
        player.set_visualization_mode(VisualizationMode::Fractal);
        assert_eq!(player.tick(), TickOutcome::Rendered(VisualizationMode::Fractal));

        assert_eq!(player.toggle_visualization(), LoopState::Disabled);
        assert_eq!(player.tick(), TickOutcome::Stopped);
        assert_eq!(player.tick(), TickOutcome::Idle);
    }

    #[test]
    fn hiding_visualization_suspends_the_pipeline() {
        let mut player = player();
        player.enable_visualization();
        player.pipeline().push_samples(&[0.5; 512]);

        player.disable_visualization();
        assert!(!player.pipeline().is_running());
        player.pipeline().push_samples(&[0.5; 512]);

        assert_eq!(player.toggle_visualization(), LoopState::Enabled);
        assert!(player.pipeline().is_running());
        let frame = player.pipeline().analysis().sample_time_domain();
        assert!(frame.values.iter().all(|v| *v == 128));
    }

    #[test]
    fn resize_ignores_empty_layout() {
        let mut player = player();
        player.resize_surface(0, 10);
        assert_eq!(player.canvas().width(), 120);
        player.resize_surface(300, 90);
        assert_eq!((player.canvas().width(), player.canvas().height()), (300, 90));
    }
}
