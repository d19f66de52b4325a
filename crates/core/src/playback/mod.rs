//! Playback state machine over the host's media element.
//!
//! The controller owns the playlist cursor and the media element, turns user
//! actions and media notifications into transitions, and reports every
//! transition as a [`PlayerEvent`] for the presentation layer. Network side
//! effects (mood and recommendation lookups) are handed out as
//! [`EnrichmentTicket`]s and applied later; answers for a superseded
//! selection are dropped.

use std::{collections::VecDeque, fmt};

use crate::{PlaylistState, StreamResolver, TrackDescriptor, TrackId};

/// Host-side audio element the controller drives.
///
/// `request_play` is asynchronous: its outcome arrives later through
/// [`MediaEvent::PlayResolved`] or [`MediaEvent::PlayRejected`].
pub trait MediaElement {
    fn set_source(&mut self, url: &str);
    fn source(&self) -> Option<&str>;
    fn request_play(&mut self);
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f32);
}

/// Notifications emitted by the media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    PlayResolved,
    PlayRejected { reason: String },
    TimeUpdate { current_time: f64, duration: Option<f64> },
    Ended,
}

/// Where the controller is in its play/pause cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Snapshot of the session as seen by the embedding UI.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub current_index: Option<usize>,
    pub state: PlaybackState,
    pub is_playing: bool,
    pub volume: f32,
    pub current_time: f64,
    pub duration: Option<f64>,
}

/// Elapsed/total time pair mirrored from the media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: f64,
    pub duration: Option<f64>,
}

impl Progress {
    fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Width of the progress bar in `[0, 100]`, `None` while the duration is
    /// unknown.
    pub fn percent(&self) -> Option<f64> {
        self.known_duration()
            .map(|duration| (self.elapsed / duration * 100.0).clamp(0.0, 100.0))
    }

    pub fn elapsed_label(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn total_label(&self) -> String {
        self.known_duration().map(format_time).unwrap_or_default()
    }

    pub fn remaining_label(&self) -> String {
        self.known_duration()
            .map(|duration| format_time((duration - self.elapsed).max(0.0)))
            .unwrap_or_default()
    }
}

/// Formats seconds as `m:ss`. Minutes keep counting past an hour; values
/// that are not finite render blank.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Value shown in the mood field. Renders as an empty string when cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoodDisplay {
    Cleared,
    Label(String),
    Unknown,
    Error,
}

impl fmt::Display for MoodDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleared => Ok(()),
            Self::Label(mood) => write!(f, "Mood: {mood}"),
            Self::Unknown => f.write_str("Mood: Unknown"),
            Self::Error => f.write_str("Mood: Error"),
        }
    }
}

/// Value shown in the "recommended next" field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendationDisplay {
    Cleared,
    Title(String),
    Nothing,
    Error,
}

impl fmt::Display for RecommendationDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleared => Ok(()),
            Self::Title(title) => f.write_str(title),
            Self::Nothing => f.write_str("None"),
            Self::Error => f.write_str("Error"),
        }
    }
}

/// Identifies the selection an enrichment lookup was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentTicket {
    pub generation: u64,
    pub song_id: String,
}

/// Transition notifications for the presentation layer, drained with
/// [`PlaybackController::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged {
        index: usize,
        track: TrackDescriptor,
        source: String,
    },
    Loading {
        index: usize,
    },
    Played {
        index: usize,
    },
    Paused {
        index: Option<usize>,
    },
    Faulted {
        index: Option<usize>,
        reason: String,
    },
    Progress(Progress),
    MoodChanged(MoodDisplay),
    RecommendationChanged(RecommendationDisplay),
}

/// Owns the playlist, the media element and the session mirrored from it.
///
/// All mutation goes through methods; each transition queues one or more
/// [`PlayerEvent`]s.
pub struct PlaybackController<M> {
    media: M,
    playlist: PlaylistState,
    resolver: StreamResolver,
    state: PlaybackState,
    volume: f32,
    current_time: f64,
    duration: Option<f64>,
    generation: u64,
    enriched_generation: Option<u64>,
    pending_enrichment: Vec<EnrichmentTicket>,
    mood: MoodDisplay,
    recommendation: RecommendationDisplay,
    events: VecDeque<PlayerEvent>,
}

impl<M: MediaElement> PlaybackController<M> {
    /// Wraps `media` with an empty playlist at full volume.
    pub fn new(mut media: M, resolver: StreamResolver) -> Self {
        let volume = 1.0;
        media.set_volume(volume);
        Self {
            media,
            playlist: PlaylistState::new(),
            resolver,
            state: PlaybackState::Idle,
            volume,
            current_time: 0.0,
            duration: None,
            generation: 0,
            enriched_generation: None,
            pending_enrichment: Vec::new(),
            mood: MoodDisplay::Cleared,
            recommendation: RecommendationDisplay::Cleared,
            events: VecDeque::new(),
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn playlist(&self) -> &PlaylistState {
        &self.playlist
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// `true` only in [`PlaybackState::Playing`].
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Incremented on every selection; tags enrichment lookups.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mood(&self) -> &MoodDisplay {
        &self.mood
    }

    pub fn recommendation(&self) -> &RecommendationDisplay {
        &self.recommendation
    }

    /// Copies out the current session for display.
    pub fn session(&self) -> PlaybackSession {
        PlaybackSession {
            current_index: self.playlist.current_index(),
            state: self.state,
            is_playing: self.is_playing(),
            volume: self.volume,
            current_time: self.current_time,
            duration: self.duration,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            elapsed: self.current_time,
            duration: self.duration,
        }
    }

    /// Takes every event queued since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain(..).collect()
    }

    /// Swaps the listing and clears the cursor. The media element keeps
    /// playing whatever it was playing.
    pub fn replace_playlist(&mut self, tracks: Vec<TrackDescriptor>) {
        self.playlist.replace_all(tracks);
    }

    /// Swaps the listing, keeping the cursor on the active track if it is
    /// still listed.
    pub fn replace_playlist_preserving(&mut self, tracks: Vec<TrackDescriptor>) {
        self.playlist.replace_all_preserving(tracks);
    }

    /// Hides entries not matching `query`; playback is unaffected.
    pub fn filter(&mut self, query: &str) {
        self.playlist.filter(query);
    }

    /// Points the media element at the track and asks it to start. Returns
    /// `false` without side effects for an out-of-range index.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(track) = self.playlist.select(index).cloned() else {
            tracing::debug!(index, "ignoring out-of-range selection");
            return false;
        };

        self.generation += 1;
        self.pending_enrichment.clear();
        self.current_time = 0.0;
        self.duration = None;

        let source = self.resolver.resolve(&track.locator).to_string();
        tracing::info!(index, id = %track.id, title = %track.title, %source, "loading track");
        self.media.set_source(&source);

        self.state = PlaybackState::Loading;
        self.events.push_back(PlayerEvent::TrackChanged {
            index,
            track,
            source,
        });
        self.events.push_back(PlayerEvent::Loading { index });
        self.media.request_play();
        true
    }

    /// Selects the following entry, wrapping to the first.
    pub fn next(&mut self) -> bool {
        match self.playlist.next() {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Selects the preceding entry, wrapping to the last.
    pub fn previous(&mut self) -> bool {
        match self.playlist.previous() {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Flips between playing and paused. Without a media source this does
    /// nothing.
    pub fn toggle_play(&mut self) {
        if self.media.source().is_none() {
            return;
        }
        let index = self.playlist.current_index();

        match self.state {
            PlaybackState::Playing | PlaybackState::Loading => {
                self.media.pause();
                self.state = PlaybackState::Paused;
                self.events.push_back(PlayerEvent::Paused { index });
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                self.media.request_play();
                if let Some(index) = index {
                    self.events.push_back(PlayerEvent::Played { index });
                }
            }
            PlaybackState::Idle => {
                self.state = PlaybackState::Loading;
                self.media.request_play();
                if let Some(index) = index {
                    self.events.push_back(PlayerEvent::Loading { index });
                }
            }
        }
    }

    /// Maps a horizontal click position on a bar of `width` onto the track.
    pub fn seek_to_offset(&mut self, offset_x: f64, width: f64) -> Option<f64> {
        if !(width > 0.0) {
            return None;
        }
        self.seek_fraction(offset_x / width)
    }

    /// Seeks to `fraction` of the known duration, clamped into `[0, 1]`.
    /// Without a known duration nothing happens.
    pub fn seek_fraction(&mut self, fraction: f64) -> Option<f64> {
        let duration = self.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        if fraction.is_nan() {
            return None;
        }
        let position = fraction.clamp(0.0, 1.0) * duration;
        self.media.set_current_time(position);
        self.current_time = position;
        Some(position)
    }

    /// Mirrors `volume` onto the media element, clamped into `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(self.volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Feeds one notification from the media element into the state machine.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::PlayResolved => self.on_play_resolved(),
            MediaEvent::PlayRejected { reason } => self.on_play_rejected(reason),
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                self.current_time = current_time;
                self.duration = duration.filter(|d| d.is_finite());
                self.events.push_back(PlayerEvent::Progress(self.progress()));
            }
            MediaEvent::Ended => self.on_ended(),
        }
    }

    fn on_play_resolved(&mut self) {
        let index = self.playlist.current_index();
        match self.state {
            PlaybackState::Loading => {
                self.state = PlaybackState::Playing;
                if let Some(index) = index {
                    self.events.push_back(PlayerEvent::Played { index });
                }
            }
            PlaybackState::Playing => {}
            PlaybackState::Idle | PlaybackState::Paused => {
                tracing::debug!(state = ?self.state, "ignoring late play confirmation");
                return;
            }
        }

        // The listing may have been replaced while the request was pending.
        let Some(index) = index else {
            return;
        };
        if self.enriched_generation != Some(self.generation) {
            self.enriched_generation = Some(self.generation);
            self.start_enrichment(index);
        }
    }

    fn on_play_rejected(&mut self, reason: String) {
        match self.state {
            PlaybackState::Loading | PlaybackState::Playing => {
                let index = self.playlist.current_index();
                tracing::warn!(?index, %reason, "playback failed to start");
                self.state = PlaybackState::Idle;
                self.events.push_back(PlayerEvent::Faulted { index, reason });
            }
            PlaybackState::Idle | PlaybackState::Paused => {
                tracing::debug!(%reason, "ignoring play rejection while not playing");
            }
        }
    }

    fn on_ended(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if !self.next() {
            self.state = PlaybackState::Idle;
            self.events.push_back(PlayerEvent::Paused { index: None });
        }
    }

    fn start_enrichment(&mut self, index: usize) {
        let Some(track) = self.playlist.get(index) else {
            return;
        };

        match &track.id {
            TrackId::Local(song_id) => {
                self.pending_enrichment.push(EnrichmentTicket {
                    generation: self.generation,
                    song_id: song_id.clone(),
                });
            }
            TrackId::Online(_) => {
                let next = self
                    .playlist
                    .peek_next(index)
                    .and_then(|next| self.playlist.get(next))
                    .map(|next| RecommendationDisplay::Title(next.title.clone()))
                    .unwrap_or(RecommendationDisplay::Nothing);
                self.set_mood(MoodDisplay::Cleared);
                self.set_recommendation(next);
            }
        }
    }

    /// Hands out the lookups issued since the last call.
    pub fn take_enrichment_requests(&mut self) -> Vec<EnrichmentTicket> {
        std::mem::take(&mut self.pending_enrichment)
    }

    /// Applies a mood lookup. Returns `false` when the ticket belongs to a
    /// superseded selection and the answer was dropped.
    pub fn apply_mood<E: fmt::Display>(
        &mut self,
        ticket: &EnrichmentTicket,
        outcome: Result<Option<String>, E>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let display = match outcome {
            Ok(Some(mood)) => MoodDisplay::Label(mood),
            Ok(None) => MoodDisplay::Unknown,
            Err(err) => {
                tracing::warn!(song_id = %ticket.song_id, %err, "mood lookup failed");
                MoodDisplay::Error
            }
        };
        self.set_mood(display);
        true
    }

    /// Applies a recommendation lookup, with the same staleness rule as
    /// [`Self::apply_mood`].
    pub fn apply_recommendation<E: fmt::Display>(
        &mut self,
        ticket: &EnrichmentTicket,
        outcome: Result<Option<String>, E>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let display = match outcome {
            Ok(Some(title)) => RecommendationDisplay::Title(title),
            Ok(None) => RecommendationDisplay::Nothing,
            Err(err) => {
                tracing::warn!(song_id = %ticket.song_id, %err, "recommendation lookup failed");
                RecommendationDisplay::Error
            }
        };
        self.set_recommendation(display);
        true
    }

    fn is_current(&self, ticket: &EnrichmentTicket) -> bool {
        let current = ticket.generation == self.generation
            && matches!(
                self.playlist.current().map(|track| &track.id),
                Some(TrackId::Local(id)) if *id == ticket.song_id
            );
        if !current {
            tracing::debug!(
                song_id = %ticket.song_id,
                generation = ticket.generation,
                "discarding stale enrichment response"
            );
        }
        current
    }

    fn set_mood(&mut self, mood: MoodDisplay) {
        self.mood = mood.clone();
        self.events.push_back(PlayerEvent::MoodChanged(mood));
    }

    fn set_recommendation(&mut self, recommendation: RecommendationDisplay) {
        self.recommendation = recommendation.clone();
        self.events
            .push_back(PlayerEvent::RecommendationChanged(recommendation));
    }
}

impl<M: fmt::Debug> fmt::Debug for PlaybackController<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("media", &self.media)
            .field("state", &self.state)
            .field("current_index", &self.playlist.current_index())
            .field("tracks", &self.playlist.len())
            .field("generation", &self.generation)
            .finish()
    }
}
