//! Request/response contract with the library backend.
//!
//! The engine only consumes the backend: track listings, online search,
//! per-track enrichment and directory registration. [`HttpBackend`] speaks the
//! JSON API over HTTP; tests substitute in-memory implementations of
//! [`LibraryBackend`].

use std::time::Duration;

use reqwest::{blocking::Client, Url};
use serde::{Deserialize, Serialize};

use crate::{AudioLocator, BackendConfig, PlayerError, Result, TrackDescriptor, TrackId};

/// Operations the engine needs from the backend collaborator.
pub trait LibraryBackend {
    /// All tracks found in the registered directories.
    fn list_tracks(&self) -> Result<Vec<TrackDescriptor>>;
    /// Remote tracks, optionally narrowed by a free-text query.
    fn search_online(&self, query: Option<&str>) -> Result<Vec<TrackDescriptor>>;
    /// Mood label of a local track, `None` when the classifier has no answer.
    fn classify(&self, song_id: &str) -> Result<Option<String>>;
    /// Title of the recommended follow-up for a local track.
    fn recommend(&self, song_id: &str) -> Result<Option<String>>;
    fn add_directory(&self, path: &str) -> Result<()>;
}

/// Maps audio locators onto the backend's streaming endpoints.
#[derive(Debug, Clone)]
pub struct StreamResolver {
    base: Url,
}

impl StreamResolver {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|err| PlayerError::config(format!("invalid backend url `{base_url}`: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(PlayerError::config(format!(
                "backend url `{base_url}` cannot carry a path"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Local tracks stream from `api/songs/{id}/`; remote tracks go through
    /// `api/proxy-audio/?url=...` to sidestep cross-origin restrictions.
    pub fn resolve(&self, locator: &AudioLocator) -> Url {
        match locator {
            AudioLocator::Local { song_id } => self.endpoint(&["api", "songs", song_id]),
            AudioLocator::Remote { url } => {
                let mut endpoint = self.endpoint(&["api", "proxy-audio"]);
                endpoint.query_pairs_mut().append_pair("url", url);
                endpoint
            }
        }
    }

    /// Joins `segments` onto the base path with a trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(i64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalTrackRecord {
    id: RecordId,
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl From<LocalTrackRecord> for TrackDescriptor {
    fn from(record: LocalTrackRecord) -> Self {
        let id = record.id.into_string();
        Self {
            id: TrackId::Local(id.clone()),
            title: record.title,
            artist: record.artist,
            album: record.album,
            duration_seconds: record.duration.max(0.0),
            cover_image_url: record.cover_image,
            locator: AudioLocator::Local { song_id: id },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnlineTrackRecord {
    id: RecordId,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub audio_url: String,
}

impl From<OnlineTrackRecord> for TrackDescriptor {
    fn from(record: OnlineTrackRecord) -> Self {
        Self {
            id: TrackId::Online(record.id.into_string()),
            title: record.title,
            artist: record.artist,
            album: record.album,
            duration_seconds: record.duration.max(0.0),
            cover_image_url: record.cover_image,
            locator: AudioLocator::Remote {
                url: record.audio_url,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SongsResponse {
    #[serde(default)]
    songs: Vec<LocalTrackRecord>,
}

#[derive(Debug, Deserialize)]
struct OnlineSongsResponse {
    #[serde(default)]
    online_songs: Vec<OnlineTrackRecord>,
}

#[derive(Debug, Deserialize)]
struct MoodResponse {
    #[serde(default)]
    mood: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendedSong {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    #[serde(default)]
    recommended_song: Option<RecommendedSong>,
}

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DirectoryRequest<'a> {
    directory: &'a str,
}

/// Blocking JSON client for the backend API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    resolver: StreamResolver,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            resolver: StreamResolver::new(&config.base_url)?,
        })
    }

    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }

    /// Downloads a whole audio resource, e.g. a resolved stream endpoint.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching audio");
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "backend request");
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl LibraryBackend for HttpBackend {
    fn list_tracks(&self) -> Result<Vec<TrackDescriptor>> {
        let response: SongsResponse = self.get_json(self.resolver.endpoint(&["api", "songs"]))?;
        Ok(response.songs.into_iter().map(Into::into).collect())
    }

    fn search_online(&self, query: Option<&str>) -> Result<Vec<TrackDescriptor>> {
        let mut url = self.resolver.endpoint(&["api", "online-songs"]);
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            url.query_pairs_mut().append_pair("query", query);
        }
        let response: OnlineSongsResponse = self.get_json(url)?;
        Ok(response.online_songs.into_iter().map(Into::into).collect())
    }

    fn classify(&self, song_id: &str) -> Result<Option<String>> {
        let url = self.resolver.endpoint(&["api", "songs", song_id, "classify"]);
        let response: MoodResponse = self.get_json(url)?;
        Ok(response.mood)
    }

    fn recommend(&self, song_id: &str) -> Result<Option<String>> {
        let url = self.resolver.endpoint(&["api", "songs", song_id, "recommend"]);
        let response: RecommendationResponse = self.get_json(url)?;
        Ok(response.recommended_song.map(|song| song.title))
    }

    fn add_directory(&self, path: &str) -> Result<()> {
        let url = self.resolver.endpoint(&["api", "directories", "add"]);
        let response: DirectoryResponse = self
            .client
            .post(url)
            .json(&DirectoryRequest { directory: path })
            .send()?
            .error_for_status()?
            .json()?;

        if response.success {
            Ok(())
        } else {
            Err(PlayerError::Library(
                response
                    .error
                    .unwrap_or_else(|| "Error adding directory".to_string()),
            ))
        }
    }
}
