use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque track identity. Online identities render with an `online-` prefix
/// so they never collide with local ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackId {
    Local(String),
    Online(String),
}

impl TrackId {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online(_))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "{id}"),
            Self::Online(id) => write!(f, "online-{id}"),
        }
    }
}

/// Where the audio for a track lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioLocator {
    /// Served by the backend's per-id streaming endpoint.
    Local { song_id: String },
    /// Remote URL that must go through the backend proxy.
    Remote { url: String },
}

/// Immutable description of one playable track, as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Length reported by the backend; the media element's own duration
    /// takes over once playback starts.
    pub duration_seconds: f64,
    pub cover_image_url: Option<String>,
    pub locator: AudioLocator,
}

impl TrackDescriptor {
    pub fn is_online(&self) -> bool {
        self.id.is_online()
    }

    fn matches_query(&self, needle: &str) -> bool {
        [&self.title, &self.artist, &self.album]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    track: TrackDescriptor,
    visible: bool,
}

/// Ordered track listing plus the cursor of the active entry.
#[derive(Debug, Clone, Default)]
pub struct PlaylistState {
    entries: Vec<Entry>,
    current: Option<usize>,
}

impl PlaylistState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing with no active entry.
    pub fn from_tracks(tracks: Vec<TrackDescriptor>) -> Self {
        let mut playlist = Self::new();
        playlist.replace_all(tracks);
        playlist
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor of the active entry, `None` until something is selected.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&TrackDescriptor> {
        self.current.and_then(|index| self.get(index))
    }

    pub fn get(&self, index: usize) -> Option<&TrackDescriptor> {
        self.entries.get(index).map(|entry| &entry.track)
    }

    /// Every entry in display order, hidden ones included.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.entries.iter().map(|entry| &entry.track)
    }

    /// Swaps the whole listing and invalidates the cursor.
    pub fn replace_all(&mut self, tracks: Vec<TrackDescriptor>) {
        self.entries = tracks
            .into_iter()
            .map(|track| Entry {
                track,
                visible: true,
            })
            .collect();
        self.current = None;
    }

    /// Swaps the whole listing, keeping the cursor on the active track when
    /// the new listing still contains it.
    pub fn replace_all_preserving(&mut self, tracks: Vec<TrackDescriptor>) {
        let active = self.current().map(|track| track.id.clone());
        self.replace_all(tracks);
        if let Some(id) = active {
            self.current = self.entries.iter().position(|entry| entry.track.id == id);
        }
    }

    /// Moves the cursor. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> Option<&TrackDescriptor> {
        if index >= self.entries.len() {
            return None;
        }
        self.current = Some(index);
        self.get(index)
    }

    /// Advances cyclically. With no active entry the first one is chosen.
    pub fn next(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.current {
            Some(index) if index + 1 < self.entries.len() => index + 1,
            _ => 0,
        };
        self.current = Some(next);
        self.current
    }

    /// Steps back cyclically. With no active entry the last one is chosen.
    pub fn previous(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let previous = match self.current {
            Some(index) if index > 0 => index - 1,
            _ => self.entries.len() - 1,
        };
        self.current = Some(previous);
        self.current
    }

    /// Index that follows `index` cyclically, without moving the cursor.
    pub fn peek_next(&self, index: usize) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        Some((index + 1) % self.entries.len())
    }

    /// Toggles per-entry visibility. The cursor and playback are untouched.
    pub fn filter_by<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&TrackDescriptor) -> bool,
    {
        for entry in &mut self.entries {
            entry.visible = predicate(&entry.track);
        }
    }

    /// Case-insensitive match on title, artist and album. An empty query
    /// shows every entry.
    pub fn filter(&mut self, query: &str) {
        let needle = query.trim().to_lowercase();
        self.filter_by(|track| track.matches_query(&needle));
    }

    /// Whether the last filter left the entry at `index` visible.
    pub fn is_visible(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.visible)
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.visible)
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn local(id: &str, title: &str, duration: f64) -> TrackDescriptor {
        TrackDescriptor {
            id: TrackId::Local(id.to_string()),
            title: title.to_string(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
            duration_seconds: duration,
            cover_image_url: None,
            locator: AudioLocator::Local {
                song_id: id.to_string(),
            },
        }
    }

    pub(crate) fn online(id: &str, title: &str, url: &str) -> TrackDescriptor {
        TrackDescriptor {
            id: TrackId::Online(id.to_string()),
            title: title.to_string(),
            artist: "Remote".to_string(),
            album: "Stream".to_string(),
            duration_seconds: 30.0,
            cover_image_url: Some("https://img.example/cover.jpg".to_string()),
            locator: AudioLocator::Remote {
                url: url.to_string(),
            },
        }
    }

    fn playlist(n: usize) -> PlaylistState {
        PlaylistState::from_tracks(
            (0..n)
                .map(|i| local(&i.to_string(), &format!("Track {i}"), 60.0))
                .collect(),
        )
    }

    #[test]
    fn next_and_previous_close_the_cycle() {
        for n in 1..6 {
            for start in 0..n {
                let mut list = playlist(n);
                list.select(start);
                for _ in 0..n {
                    list.next();
                }
                assert_eq!(list.current_index(), Some(start));
                for _ in 0..n {
                    list.previous();
                }
                assert_eq!(list.current_index(), Some(start));
            }
        }
    }

    #[test]
    fn navigation_on_empty_playlist_is_a_no_op() {
        let mut list = PlaylistState::new();
        assert_eq!(list.next(), None);
        assert_eq!(list.previous(), None);
        assert_eq!(list.current_index(), None);
    }

    #[test]
    fn navigation_without_cursor_picks_an_end() {
        let mut list = playlist(3);
        assert_eq!(list.next(), Some(0));

        let mut list = playlist(3);
        assert_eq!(list.previous(), Some(2));
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let mut list = playlist(2);
        list.select(1);
        assert!(list.select(2).is_none());
        assert_eq!(list.current_index(), Some(1));
    }

    #[test]
    fn replace_all_invalidates_cursor() {
        let mut list = playlist(5);
        list.select(4);
        list.replace_all(vec![local("a", "A", 1.0)]);
        assert_eq!(list.current_index(), None);
        assert!(list.current().is_none());
    }

    #[test]
    fn replace_preserving_follows_track_identity() {
        let mut list = playlist(3);
        list.select(2);

        list.replace_all_preserving(vec![
            local("2", "Track 2", 60.0),
            local("9", "Other", 60.0),
        ]);
        assert_eq!(list.current_index(), Some(0));

        list.replace_all_preserving(vec![local("7", "Gone", 1.0)]);
        assert_eq!(list.current_index(), None);
    }

    #[test]
    fn filter_only_toggles_visibility() {
        let mut list = PlaylistState::from_tracks(vec![
            local("1", "Blue Monday", 1.0),
            local("2", "Red Rain", 1.0),
        ]);
        list.select(1);

        list.filter("BLUE");
        assert_eq!(list.visible_indices(), vec![0]);
        assert!(!list.is_visible(1));
        assert_eq!(list.len(), 2);
        assert_eq!(list.current_index(), Some(1));

        list.filter("");
        assert_eq!(list.visible_indices(), vec![0, 1]);
    }

    #[test]
    fn online_ids_carry_prefix() {
        let track = online("42", "Remote", "https://x.example/a.mp3");
        assert_eq!(track.id.to_string(), "online-42");
        assert!(track.is_online());
    }
}
