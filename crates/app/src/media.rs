use std::collections::VecDeque;

use music_player_core::{AudioPipeline, MediaElement, MediaEvent, Result};

use crate::decode::{decode_bytes, DecodedAudio};

type Fetch = Box<dyn FnMut(&str) -> Result<Vec<u8>>>;

/// Media element without an audio device. Playback is simulated by a clock
/// advanced by the host; decoded samples for each elapsed slice are pushed
/// into the analysis pipeline.
pub struct HeadlessMedia {
    fetch: Fetch,
    pipeline: AudioPipeline,
    source: Option<String>,
    audio: Option<DecodedAudio>,
    position: usize,
    playing: bool,
    play_requested: bool,
    volume: f32,
    events: VecDeque<MediaEvent>,
}

impl HeadlessMedia {
    pub fn new<F>(pipeline: AudioPipeline, fetch: F) -> Self
    where
        F: FnMut(&str) -> Result<Vec<u8>> + 'static,
    {
        Self {
            fetch: Box::new(fetch),
            pipeline,
            source: None,
            audio: None,
            position: 0,
            playing: false,
            play_requested: false,
            volume: 1.0,
            events: VecDeque::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn current_time(&self) -> f64 {
        self.audio.as_ref().map_or(0.0, |audio| {
            self.position as f64 / f64::from(audio.sample_rate.max(1))
        })
    }

    fn duration(&self) -> Option<f64> {
        self.audio.as_ref().map(DecodedAudio::duration_seconds)
    }

    fn load(&mut self) -> Result<()> {
        if self.audio.is_some() {
            return Ok(());
        }
        let Some(url) = self.source.clone() else {
            return Err("no source".into());
        };
        let bytes = (self.fetch)(&url)?;
        self.audio = Some(decode_bytes(bytes)?);
        Ok(())
    }

    fn settle_play_request(&mut self) {
        if !std::mem::take(&mut self.play_requested) {
            return;
        }
        match self.load() {
            Ok(()) => {
                self.playing = true;
                self.events.push_back(MediaEvent::PlayResolved);
            }
            Err(err) => {
                self.playing = false;
                self.events.push_back(MediaEvent::PlayRejected {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Moves the playback clock forward by `seconds`, feeding the elapsed
    /// audio to the pipeline.
    pub fn advance(&mut self, seconds: f64) {
        self.settle_play_request();
        if !self.playing {
            return;
        }
        let Some(audio) = &self.audio else {
            return;
        };

        let step = (seconds.max(0.0) * f64::from(audio.sample_rate)).round() as usize;
        let end = (self.position + step).min(audio.samples.len());
        self.pipeline.push_samples(&audio.samples[self.position..end]);
        self.position = end;
        let finished = end >= audio.samples.len();

        self.events.push_back(MediaEvent::TimeUpdate {
            current_time: self.current_time(),
            duration: self.duration(),
        });
        if finished {
            self.playing = false;
            self.events.push_back(MediaEvent::Ended);
        }
    }

    pub fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.settle_play_request();
        self.events.drain(..).collect()
    }
}

impl MediaElement for HeadlessMedia {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.audio = None;
        self.position = 0;
        self.playing = false;
        self.play_requested = false;
        self.events.clear();
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn request_play(&mut self) {
        self.play_requested = true;
    }

    fn pause(&mut self) {
        self.playing = false;
        self.play_requested = false;
    }

    fn set_current_time(&mut self, seconds: f64) {
        if let Some(audio) = &self.audio {
            let target = (seconds.max(0.0) * f64::from(audio.sample_rate)) as usize;
            self.position = target.min(audio.samples.len());
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use music_player_core::{AnalysisConfig, PlayerError};

    use super::*;

    fn silent_wav(seconds: u32) -> Vec<u8> {
        let rate = 8_000u32;
        let data_len = rate * seconds * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    fn media() -> HeadlessMedia {
        let pipeline = AudioPipeline::new(AnalysisConfig::default());
        HeadlessMedia::new(pipeline, |_| Ok(silent_wav(1)))
    }

    #[test]
    fn play_resolves_after_loading() {
        let mut media = media();
        media.set_source("http://localhost/api/songs/a/");
        media.request_play();

        assert_eq!(media.poll_events(), vec![MediaEvent::PlayResolved]);
        assert!(media.is_playing());
    }

    #[test]
    fn fetch_failure_rejects_play() {
        let pipeline = AudioPipeline::new(AnalysisConfig::default());
        let mut media =
            HeadlessMedia::new(pipeline, |_| Err(PlayerError::msg("connection refused")));
        media.set_source("http://localhost/api/songs/a/");
        media.request_play();

        let events = media.poll_events();
        assert!(matches!(&events[0], MediaEvent::PlayRejected { reason } if reason.contains("refused")));
        assert!(!media.is_playing());
    }

    #[test]
    fn clock_reports_progress_and_end() {
        let mut media = media();
        media.set_source("http://localhost/api/songs/a/");
        media.request_play();
        media.poll_events();

        media.advance(0.5);
        assert_eq!(
            media.poll_events(),
            vec![MediaEvent::TimeUpdate {
                current_time: 0.5,
                duration: Some(1.0)
            }]
        );

        media.advance(0.75);
        let events = media.poll_events();
        assert_eq!(events.last(), Some(&MediaEvent::Ended));
        assert!(!media.is_playing());
    }

    #[test]
    fn seeking_moves_the_clock() {
        let mut media = media();
        media.set_source("http://localhost/api/songs/a/");
        media.request_play();
        media.poll_events();

        media.set_current_time(0.25);
        media.advance(0.0);
        assert_eq!(
            media.poll_events(),
            vec![MediaEvent::TimeUpdate {
                current_time: 0.25,
                duration: Some(1.0)
            }]
        );
    }
}
