use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{PixelCanvas, Result};

/// Where and how often rendered frames are written out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    pub every_n_frames: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            every_n_frames: 1,
        }
    }
}

/// Dumps the drawing surface to numbered PNG files.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    is_recording: bool,
    frames_seen: u64,
    frames_written: u64,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            frames_seen: 0,
            frames_written: 0,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        fs::create_dir_all(&self.settings.output_dir)?;
        tracing::info!(dir = %self.settings.output_dir.display(), "recording frames");
        self.is_recording = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.is_recording {
            tracing::info!(written = self.frames_written, "recording stopped");
        }
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Offers a rendered frame. Returns the written path when this frame
    /// falls on the capture interval.
    pub fn capture(&mut self, canvas: &PixelCanvas) -> Result<Option<PathBuf>> {
        if !self.is_recording {
            return Ok(None);
        }
        let every = u64::from(self.settings.every_n_frames.max(1));
        let seen = self.frames_seen;
        self.frames_seen += 1;
        if seen % every != 0 {
            return Ok(None);
        }

        let path = self
            .settings
            .output_dir
            .join(format!("frame_{:05}.png", self.frames_written));
        canvas.save_png(&path)?;
        self.frames_written += 1;
        tracing::trace!(path = %path.display(), "frame written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Canvas, Rgba};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "music-player-record-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn idle_recorder_writes_nothing() {
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: scratch_dir("idle"),
            every_n_frames: 1,
        });
        let canvas = PixelCanvas::new(4, 4);
        assert_eq!(recorder.capture(&canvas).unwrap(), None);
        assert_eq!(recorder.frames_written(), 0);
    }

    #[test]
    fn writes_every_nth_frame_as_png() {
        let dir = scratch_dir("nth");
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.clone(),
            every_n_frames: 2,
        });
        recorder.start().unwrap();

        let mut canvas = PixelCanvas::new(8, 8);
        canvas.fill_rect(0.0, 0.0, 8.0, 8.0, Rgba::LIME);
        let written: Vec<_> = (0..5)
            .filter_map(|_| recorder.capture(&canvas).unwrap())
            .collect();

        assert_eq!(written.len(), 3);
        assert_eq!(written[0], dir.join("frame_00000.png"));
        assert_eq!(written[2], dir.join("frame_00002.png"));
        let decoded = image::open(&written[1]).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 3).0, [0, 255, 0, 255]);

        recorder.stop().unwrap();
        assert!(!recorder.is_recording());
        let _ = fs::remove_dir_all(&dir);
    }
}
