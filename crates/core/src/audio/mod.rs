use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AnalysisConfig, AnalysisFrame, AnalysisSource, FrameDomain};

/// Whether the signal path is currently delivering audio to the analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Samples are dropped and every frame reads as silence.
    Suspended,
    Running,
}

#[derive(Debug)]
struct Shared {
    state: PipelineState,
    source: AnalysisSource,
}

/// Signal path between the media host and the analyser.
///
/// The host feeds decoded samples through [`AudioPipeline::push_samples`]
/// while the render loop reads frames through an [`AnalysisHandle`]. Both
/// views share the same analyser, so cloning is cheap.
#[derive(Debug, Clone)]
pub struct AudioPipeline {
    shared: Arc<Mutex<Shared>>,
}

impl AudioPipeline {
    /// Creates a suspended pipeline with the given transform window.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: PipelineState::Suspended,
                source: AnalysisSource::new(config),
            })),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Resumes a suspended pipeline. No-op when already running.
    pub fn resume(&self) {
        let mut shared = self.lock();
        if shared.state == PipelineState::Suspended {
            tracing::debug!("resuming audio pipeline");
            shared.state = PipelineState::Running;
        }
    }

    pub fn suspend(&self) {
        let mut shared = self.lock();
        shared.state = PipelineState::Suspended;
        shared.source.clear();
    }

    /// Feeds a block of mono samples. Dropped while suspended.
    pub fn push_samples(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let mut shared = self.lock();
        if shared.state == PipelineState::Running {
            shared.source.push_samples(samples);
        }
    }

    /// Forgets any buffered signal, e.g. after the media source changed.
    pub fn clear(&self) {
        self.lock().source.clear();
    }

    /// Returns a read-side handle for the render loop.
    pub fn analysis(&self) -> AnalysisHandle {
        AnalysisHandle {
            shared: self.shared.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }
}

/// Shared, thread-safe view over the analyser managed by [`AudioPipeline`].
#[derive(Clone)]
pub struct AnalysisHandle {
    shared: Arc<Mutex<Shared>>,
}

impl AnalysisHandle {
    pub fn frame_len(&self) -> usize {
        lock_shared(&self.shared).source.frame_len()
    }

    /// Samples the current state of the signal. Never fails: a suspended
    /// pipeline yields a silent frame.
    pub fn sample(&self, domain: FrameDomain) -> AnalysisFrame {
        let mut shared = lock_shared(&self.shared);
        match shared.state {
            PipelineState::Running => shared.source.sample(domain),
            PipelineState::Suspended => {
                AnalysisFrame::silent(domain, shared.source.frame_len())
            }
        }
    }

    pub fn sample_frequency_domain(&self) -> AnalysisFrame {
        self.sample(FrameDomain::Frequency)
    }

    pub fn sample_time_domain(&self) -> AnalysisFrame {
        self.sample(FrameDomain::Time)
    }
}

impl std::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle").finish()
    }
}

// A panic while holding the lock leaves the analyser in a usable state, so
// sampling recovers the guard instead of failing.
fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("analysis pipeline lock was poisoned, recovering");
        poisoned.into_inner()
    })
}
