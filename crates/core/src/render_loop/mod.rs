use std::time::{Duration, Instant};

use crate::{AnalysisHandle, AudioPipeline, Canvas, VisualizationMode, Visualizers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Disabled,
    Enabled,
}

/// Result of servicing one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame was scheduled.
    Idle,
    /// The loop was disabled since the frame was scheduled; nothing was drawn
    /// and no further frame is scheduled.
    Stopped,
    /// One frame was painted by the renderer of the given mode.
    Rendered(VisualizationMode),
}

/// Cooperative per-refresh loop. At most one frame is scheduled at a time;
/// each serviced frame re-schedules itself first and then runs exactly one
/// sample-then-draw pair, as long as the loop is enabled.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    mode: VisualizationMode,
    visualizers: Visualizers,
    frame_pending: bool,
    surface_visible: bool,
    frames_rendered: u64,
}

impl RenderLoop {
    pub fn new(mode: VisualizationMode, visualizers: Visualizers) -> Self {
        Self {
            state: LoopState::Disabled,
            mode,
            visualizers,
            frame_pending: false,
            surface_visible: false,
            frames_rendered: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == LoopState::Enabled
    }

    pub fn mode(&self) -> VisualizationMode {
        self.mode
    }

    pub fn surface_visible(&self) -> bool {
        self.surface_visible
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame_pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn visualizers(&self) -> &Visualizers {
        &self.visualizers
    }

    /// Shows the surface, makes sure the pipeline is delivering signal and
    /// schedules the first frame.
    pub fn enable(&mut self, pipeline: &AudioPipeline) {
        if self.is_enabled() {
            return;
        }
        tracing::debug!(mode = %self.mode, "visualization enabled");
        self.state = LoopState::Enabled;
        self.surface_visible = true;
        pipeline.resume();
        self.frame_pending = true;
    }

    /// Hides the surface. The pending frame, if any, observes the flag and
    /// does not reschedule.
    pub fn disable(&mut self) {
        if !self.is_enabled() {
            return;
        }
        tracing::debug!("visualization disabled");
        self.state = LoopState::Disabled;
        self.surface_visible = false;
    }

    pub fn toggle(&mut self, pipeline: &AudioPipeline) -> LoopState {
        match self.state {
            LoopState::Enabled => self.disable(),
            LoopState::Disabled => self.enable(pipeline),
        }
        self.state
    }

    /// Takes effect on the next serviced frame.
    pub fn set_mode(&mut self, mode: VisualizationMode) {
        if mode != self.mode {
            tracing::debug!(from = %self.mode, to = %mode, "visualization mode changed");
            self.mode = mode;
        }
    }

    /// Services the scheduled frame, if any.
    pub fn tick(&mut self, analysis: &AnalysisHandle, canvas: &mut dyn Canvas) -> TickOutcome {
        if !self.frame_pending {
            return TickOutcome::Idle;
        }
        self.frame_pending = false;

        if !self.is_enabled() {
            return TickOutcome::Stopped;
        }
        self.frame_pending = true;

        let mode = self.mode;
        let visualizer = self.visualizers.get_mut(mode);
        let frame = analysis.sample(visualizer.domain());
        visualizer.render(&frame, canvas);

        self.frames_rendered += 1;
        TickOutcome::Rendered(mode)
    }
}

/// Fixed-rate stand-in for a display refresh signal.
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            next_deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks until the next refresh is due. Late frames are not made up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline.max(now) + self.interval);
    }
}
