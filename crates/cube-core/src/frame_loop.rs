/// Where the next frame callback comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    /// The page's `requestAnimationFrame`.
    Page,
    /// The immersive session's own frame clock.
    Display,
}

impl ClockSource {
    /// Chosen every iteration from the current presentation state.
    pub fn select(presenting: bool, display_available: bool) -> Self {
        if presenting && display_available {
            ClockSource::Display
        } else {
            ClockSource::Page
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub normal_passes: u64,
    /// Stereo passes that actually drew into the headset layer.
    pub stereo_passes: u64,
    pub render_errors: u64,
}

/// Self-rescheduling frame chain: `Idle` until the display query settles,
/// `Running` afterwards, `Stopped` once the owning view is torn down.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    display_available: bool,
    last_clock: Option<ClockSource>,
    requests: u64,
    pub stats: FrameStats,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            display_available: false,
            last_clock: None,
            requests: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn display_available(&self) -> bool {
        self.display_available
    }

    /// Clock used for the most recent frame request.
    pub fn last_clock(&self) -> Option<ClockSource> {
        self.last_clock
    }

    /// Number of frame requests issued so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Move from `Idle` to `Running`. Returns the clock for the first request,
    /// or `None` if the loop was already started or stopped.
    pub fn start(&mut self, display_available: bool, presenting: bool) -> Option<ClockSource> {
        if self.state != LoopState::Idle {
            return None;
        }
        self.state = LoopState::Running;
        self.display_available = display_available;
        Some(self.next_clock(presenting))
    }

    /// Clock for the next request; records the request.
    pub fn next_clock(&mut self, presenting: bool) -> ClockSource {
        let clock = ClockSource::select(presenting, self.display_available);
        self.last_clock = Some(clock);
        self.requests += 1;
        clock
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }
}
