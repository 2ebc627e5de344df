//! Audio clock abstraction.
//!
//! Gameplay never reads wall time. It polls an [`AudioClock`] once per frame
//! for the playback position and the paused flag, so the host decides what
//! "now" means (an audio device position, a media element, or a test script).

/// Source of the current playback position.
pub trait AudioClock {
    /// Playback position in seconds. Must never go backwards while playing.
    fn current_time(&self) -> f64;

    /// True once playback has been paused or stopped.
    fn is_paused(&self) -> bool;
}

/// A clock advanced by hand. Used by the headless runner and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    time: f64,
    paused: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward. Negative steps are ignored.
    pub fn advance(&mut self, delta_sec: f64) {
        if delta_sec > 0.0 && !self.paused {
            self.time += delta_sec;
        }
    }

    /// Jumps to `time_sec` if it is not earlier than the current position.
    pub fn seek_forward(&mut self, time_sec: f64) {
        if time_sec > self.time {
            self.time = time_sec;
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}

impl AudioClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
