//! Speaking-state bar animation.
//!
//! Purely cosmetic. The controller starts and stops it in lockstep with
//! speech output; each animation tick randomizes the bar heights. There is
//! no data contract with the audio itself.

use rand::Rng;

/// Bars rendered by the front end.
const BAR_COUNT: usize = 20;

/// Bar height range per tick, in display units.
const MIN_HEIGHT: u8 = 5;
const MAX_HEIGHT: u8 = 29;

/// Randomized bar animation for the speaking indicator.
#[derive(Debug, Clone)]
pub struct Visualizer {
    bars: Vec<u8>,
    active: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(BAR_COUNT)
    }
}

impl Visualizer {
    #[must_use]
    pub fn new(bar_count: usize) -> Self {
        Self {
            bars: vec![MIN_HEIGHT; bar_count],
            active: false,
        }
    }

    /// Begin animating.
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop animating; bars keep their last heights.
    pub fn stop(&mut self) {
        self.active = false;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Randomize bar heights for one animation frame; inactive ticks do
    /// nothing.
    pub fn tick(&mut self) {
        if !self.active {
            return;
        }
        let mut rng = rand::thread_rng();
        for bar in &mut self.bars {
            *bar = rng.gen_range(MIN_HEIGHT..=MAX_HEIGHT);
        }
    }

    /// Current bar heights, for rendering.
    #[must_use]
    pub fn bars(&self) -> &[u8] {
        &self.bars
    }
}
