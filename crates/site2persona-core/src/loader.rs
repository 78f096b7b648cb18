use std::time::{Duration, Instant};

pub const LOADER_STEPS: [&str; 4] = [
    "Connecting to website...",
    "Scanning pages and sub-pages...",
    "Analyzing brand voice & offerings...",
    "Synthesizing AI Persona...",
];

pub const STEP_INTERVAL: Duration = Duration::from_millis(2500);

/// Cosmetic progress captions shown while an analysis runs.
/// Advances every [`STEP_INTERVAL`] and holds on the last caption.
#[derive(Debug, Clone)]
pub struct AnalysisLoader {
    started: Instant,
    step: usize,
}

impl Default for AnalysisLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisLoader {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self { started, step: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn step_for(elapsed: Duration) -> usize {
        let ticks = (elapsed.as_millis() / STEP_INTERVAL.as_millis()) as usize;
        ticks.min(LOADER_STEPS.len() - 1)
    }

    /// Advance to the caption for `now`
    pub fn tick(&mut self, now: Instant) {
        self.step = Self::step_for(now.saturating_duration_since(self.started));
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn caption(&self) -> &'static str {
        LOADER_STEPS[self.step]
    }

    /// Whether the step bar segment at `idx` is filled
    pub fn is_reached(&self, idx: usize) -> bool {
        idx <= self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_for_elapsed() {
        assert_eq!(AnalysisLoader::step_for(Duration::ZERO), 0);
        assert_eq!(AnalysisLoader::step_for(Duration::from_millis(2499)), 0);
        assert_eq!(AnalysisLoader::step_for(Duration::from_millis(2500)), 1);
        assert_eq!(AnalysisLoader::step_for(Duration::from_millis(7500)), 3);
    }

    #[test]
    fn test_stops_at_last_caption() {
        let start = Instant::now();
        let mut loader = AnalysisLoader::started_at(start);
        loader.tick(start + Duration::from_secs(60));
        assert_eq!(loader.step(), 3);
        assert!(loader.is_reached(LOADER_STEPS.len() - 1));
        assert_eq!(loader.caption(), "Synthesizing AI Persona...");
    }

    #[test]
    fn test_reset_returns_to_first_caption() {
        let start = Instant::now();
        let mut loader = AnalysisLoader::started_at(start);
        loader.tick(start + Duration::from_secs(5));
        assert_eq!(loader.step(), 2);
        assert!(loader.is_reached(2));
        assert!(!loader.is_reached(3));

        loader.reset();
        assert_eq!(loader.step(), 0);
        assert_eq!(loader.caption(), "Connecting to website...");
    }
}
