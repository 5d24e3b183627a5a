use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExactMatch,
    FuzzyMatch,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::ExactMatch => "exact_match",
            Stage::FuzzyMatch => "fuzzy_match",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives `(stage, current, total)` updates from the analysis path.
/// Callbacks arrive on the analysis thread and must stay cheap.
pub trait ProgressSink {
    fn progress(&mut self, stage: Stage, current: usize, total: usize);
}

/// Sink that discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _stage: Stage, _current: usize, _total: usize) {}
}
