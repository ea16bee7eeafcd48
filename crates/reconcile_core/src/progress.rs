/// Synthetic upload progress.
///
/// The server gives no progress information, so the bar creeps toward a
/// ceiling: each step covers a sixth of the remaining distance (at least one
/// point) and never passes the ceiling. Only a real response moves it to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticProgress {
    percent: u8,
    ceiling: u8,
}

pub const DEFAULT_PROGRESS_CEILING: u8 = 95;

impl SyntheticProgress {
    pub fn new(ceiling: u8) -> Self {
        Self {
            percent: 0,
            ceiling: ceiling.min(99),
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn advance(&mut self) -> u8 {
        if self.percent < self.ceiling {
            let step = ((self.ceiling - self.percent) / 6).max(1);
            self.percent = self.percent.saturating_add(step).min(self.ceiling);
        }
        self.percent
    }
}

impl Default for SyntheticProgress {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_CEILING)
    }
}
