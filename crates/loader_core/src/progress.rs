use crate::Phase;

/// Read-only snapshot of a batch, for hosts that display load status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub phase: Phase,
    pub total: usize,
    pub loaded: usize,
    pub pending_urls: Vec<String>,
}

impl BatchProgress {
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }
}
