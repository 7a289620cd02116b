use crate::SlotId;

/// Legacy `readyState` values a stylesheet node may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Loading,
    Loaded,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Only `loaded` and `complete` mean the resource arrived.
    pub fn is_done(self) -> bool {
        matches!(self, ReadyState::Loaded | ReadyState::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Dispatch every entry to the host. Only the first `Start` has any effect.
    Start,
    /// A host hook fired for a specific slot (native `onload` or a successful poll).
    SlotLoaded { slot: SlotId },
    /// Legacy ready-state notification for a stylesheet slot.
    ReadyStateChanged { slot: SlotId, state: ReadyState },
    /// The host reports a URL as loaded without knowing which slot it was.
    UrlLoaded { url: String },
}
