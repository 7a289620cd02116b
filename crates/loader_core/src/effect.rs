use crate::SlotId;

/// How the runtime learns that an injected stylesheet finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylesheetCompletion {
    /// The runtime fires `onload` for stylesheet nodes.
    NativeEvent,
    /// The runtime has no dependable `onload`; probe the rule list instead.
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InjectScript {
        slot: SlotId,
        url: String,
    },
    InjectStylesheet {
        slot: SlotId,
        url: String,
        completion: StylesheetCompletion,
    },
    /// Emitted exactly once, on the transition to `Settled`.
    NotifySubscribers,
}
