//! Loader core: pure batch state machine, URL classification and progress views.
mod effect;
mod kind;
mod msg;
mod progress;
mod state;
mod update;

pub use effect::{Effect, StylesheetCompletion};
pub use kind::{classify, classify_with, Kind, MatchPolicy};
pub use msg::{Msg, ReadyState};
pub use progress::BatchProgress;
pub use state::{BatchOptions, BatchState, FileEntry, Phase, SlotId, UnclassifiedPolicy};
pub use update::update;
