//! Loader engine: host seams, scheduling and effect execution for batches.
mod batch;
mod host;
mod poller;
mod registry;
mod schedule;
mod settings;
pub mod sim;

pub use batch::{BatchId, Loader, LoaderBatch};
pub use host::{
    HeadInjector, LoadHook, ProbeError, ReadyStateHook, StylesheetEvents, StylesheetHandle,
};
pub use loader_core::{BatchProgress, Kind, MatchPolicy, Phase, ReadyState, UnclassifiedPolicy};
pub use poller::StylesheetPoller;
pub use registry::{Callback, CallbackRegistry};
pub use schedule::{repeat_every, Scheduler, Task};
pub use settings::{LoaderSettings, SettingsError, StylesheetEventMode};
