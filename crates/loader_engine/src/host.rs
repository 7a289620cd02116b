use std::rc::Rc;

use loader_core::ReadyState;
use thiserror::Error;

/// Fires at most once, when the host signals that a node finished loading.
pub type LoadHook = Box<dyn FnOnce()>;

/// Receives every legacy `readyState` change of a stylesheet node.
pub type ReadyStateHook = Box<dyn FnMut(ReadyState)>;

pub struct StylesheetEvents {
    pub on_load: LoadHook,
    pub on_ready_state: ReadyStateHook,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Rule access was refused, typically for a cross-origin stylesheet.
    #[error("access to the rules of {href} was denied: {reason}")]
    SecurityError { href: String, reason: String },
    /// The node has no stylesheet object attached yet.
    #[error("{href} has no stylesheet object yet")]
    Unavailable { href: String },
}

/// The stylesheet object behind an injected `<link>`.
pub trait StylesheetHandle {
    fn href(&self) -> &str;

    /// Number of parsed rules. An empty list means "not loaded yet".
    fn rule_count(&self) -> Result<usize, ProbeError>;
}

/// Inserts resource nodes into the document head.
///
/// Implementations own all markup; the loader only arms the hooks it passes in.
pub trait HeadInjector {
    /// One-off feature probe: does this runtime fire `onload` on stylesheet nodes?
    fn supports_stylesheet_onload(&self) -> bool;

    fn inject_script(&self, url: &str, on_load: LoadHook);

    fn inject_stylesheet(&self, url: &str, events: StylesheetEvents) -> Rc<dyn StylesheetHandle>;
}
