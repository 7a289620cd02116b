use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use loader_logging::{loader_debug, loader_trace};

use crate::host::StylesheetHandle;
use crate::schedule::{repeat_every, Scheduler};

/// Detects stylesheet completion by probing the parsed rule list.
///
/// Used on runtimes without a dependable stylesheet `onload`. There is no
/// attempt limit: a sheet that never gains rules is probed forever.
#[derive(Clone)]
pub struct StylesheetPoller {
    scheduler: Rc<dyn Scheduler>,
    interval: Duration,
}

impl StylesheetPoller {
    pub fn new(scheduler: Rc<dyn Scheduler>, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probes `sheet` now and every interval after that.
    ///
    /// `on_loaded` fires once, on the first probe that sees rules. Polling
    /// stops quietly as soon as `already_loaded` reports true.
    pub fn watch<D, L>(&self, sheet: Rc<dyn StylesheetHandle>, already_loaded: D, on_loaded: L)
    where
        D: Fn() -> bool + 'static,
        L: FnOnce() + 'static,
    {
        let mut poll = PendingPoll {
            sheet,
            attempts: 0,
            already_loaded: Box::new(already_loaded),
            on_loaded: Some(Box::new(on_loaded)),
        };
        repeat_every(Rc::clone(&self.scheduler), self.interval, move || poll.probe());
    }
}

struct PendingPoll {
    sheet: Rc<dyn StylesheetHandle>,
    attempts: u32,
    already_loaded: Box<dyn Fn() -> bool>,
    on_loaded: Option<Box<dyn FnOnce()>>,
}

impl PendingPoll {
    fn probe(&mut self) -> ControlFlow<()> {
        if (self.already_loaded)() {
            loader_trace!("{} already marked, polling stopped", self.sheet.href());
            return ControlFlow::Break(());
        }
        self.attempts += 1;
        match self.sheet.rule_count() {
            Ok(0) => {
                loader_trace!(
                    "t={}ms probe {} of {}: no rules yet",
                    loader_logging::clock_ms(),
                    self.attempts,
                    self.sheet.href()
                );
                ControlFlow::Continue(())
            }
            Ok(rules) => {
                loader_debug!(
                    "t={}ms {} loaded after {} probe(s) ({} rules)",
                    loader_logging::clock_ms(),
                    self.sheet.href(),
                    self.attempts,
                    rules
                );
                if let Some(on_loaded) = self.on_loaded.take() {
                    on_loaded();
                }
                ControlFlow::Break(())
            }
            Err(err) => {
                loader_debug!("probe {} failed, retrying: {}", self.attempts, err);
                ControlFlow::Continue(())
            }
        }
    }
}
