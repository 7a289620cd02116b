//! Deterministic in-memory host for tests and scenario replays.
//!
//! [`ManualScheduler`] is a virtual clock that only moves when told to, and
//! [`SimulatedHead`] records injections and fires their hooks on demand.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::time::Duration;

use loader_core::{Kind, ReadyState};
use serde::{Deserialize, Serialize};

use crate::host::{HeadInjector, LoadHook, ProbeError, StylesheetEvents, StylesheetHandle};
use crate::schedule::{Scheduler, Task};

/// Virtual-time timer queue. Tasks due at the same instant run in FIFO order.
#[derive(Default)]
pub struct ManualScheduler {
    now_ms: Cell<u64>,
    next_seq: Cell<u64>,
    queue: RefCell<BTreeMap<(u64, u64), Task>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Due time of the earliest queued task.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.queue.borrow().keys().next().map(|(due, _)| *due)
    }

    /// Runs the tasks already due now. Tasks they schedule wait for the next call.
    pub fn run_due(&self) -> usize {
        let horizon = self.next_seq.get();
        let now = self.now_ms();
        let mut ran = 0;
        while let Some(task) = self.pop_next(now, horizon) {
            task();
            ran += 1;
        }
        ran
    }

    /// Moves the clock forward by `ms`, running everything that falls due on the way.
    pub fn advance_by(&self, ms: u64) -> usize {
        self.advance_to(self.now_ms() + ms)
    }

    /// Moves the clock to `target_ms`. Targets in the past are ignored.
    pub fn advance_to(&self, target_ms: u64) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due_ms().filter(|due| *due <= target_ms) {
            self.set_now(due.max(self.now_ms()));
            if let Some(task) = self.pop_next(due, u64::MAX) {
                task();
                ran += 1;
            }
        }
        if target_ms > self.now_ms() {
            self.set_now(target_ms);
        }
        ran
    }

    /// Jumps from task to task until the queue is empty or `max_tasks` ran.
    pub fn run_until_idle(&self, max_tasks: usize) -> usize {
        let mut ran = 0;
        while ran < max_tasks {
            let Some(due) = self.next_due_ms() else {
                break;
            };
            self.set_now(due.max(self.now_ms()));
            if let Some(task) = self.pop_next(due, u64::MAX) {
                task();
                ran += 1;
            }
        }
        ran
    }

    fn set_now(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
        loader_logging::set_clock_ms(now_ms);
    }

    fn pop_next(&self, due_limit: u64, seq_limit: u64) -> Option<Task> {
        let mut queue = self.queue.borrow_mut();
        let key = *queue.keys().find(|(due, seq)| *due <= due_limit && *seq < seq_limit)?;
        queue.remove(&key)
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay: Duration, task: Task) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let due = self.now_ms().saturating_add(delay_ms);
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.queue.borrow_mut().insert((due, seq), task);
    }
}

/// One node the loader asked the head to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub url: String,
    pub kind: Kind,
    pub at_ms: u64,
}

/// How a simulated stylesheet answers rule probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetPlan {
    /// Rules appear on this probe (1-based). `None` waits for [`SimulatedHead::complete`].
    pub ready_on_probe: Option<usize>,
    /// The first probes fail as if the sheet were cross-origin.
    pub denied_probes: usize,
}

pub struct SimulatedSheet {
    href: String,
    plan: SheetPlan,
    rules: Cell<usize>,
    probes: Cell<usize>,
    head: Weak<RefCell<HeadLog>>,
}

impl SimulatedSheet {
    fn new(href: &str, plan: SheetPlan, head: Weak<RefCell<HeadLog>>) -> Self {
        Self {
            href: href.to_string(),
            plan,
            rules: Cell::new(0),
            probes: Cell::new(0),
            head,
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.get()
    }

    fn deliver(&self) {
        if self.rules.get() == 0 {
            self.rules.set(1);
        }
    }

    /// Drops this sheet's pending node once its rules were read, releasing its hooks.
    fn leave_pending(&self) {
        let Some(log) = self.head.upgrade() else {
            return;
        };
        let finished = {
            let Ok(mut log) = log.try_borrow_mut() else {
                return;
            };
            log.pending
                .iter()
                .position(|load| match &load.node {
                    PendingNode::Stylesheet { sheet, .. } => std::ptr::eq(Rc::as_ptr(sheet), self),
                    PendingNode::Script(_) => false,
                })
                .map(|position| log.pending.remove(position))
        };
        drop(finished);
    }
}

impl StylesheetHandle for SimulatedSheet {
    fn href(&self) -> &str {
        &self.href
    }

    fn rule_count(&self) -> Result<usize, ProbeError> {
        let probe = self.probes.get() + 1;
        self.probes.set(probe);
        if probe <= self.plan.denied_probes {
            return Err(ProbeError::SecurityError {
                href: self.href.clone(),
                reason: "cross-origin stylesheet".to_string(),
            });
        }
        if self.plan.ready_on_probe.is_some_and(|ready| probe >= ready) {
            self.deliver();
        }
        let rules = self.rules.get();
        if rules > 0 {
            self.leave_pending();
        }
        Ok(rules)
    }
}

enum PendingNode {
    Script(LoadHook),
    Stylesheet {
        events: StylesheetEvents,
        sheet: Rc<SimulatedSheet>,
    },
}

struct PendingLoad {
    url: String,
    node: PendingNode,
}

#[derive(Default)]
struct HeadLog {
    injections: Vec<Injection>,
    pending: Vec<PendingLoad>,
    plans: HashMap<String, SheetPlan>,
    sheets: Vec<Rc<SimulatedSheet>>,
}

/// Records injected nodes and lets the caller decide when each one loads.
pub struct SimulatedHead {
    native_stylesheet_onload: bool,
    immediate_scripts: bool,
    feature_probes: Cell<usize>,
    log: Rc<RefCell<HeadLog>>,
}

impl SimulatedHead {
    pub fn new(native_stylesheet_onload: bool) -> Self {
        Self {
            native_stylesheet_onload,
            immediate_scripts: false,
            feature_probes: Cell::new(0),
            log: Rc::new(RefCell::new(HeadLog::default())),
        }
    }

    /// Scripts report loaded during `inject_script`, like hosts without a load signal.
    pub fn with_immediate_scripts(mut self) -> Self {
        self.immediate_scripts = true;
        self
    }

    /// Sets how stylesheets with this URL answer probes. Applies to later injections.
    pub fn plan_stylesheet(&self, url: &str, plan: SheetPlan) {
        self.log.borrow_mut().plans.insert(url.to_string(), plan);
    }

    pub fn injections(&self) -> Vec<Injection> {
        self.log.borrow().injections.clone()
    }

    pub fn injected_urls(&self) -> Vec<String> {
        self.log
            .borrow()
            .injections
            .iter()
            .map(|injection| injection.url.clone())
            .collect()
    }

    /// How often the loader ran the stylesheet `onload` feature probe.
    pub fn feature_probes(&self) -> usize {
        self.feature_probes.get()
    }

    /// Total rule probes against every stylesheet injected for `url`.
    pub fn probe_count(&self, url: &str) -> usize {
        self.log
            .borrow()
            .sheets
            .iter()
            .filter(|sheet| sheet.href == url)
            .map(|sheet| sheet.probes())
            .sum()
    }

    /// Number of injected nodes that have not finished loading.
    ///
    /// A polled stylesheet leaves this count when a rule read finds rules.
    pub fn pending(&self) -> usize {
        self.log.borrow().pending.len()
    }

    /// Finishes the oldest pending node for `url`. Returns false if none was pending.
    ///
    /// Scripts and natively signalled stylesheets fire their `onload` hook.
    /// Otherwise the stylesheet gains rules and waits for the next probe.
    pub fn complete(&self, url: &str) -> bool {
        let Some(load) = self.take_pending(url) else {
            return false;
        };
        match load.node {
            PendingNode::Script(on_load) => on_load(),
            PendingNode::Stylesheet { events, sheet } => {
                sheet.deliver();
                if self.native_stylesheet_onload {
                    (events.on_load)();
                }
            }
        }
        true
    }

    /// Reports a legacy `readyState` change on the oldest pending stylesheet for `url`.
    pub fn set_ready_state(&self, url: &str, state: ReadyState) -> bool {
        let position = {
            let log = self.log.borrow();
            log.pending.iter().position(|load| {
                load.url == url && matches!(load.node, PendingNode::Stylesheet { .. })
            })
        };
        let Some(position) = position else {
            return false;
        };
        let mut load = self.log.borrow_mut().pending.remove(position);
        if let PendingNode::Stylesheet { events, sheet } = &mut load.node {
            if state.is_done() {
                sheet.deliver();
            }
            (events.on_ready_state)(state);
        }
        if !state.is_done() {
            let mut log = self.log.borrow_mut();
            let position = position.min(log.pending.len());
            log.pending.insert(position, load);
        }
        true
    }

    fn take_pending(&self, url: &str) -> Option<PendingLoad> {
        let mut log = self.log.borrow_mut();
        let position = log.pending.iter().position(|load| load.url == url)?;
        Some(log.pending.remove(position))
    }

    fn record(&self, url: &str, kind: Kind) {
        self.log.borrow_mut().injections.push(Injection {
            url: url.to_string(),
            kind,
            at_ms: loader_logging::clock_ms(),
        });
    }
}

impl HeadInjector for SimulatedHead {
    fn supports_stylesheet_onload(&self) -> bool {
        self.feature_probes.set(self.feature_probes.get() + 1);
        self.native_stylesheet_onload
    }

    fn inject_script(&self, url: &str, on_load: LoadHook) {
        self.record(url, Kind::Script);
        if self.immediate_scripts {
            on_load();
            return;
        }
        self.log.borrow_mut().pending.push(PendingLoad {
            url: url.to_string(),
            node: PendingNode::Script(on_load),
        });
    }

    fn inject_stylesheet(&self, url: &str, events: StylesheetEvents) -> Rc<dyn StylesheetHandle> {
        self.record(url, Kind::Style);
        let mut log = self.log.borrow_mut();
        let plan = log.plans.get(url).copied().unwrap_or_default();
        let sheet = Rc::new(SimulatedSheet::new(url, plan, Rc::downgrade(&self.log)));
        log.sheets.push(Rc::clone(&sheet));
        log.pending.push(PendingLoad {
            url: url.to_string(),
            node: PendingNode::Stylesheet {
                events,
                sheet: Rc::clone(&sheet),
            },
        });
        sheet
    }
}
