#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use loader_engine::sim::{ManualScheduler, SimulatedHead};
use loader_engine::{Loader, LoaderSettings};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(loader_logging::initialize_for_tests);
}

pub struct Harness {
    pub head: Rc<SimulatedHead>,
    pub scheduler: Rc<ManualScheduler>,
    pub loader: Loader,
}

impl Harness {
    /// Host with native stylesheet `onload` and default settings.
    pub fn native() -> Self {
        Self::with(SimulatedHead::new(true), LoaderSettings::default())
    }

    /// Host without stylesheet `onload`, so stylesheets are polled.
    pub fn legacy() -> Self {
        Self::with(SimulatedHead::new(false), LoaderSettings::default())
    }

    pub fn with(head: SimulatedHead, settings: LoaderSettings) -> Self {
        init_logging();
        let head = Rc::new(head);
        let scheduler = Rc::new(ManualScheduler::new());
        let loader = Loader::new(head.clone(), scheduler.clone(), settings).unwrap();
        Self {
            head,
            scheduler,
            loader,
        }
    }
}

/// Shared log that callbacks append to.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that records `label` when it runs.
    pub fn hook(&self, label: &str) -> impl FnOnce() + 'static {
        let events = Rc::clone(&self.events);
        let label = label.to_string();
        move || events.borrow_mut().push(label)
    }

    pub fn push(&self, label: &str) {
        self.events.borrow_mut().push(label.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == label).count()
    }
}
