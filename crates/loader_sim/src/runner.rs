use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use loader_engine::sim::{ManualScheduler, SimulatedHead};
use loader_engine::{Loader, LoaderBatch, LoaderSettings, Scheduler, SettingsError};
use loader_logging::{loader_debug, loader_info};

use crate::scenario::{Scenario, ScenarioBatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub label: String,
    pub settled_at_ms: Option<u64>,
    pub pending_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcomes: Vec<BatchOutcome>,
    pub finished_at_ms: u64,
    pub injections: usize,
}

struct Tracked {
    label: String,
    batch: LoaderBatch,
    settled_at_ms: Rc<RefCell<Option<u64>>>,
}

/// Replays `scenario` on a virtual clock until nothing is left to do or the horizon passes.
///
/// Outcomes come back in scenario order, each parent ahead of its `then_load` children.
pub fn run(scenario: &Scenario, settings: LoaderSettings) -> Result<Report, SettingsError> {
    let head = Rc::new(SimulatedHead::new(scenario.native_stylesheet_onload));
    for (url, plan) in &scenario.sheets {
        head.plan_stylesheet(url, *plan);
    }
    let scheduler = Rc::new(ManualScheduler::new());
    let loader = Loader::new(head.clone(), scheduler.clone(), settings)?;

    let tracked = Rc::new(RefCell::new(Vec::new()));
    for (index, spec) in scenario.batches.iter().enumerate() {
        let batch = loader.load(spec.urls.iter().cloned());
        track(&batch, (index + 1).to_string(), spec, &tracked);
    }

    let mut seen = 0;
    loop {
        seen = schedule_arrivals(scenario, &head, &scheduler, seen);
        match scheduler.next_due_ms() {
            Some(due) if due <= scenario.horizon_ms => {
                scheduler.run_until_idle(1);
            }
            _ => break,
        }
    }

    let injections = head.injections().len();
    let outcomes = tracked
        .borrow()
        .iter()
        .map(|t| BatchOutcome {
            label: t.label.clone(),
            settled_at_ms: *t.settled_at_ms.borrow(),
            pending_urls: t.batch.progress().pending_urls,
        })
        .collect();

    Ok(Report {
        outcomes,
        finished_at_ms: scheduler.now_ms(),
        injections,
    })
}

fn track(
    batch: &LoaderBatch,
    label: String,
    spec: &ScenarioBatch,
    tracked: &Rc<RefCell<Vec<Tracked>>>,
) {
    let settled_at_ms = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&settled_at_ms);
    let settled_label = label.clone();
    batch.then(move || {
        let now = loader_logging::clock_ms();
        loader_info!("batch {} settled at {}ms", settled_label, now);
        *slot.borrow_mut() = Some(now);
    });
    tracked.borrow_mut().push(Tracked {
        label: label.clone(),
        batch: batch.clone(),
        settled_at_ms,
    });

    for (index, child_spec) in spec.then_load.iter().enumerate() {
        let child = batch.then_load(child_spec.urls.iter().cloned());
        track(&child, format!("{label}.{}", index + 1), child_spec, tracked);
    }
}

/// Schedules the arrival of every injection made since `seen`. Returns the new cursor.
fn schedule_arrivals(
    scenario: &Scenario,
    head: &Rc<SimulatedHead>,
    scheduler: &Rc<ManualScheduler>,
    seen: usize,
) -> usize {
    let injections = head.injections();
    for injection in &injections[seen..] {
        let Some(latency) = scenario.latency_for(&injection.url) else {
            loader_debug!("{} never arrives", injection.url);
            continue;
        };
        let head = Rc::clone(head);
        let url = injection.url.clone();
        scheduler.set_timeout(
            Duration::from_millis(latency),
            Box::new(move || {
                head.complete(&url);
            }),
        );
    }
    injections.len()
}
