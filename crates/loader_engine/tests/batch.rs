mod common;

use std::rc::Rc;

use common::{Harness, Recorder};
use loader_engine::sim::{ManualScheduler, SimulatedHead};
use loader_engine::{
    Loader, LoaderSettings, Phase, SettingsError, StylesheetEventMode, UnclassifiedPolicy,
};
use pretty_assertions::assert_eq;

#[test]
fn subscribers_fire_once_in_registration_order() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load_then(["a.js", "b.css"], rec.hook("f1"));
    batch.then(rec.hook("f2")).then(rec.hook("f3"));
    h.scheduler.run_due();

    assert!(h.head.complete("b.css"));
    assert!(rec.events().is_empty());
    assert!(h.head.complete("a.js"));
    assert_eq!(rec.events(), vec!["f1", "f2", "f3"]);

    // Late or repeated signals never re-run subscribers.
    batch.mark_loaded("a.js");
    h.scheduler.run_until_idle(100);
    assert_eq!(rec.events().len(), 3);
    assert!(batch.is_settled());
}

#[test]
fn empty_batch_settles_during_construction() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load_then(Vec::<String>::new(), rec.hook("done"));

    assert_eq!(rec.events(), vec!["done"]);
    assert_eq!(batch.progress().phase, Phase::Settled);
    assert_eq!(h.scheduler.pending(), 0);
    assert!(h.head.injections().is_empty());
}

#[test]
fn late_subscriber_runs_immediately() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load(["a.js"]);
    h.scheduler.run_due();
    h.head.complete("a.js");
    assert!(batch.is_settled());

    batch.then(rec.hook("late"));
    assert_eq!(rec.events(), vec!["late"]);
}

#[test]
fn duplicate_urls_are_independent_slots() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load_then(["a.js", "a.js"], rec.hook("done"));
    h.scheduler.run_due();
    assert_eq!(h.head.injected_urls(), vec!["a.js", "a.js"]);

    h.head.complete("a.js");
    assert!(!batch.is_settled());
    assert_eq!(batch.progress().loaded, 1);

    h.head.complete("a.js");
    assert_eq!(rec.events(), vec!["done"]);
}

#[test]
fn mark_loaded_by_url_needs_one_call_per_slot() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load_then(["a.js", "a.js"], rec.hook("done"));
    batch.mark_loaded("a.js");
    assert!(rec.events().is_empty());
    batch.mark_loaded("a.js");
    assert_eq!(rec.events(), vec!["done"]);
    batch.mark_loaded("a.js");
    assert_eq!(rec.count("done"), 1);
}

#[test]
fn loading_starts_on_the_next_tick() {
    let h = Harness::native();
    let batch = h.loader.load(["a.js", "b.css"]);

    assert_eq!(batch.progress().phase, Phase::Constructed);
    assert!(h.head.injections().is_empty());

    assert_eq!(h.scheduler.run_due(), 1);
    assert_eq!(batch.progress().phase, Phase::Loading);
    assert_eq!(h.head.injected_urls(), vec!["a.js", "b.css"]);
}

#[test]
fn immediate_start_when_not_deferred() {
    let settings = LoaderSettings {
        defer_start: false,
        ..LoaderSettings::default()
    };
    let h = Harness::with(SimulatedHead::new(true), settings);

    let batch = h.loader.load(["a.js"]);

    assert_eq!(batch.progress().phase, Phase::Loading);
    assert_eq!(h.head.injected_urls(), vec!["a.js"]);
    assert_eq!(h.scheduler.pending(), 0);
}

#[test]
fn follow_up_batch_waits_for_parent() {
    let h = Harness::native();
    let rec = Recorder::new();

    let parent = h.loader.load_then(["a.js"], rec.hook("parent"));
    let child = parent.then_load(["b.js", "c.css"]);
    child.then(rec.hook("child"));

    h.scheduler.run_until_idle(100);
    assert_eq!(h.head.injected_urls(), vec!["a.js"]);
    assert_eq!(child.progress().phase, Phase::Constructed);

    h.head.complete("a.js");
    assert_eq!(rec.events(), vec!["parent"]);
    h.scheduler.run_due();
    assert_eq!(h.head.injected_urls(), vec!["a.js", "b.js", "c.css"]);

    h.head.complete("c.css");
    h.head.complete("b.js");
    assert_eq!(rec.events(), vec!["parent", "child"]);
    assert_ne!(parent.id(), child.id());
}

#[test]
fn follow_up_with_callback_fires_after_its_own_resources() {
    let h = Harness::native();
    let rec = Recorder::new();

    let parent = h.loader.load_then(["a.js"], rec.hook("parent"));
    let child = parent.then_load_then(["b.js"], rec.hook("child"));
    h.scheduler.run_due();
    assert_eq!(child.progress().phase, Phase::Constructed);

    h.head.complete("a.js");
    h.scheduler.run_due();
    assert_eq!(rec.events(), vec!["parent"]);
    assert_eq!(h.head.injected_urls(), vec!["a.js", "b.js"]);

    h.head.complete("b.js");
    assert_eq!(rec.events(), vec!["parent", "child"]);
    assert!(child.is_settled());
}

#[test]
fn loader_rejects_a_zero_poll_interval() {
    common::init_logging();
    let settings = LoaderSettings {
        poll_interval_ms: 0,
        ..LoaderSettings::default()
    };
    let result = Loader::new(
        Rc::new(SimulatedHead::new(false)),
        Rc::new(ManualScheduler::new()),
        settings,
    );

    assert!(matches!(result, Err(SettingsError::Invalid(_))));
}

#[test]
fn follow_up_of_settled_parent_starts_right_away() {
    let h = Harness::native();
    let rec = Recorder::new();

    let parent = h.loader.load(Vec::<String>::new());
    assert!(parent.is_settled());

    let child = parent.then_load(["b.js"]);
    child.then(rec.hook("child"));
    h.scheduler.run_due();
    assert_eq!(h.head.injected_urls(), vec!["b.js"]);

    h.head.complete("b.js");
    assert_eq!(rec.events(), vec!["child"]);
}

#[test]
fn empty_follow_up_settles_with_parent() {
    let h = Harness::native();
    let rec = Recorder::new();

    let parent = h.loader.load(["a.js"]);
    let child = parent.then_load(Vec::<String>::new());
    child.then(rec.hook("child"));
    h.scheduler.run_due();
    assert!(rec.events().is_empty());

    h.head.complete("a.js");
    assert_eq!(rec.events(), vec!["child"]);
}

#[test]
fn unknown_urls_are_not_loaded() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load_then(["data.json", "a.js"], rec.hook("done"));
    h.scheduler.run_due();
    assert_eq!(h.head.injected_urls(), vec!["a.js"]);
    assert_eq!(batch.progress().total, 1);

    h.head.complete("a.js");
    assert_eq!(rec.events(), vec!["done"]);
}

#[test]
fn only_unknown_urls_settle_immediately_when_skipped() {
    let h = Harness::native();
    let rec = Recorder::new();

    h.loader.load_then(["data.json", "feed.xml"], rec.hook("done"));

    assert_eq!(rec.events(), vec!["done"]);
    assert!(h.head.injections().is_empty());
}

#[test]
fn tracked_unknown_urls_block_the_batch() {
    let settings = LoaderSettings {
        unclassified: UnclassifiedPolicy::Track,
        ..LoaderSettings::default()
    };
    let h = Harness::with(SimulatedHead::new(true), settings);
    let rec = Recorder::new();

    let batch = h.loader.load_then(["data.json", "a.js"], rec.hook("done"));
    h.scheduler.run_due();
    h.head.complete("a.js");
    h.scheduler.run_until_idle(100);

    assert!(rec.events().is_empty());
    assert_eq!(batch.progress().pending_urls, vec!["data.json".to_string()]);

    // Only an explicit mark can release it.
    batch.mark_loaded("data.json");
    assert_eq!(rec.events(), vec!["done"]);
}

#[test]
fn synchronous_host_signals_are_handled() {
    let h = Harness::with(
        SimulatedHead::new(true).with_immediate_scripts(),
        LoaderSettings::default(),
    );
    let rec = Recorder::new();

    let batch = h.loader.load_then(["a.js", "b.js"], rec.hook("done"));
    assert!(rec.events().is_empty());

    h.scheduler.run_due();
    assert_eq!(rec.events(), vec!["done"]);
    assert!(batch.is_settled());
}

#[test]
fn subscribers_may_reenter_the_batch() {
    let h = Harness::native();
    let rec = Recorder::new();

    let batch = h.loader.load(["a.js"]);
    let inner = batch.clone();
    let inner_rec = rec.clone();
    batch.then(move || {
        inner_rec.push("outer");
        inner.then(inner_rec.hook("nested"));
        assert!(inner.is_settled());
    });
    batch.then(rec.hook("second"));

    h.scheduler.run_due();
    h.head.complete("a.js");

    assert_eq!(rec.events(), vec!["outer", "nested", "second"]);
}

#[test]
fn feature_probe_runs_once_per_batch() {
    let h = Harness::native();

    h.loader.load(["a.css"]);
    h.loader.load(["b.css", "c.css"]);
    assert_eq!(h.head.feature_probes(), 2);

    let forced = LoaderSettings {
        stylesheet_events: StylesheetEventMode::Native,
        ..LoaderSettings::default()
    };
    let h = Harness::with(SimulatedHead::new(false), forced);
    h.loader.load(["a.css"]);
    assert_eq!(h.head.feature_probes(), 0);
}

#[test]
fn progress_tracks_marks() {
    let h = Harness::native();
    let batch = h.loader.load(["a.js", "b.css", "c.js"]);
    h.scheduler.run_due();
    h.head.complete("b.css");

    let progress = batch.progress();
    assert_eq!(progress.total, 3);
    assert_eq!(progress.loaded, 1);
    assert_eq!(
        progress.pending_urls,
        vec!["a.js".to_string(), "c.js".to_string()]
    );
    assert!(!progress.is_settled());
}
