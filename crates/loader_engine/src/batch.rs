use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use loader_core::{
    update, BatchOptions, BatchProgress, BatchState, Effect, Msg, ReadyState, SlotId,
    StylesheetCompletion,
};
use loader_logging::{loader_debug, loader_info};

use crate::host::{HeadInjector, StylesheetEvents};
use crate::poller::StylesheetPoller;
use crate::registry::CallbackRegistry;
use crate::schedule::Scheduler;
use crate::settings::{LoaderSettings, SettingsError, StylesheetEventMode};

pub type BatchId = u64;

/// Entry point: creates batches against one host and scheduler.
#[derive(Clone)]
pub struct Loader {
    host: Rc<dyn HeadInjector>,
    scheduler: Rc<dyn Scheduler>,
    settings: LoaderSettings,
    next_id: Rc<Cell<BatchId>>,
}

impl Loader {
    /// Fails if `settings` do not validate, e.g. a zero poll interval.
    pub fn new(
        host: Rc<dyn HeadInjector>,
        scheduler: Rc<dyn Scheduler>,
        settings: LoaderSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            host,
            scheduler,
            settings,
            next_id: Rc::new(Cell::new(1)),
        })
    }

    /// Starts a batch for `urls`. Subscribe with [`LoaderBatch::then`].
    pub fn load<I, S>(&self, urls: I) -> LoaderBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batch = self.create(urls);
        batch.begin();
        batch
    }

    /// Starts a batch with `callback` already subscribed.
    ///
    /// An empty batch settles, and runs `callback`, before this returns.
    pub fn load_then<I, S, F>(&self, urls: I, callback: F) -> LoaderBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce() + 'static,
    {
        let batch = self.create(urls);
        batch.then(callback);
        batch.begin();
        batch
    }

    fn create<I, S>(&self, urls: I) -> LoaderBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let stylesheet_onload = match self.settings.stylesheet_events {
            StylesheetEventMode::Detect => self.host.supports_stylesheet_onload(),
            StylesheetEventMode::Native => true,
            StylesheetEventMode::Poll => false,
        };
        let options = BatchOptions {
            match_policy: self.settings.match_policy,
            unclassified: self.settings.unclassified,
            stylesheet_onload,
        };
        let state = BatchState::new(urls, options);
        loader_info!(
            "batch {} created: {} entries, {} unclassified skipped, stylesheet onload {}",
            id,
            state.entries().len(),
            state.skipped(),
            stylesheet_onload
        );

        LoaderBatch {
            inner: Rc::new(BatchInner {
                id,
                state: RefCell::new(state),
                subscribers: CallbackRegistry::new(),
                poller: StylesheetPoller::new(
                    Rc::clone(&self.scheduler),
                    self.settings.poll_interval(),
                ),
                loader: self.clone(),
            }),
        }
    }
}

/// Handle to one batch. Clones share the same batch.
#[derive(Clone)]
pub struct LoaderBatch {
    inner: Rc<BatchInner>,
}

struct BatchInner {
    id: BatchId,
    state: RefCell<BatchState>,
    subscribers: CallbackRegistry,
    poller: StylesheetPoller,
    loader: Loader,
}

impl LoaderBatch {
    pub fn id(&self) -> BatchId {
        self.inner.id
    }

    /// Adds a completion subscriber. On a settled batch it runs immediately.
    pub fn then<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + 'static,
    {
        self.inner.subscribers.register(callback);
        self
    }

    /// Creates a batch for `urls` that starts loading once this one settles.
    pub fn then_load<I, S>(&self, urls: I) -> LoaderBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let follow_up = self.inner.loader.create(urls);
        loader_debug!(
            "batch {} queued behind batch {}",
            follow_up.id(),
            self.id()
        );
        let starter = follow_up.clone();
        self.then(move || starter.begin());
        follow_up
    }

    /// Like [`LoaderBatch::then_load`] with `callback` already subscribed to the new batch.
    pub fn then_load_then<I, S, F>(&self, urls: I, callback: F) -> LoaderBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce() + 'static,
    {
        let follow_up = self.then_load(urls);
        follow_up.then(callback);
        follow_up
    }

    /// Marks the first pending slot holding `url` as loaded.
    pub fn mark_loaded(&self, url: &str) {
        self.dispatch(Msg::UrlLoaded {
            url: url.to_string(),
        });
    }

    pub fn progress(&self) -> BatchProgress {
        self.inner.state.borrow().progress()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.state.borrow().is_settled()
    }

    fn is_slot_loaded(&self, slot: SlotId) -> bool {
        self.inner.state.borrow().is_slot_loaded(slot)
    }

    fn begin(&self) {
        let defer = self.inner.loader.settings.defer_start
            && !self.inner.state.borrow().entries().is_empty();
        if defer {
            let batch = self.clone();
            self.inner
                .loader
                .scheduler
                .set_timeout(Duration::ZERO, Box::new(move || batch.dispatch(Msg::Start)));
        } else {
            self.dispatch(Msg::Start);
        }
    }

    fn dispatch(&self, msg: Msg) {
        let effects = {
            let mut guard = self.inner.state.borrow_mut();
            let state = std::mem::take(&mut *guard);
            let (state, effects) = update(state, msg);
            *guard = state;
            effects
        };
        // The borrow is released: hooks and subscribers may re-enter this batch.
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&self, effect: Effect) {
        let host = &self.inner.loader.host;
        match effect {
            Effect::InjectScript { slot, url } => {
                loader_debug!("batch {} injecting script {} (slot {})", self.id(), url, slot);
                let batch = self.clone();
                host.inject_script(&url, Box::new(move || batch.dispatch(Msg::SlotLoaded { slot })));
            }
            Effect::InjectStylesheet {
                slot,
                url,
                completion,
            } => {
                loader_debug!(
                    "batch {} injecting stylesheet {} (slot {}, {:?})",
                    self.id(),
                    url,
                    slot,
                    completion
                );
                let on_load = self.clone();
                let on_ready_state = self.clone();
                let sheet = host.inject_stylesheet(
                    &url,
                    StylesheetEvents {
                        on_load: Box::new(move || on_load.dispatch(Msg::SlotLoaded { slot })),
                        on_ready_state: Box::new(move |state: ReadyState| {
                            on_ready_state.dispatch(Msg::ReadyStateChanged { slot, state })
                        }),
                    },
                );
                if completion == StylesheetCompletion::Poll {
                    loader_debug!(
                        "batch {} polling {} every {:?}",
                        self.id(),
                        url,
                        self.inner.poller.interval()
                    );
                    let watched = self.clone();
                    let loaded = self.clone();
                    self.inner.poller.watch(
                        sheet,
                        move || watched.is_slot_loaded(slot),
                        move || loaded.dispatch(Msg::SlotLoaded { slot }),
                    );
                }
            }
            Effect::NotifySubscribers => {
                loader_info!(
                    "t={}ms batch {} settled, notifying {} subscriber(s)",
                    loader_logging::clock_ms(),
                    self.id(),
                    self.inner.subscribers.len()
                );
                self.inner.subscribers.invoke_all();
            }
        }
    }
}

impl std::fmt::Debug for LoaderBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderBatch")
            .field("id", &self.inner.id)
            .field("progress", &self.progress())
            .field("subscribers", &self.inner.subscribers)
            .finish()
    }
}
