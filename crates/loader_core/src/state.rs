use serde::{Deserialize, Serialize};

use crate::kind::{classify_with, Kind, MatchPolicy};
use crate::progress::BatchProgress;

/// Position of an entry inside its batch. Duplicated URLs get distinct slots.
pub type SlotId = usize;

/// What to do with URLs that classify as [`Kind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnclassifiedPolicy {
    /// Leave them out of the batch entirely.
    #[default]
    Skip,
    /// Keep a slot for them. Nothing ever loads such a slot, so the batch
    /// cannot settle unless the host calls `mark_loaded` for it.
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    pub match_policy: MatchPolicy,
    pub unclassified: UnclassifiedPolicy,
    /// Result of the host's stylesheet `onload` feature probe.
    pub stylesheet_onload: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub url: String,
    pub kind: Kind,
    loaded: bool,
}

impl FileEntry {
    fn new(url: String, kind: Kind) -> Self {
        Self {
            url,
            kind,
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Constructed,
    Loading,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchState {
    entries: Vec<FileEntry>,
    phase: Phase,
    options: BatchOptions,
    skipped: usize,
}

impl BatchState {
    pub fn new<I, S>(urls: I, options: BatchOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut skipped = 0;
        for url in urls {
            let url = url.into();
            let kind = classify_with(&url, options.match_policy);
            if kind == Kind::Unknown && options.unclassified == UnclassifiedPolicy::Skip {
                skipped += 1;
                continue;
            }
            entries.push(FileEntry::new(url, kind));
        }
        Self {
            entries,
            phase: Phase::Constructed,
            options,
            skipped,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Number of input URLs left out under [`UnclassifiedPolicy::Skip`].
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_slot_loaded(&self, slot: SlotId) -> bool {
        self.entries.get(slot).is_some_and(FileEntry::is_loaded)
    }

    pub fn all_loaded(&self) -> bool {
        self.entries.iter().all(FileEntry::is_loaded)
    }

    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            phase: self.phase,
            total: self.entries.len(),
            loaded: self.entries.iter().filter(|e| e.loaded).count(),
            pending_urls: self
                .entries
                .iter()
                .filter(|e| !e.loaded)
                .map(|e| e.url.clone())
                .collect(),
        }
    }

    /// Flips a slot to loaded. Returns false if it already was, or does not exist.
    pub(crate) fn mark_slot(&mut self, slot: SlotId) -> bool {
        match self.entries.get_mut(slot) {
            Some(entry) if !entry.loaded => {
                entry.loaded = true;
                true
            }
            _ => false,
        }
    }

    /// Flips the first pending slot holding `url`, if any.
    pub(crate) fn mark_url(&mut self, url: &str) -> Option<SlotId> {
        let slot = self
            .entries
            .iter()
            .position(|entry| !entry.loaded && entry.url == url)?;
        self.entries[slot].loaded = true;
        Some(slot)
    }

    pub(crate) fn begin_loading(&mut self) -> bool {
        if self.phase != Phase::Constructed {
            return false;
        }
        self.phase = Phase::Loading;
        true
    }

    /// Moves to `Settled` if every entry is loaded. True only on the transition.
    pub(crate) fn try_settle(&mut self) -> bool {
        if self.phase == Phase::Settled || !self.all_loaded() {
            return false;
        }
        self.phase = Phase::Settled;
        true
    }
}
