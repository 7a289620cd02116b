use crate::{BatchState, Effect, Kind, Msg, StylesheetCompletion};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: BatchState, msg: Msg) -> (BatchState, Vec<Effect>) {
    let mut effects = match msg {
        Msg::Start => {
            if !state.begin_loading() {
                return (state, Vec::new());
            }
            dispatch_entries(&state)
        }
        Msg::SlotLoaded { slot } => {
            if !state.mark_slot(slot) {
                return (state, Vec::new());
            }
            Vec::new()
        }
        Msg::ReadyStateChanged { slot, state: ready } => {
            if !ready.is_done() || !state.mark_slot(slot) {
                return (state, Vec::new());
            }
            Vec::new()
        }
        Msg::UrlLoaded { url } => {
            if state.mark_url(&url).is_none() {
                return (state, Vec::new());
            }
            Vec::new()
        }
    };

    // Full rescan after every mark; batches are page-load sized.
    if state.try_settle() {
        effects.push(Effect::NotifySubscribers);
    }

    (state, effects)
}

fn dispatch_entries(state: &BatchState) -> Vec<Effect> {
    let completion = if state.options().stylesheet_onload {
        StylesheetCompletion::NativeEvent
    } else {
        StylesheetCompletion::Poll
    };
    state
        .entries()
        .iter()
        .enumerate()
        .filter_map(|(slot, entry)| match entry.kind {
            Kind::Script => Some(Effect::InjectScript {
                slot,
                url: entry.url.clone(),
            }),
            Kind::Style => Some(Effect::InjectStylesheet {
                slot,
                url: entry.url.clone(),
                completion,
            }),
            Kind::Unknown => None,
        })
        .collect()
}
