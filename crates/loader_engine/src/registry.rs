use std::cell::{Cell, RefCell};

pub type Callback = Box<dyn FnOnce()>;

/// Completion subscribers of one batch.
///
/// Callbacks run in registration order, once. Anything registered after
/// [`CallbackRegistry::invoke_all`] has run is invoked on the spot.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: RefCell<Vec<Callback>>,
    settled: Cell<bool>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        if self.settled.get() {
            callback();
            return;
        }
        self.pending.borrow_mut().push(Box::new(callback));
    }

    /// Fires every pending callback. Returns how many ran; later calls return 0.
    pub fn invoke_all(&self) -> usize {
        if self.settled.replace(true) {
            return 0;
        }
        // Take the list first: callbacks may register more subscribers.
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }

    pub fn is_settled(&self) -> bool {
        self.settled.get()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.len())
            .field("settled", &self.settled.get())
            .finish()
    }
}
