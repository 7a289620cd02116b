use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

pub type Task = Box<dyn FnOnce()>;

/// Host timer queue. Tasks run later on the same thread, never inside `set_timeout`.
pub trait Scheduler {
    fn set_timeout(&self, delay: Duration, task: Task);
}

/// Runs `step` now and then every `interval` until it returns `Break`.
///
/// The scheduled closure owns `step`, so whatever `step` captures lives exactly
/// as long as the repetition does.
pub fn repeat_every<F>(scheduler: Rc<dyn Scheduler>, interval: Duration, mut step: F)
where
    F: FnMut() -> ControlFlow<()> + 'static,
{
    if step().is_break() {
        return;
    }
    let next = Rc::clone(&scheduler);
    scheduler.set_timeout(
        interval,
        Box::new(move || repeat_every(next, interval, step)),
    );
}
