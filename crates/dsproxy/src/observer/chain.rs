use super::types::{CallEnvelope, Observer};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Slot {
    observer: Arc<dyn Observer>,
    reported: AtomicBool,
}

/// Ordered observers notified around every call.
///
/// Each observer is isolated: a panic inside one is caught, reported once per
/// observer through `tracing`, and the remaining observers still run.
#[derive(Default)]
pub struct ObserverChain {
    slots: Vec<Slot>,
}

impl ObserverChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; observers run in the order they were added.
    pub fn push(&mut self, observer: Arc<dyn Observer>) {
        self.slots.push(Slot {
            observer,
            reported: AtomicBool::new(false),
        });
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Notify every observer that a call is about to run.
    pub fn notify_before(&self, call: &CallEnvelope<'_>) {
        self.dispatch("before", call, |observer, call| observer.on_before(call));
    }

    /// Notify every observer that a call has completed.
    pub fn notify_after(&self, call: &CallEnvelope<'_>) {
        self.dispatch("after", call, |observer, call| observer.on_after(call));
    }

    fn dispatch(
        &self,
        phase: &'static str,
        call: &CallEnvelope<'_>,
        notify: impl Fn(&dyn Observer, &CallEnvelope<'_>),
    ) {
        for (index, slot) in self.slots.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| notify(slot.observer.as_ref(), call)));
            if outcome.is_err() && !slot.reported.swap(true, Ordering::Relaxed) {
                tracing::error!(
                    target: "dsproxy",
                    observer = index,
                    phase,
                    method = call.method,
                    sequence = call.sequence,
                    "observer panicked; remaining observers still run"
                );
            }
        }
    }
}

impl fmt::Debug for ObserverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverChain")
            .field("observers", &self.slots.len())
            .finish()
    }
}
