use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// A lock-free mailbox holding at most one value.
///
/// Producers overwrite, the consumer takes. A value that is replaced before
/// it is taken is dropped, which gives a depth-1 latest-wins queue.
#[derive(Debug)]
pub struct Slot<T> {
    value: ArcSwapOption<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            value: ArcSwapOption::empty(),
        }
    }

    /// Stores a value. Returns true when an untaken value was displaced.
    pub fn send(&self, val: T) -> bool {
        self.send_arc(Arc::new(val))
    }

    /// Stores an already shared value without copying it.
    pub fn send_arc(&self, val: Arc<T>) -> bool {
        self.value.swap(Some(val)).is_some()
    }

    /// Takes the value if present, leaving the slot empty.
    pub fn take(&self) -> Option<Arc<T>> {
        self.value.swap(None)
    }

    pub fn has_value(&self) -> bool {
        self.value.load().is_some()
    }
}
