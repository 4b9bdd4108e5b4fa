//! One-popup-at-a-time controller.
//!
//! The host can render any number of popups, but this plugin only ever wants
//! one visible. The controller owns the currently open handle; showing a new
//! popup closes the previous one instead of leaking it.

use std::sync::Mutex;

use crate::ports::outbound::PopupHandle;

#[derive(Default)]
pub struct PopupController {
    current: Mutex<Option<PopupHandle>>,
}

impl PopupController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly opened popup, closing any previous one.
    pub fn show(&self, handle: PopupHandle) {
        let previous = {
            let mut current = self.current.lock().expect("popup lock poisoned");
            current.replace(handle)
        };
        if let Some(previous) = previous {
            previous.close();
        }
    }

    /// Close the current popup, if any.
    pub fn close(&self) {
        let handle = {
            let mut current = self.current.lock().expect("popup lock poisoned");
            current.take()
        };
        if let Some(handle) = handle {
            handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_handle(counter: &Arc<AtomicU32>) -> PopupHandle {
        let counter = Arc::clone(counter);
        PopupHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn close_without_popup_is_a_no_op() {
        PopupController::new().close();
    }

    #[test]
    fn showing_a_second_popup_closes_the_first() {
        let controller = PopupController::new();
        let closed = Arc::new(AtomicU32::new(0));

        controller.show(counting_handle(&closed));
        assert_eq!(closed.load(Ordering::SeqCst), 0);

        controller.show(counting_handle(&closed));
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        controller.close();
        assert_eq!(closed.load(Ordering::SeqCst), 2);

        // already closed
        controller.close();
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }
}
