//! Callback Registry
//!
//! Ordered list of host-thread callbacks with removable registrations.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Registration token returned by [`CallbackRegistry::add`], unique per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Callbacks invoked in registration order
pub struct CallbackRegistry<A> {
    callbacks: Vec<(CallbackId, Box<dyn FnMut(A)>)>,
}

impl<A: Clone> CallbackRegistry<A> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: impl FnMut(A) + 'static) -> CallbackId {
        let id = CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed));
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn remove(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn emit(&mut self, value: A) {
        for (_, callback) in &mut self.callbacks {
            callback(value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<A: Clone> Default for CallbackRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_order_and_removal() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();

        let first = {
            let log = log.clone();
            registry.add(move |v: u8| log.borrow_mut().push(("first", v)))
        };
        {
            let log = log.clone();
            registry.add(move |v: u8| log.borrow_mut().push(("second", v)));
        }

        registry.emit(1);
        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        registry.emit(2);

        assert_eq!(*log.borrow(), vec![("first", 1), ("second", 1), ("second", 2)]);
        assert_eq!(registry.len(), 1);
    }
}
