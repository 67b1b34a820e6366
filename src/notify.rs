//! # Change notifications
//!
//! Trees tell their bound display surfaces what moved through three event
//! shapes: rows inserted under a parent, rows removed from a parent, and a
//! data-changed range whose cells must be re-queried. The protocol is the
//! structural half only — value changes inside an existing node always
//! arrive as conservative `DataChanged` ranges, never as fine-grained diffs,
//! because consumers re-query `data()` live anyway.
//!
//! Everything is single-threaded: listeners run synchronously inside the
//! event handler that caused the mutation, after the structure has already
//! been updated, so a listener that immediately re-reads the tree sees a
//! consistent picture. Listeners must not mutate the tree re-entrantly.

use crate::path::TreePath;
use std::cell::RefCell;
use std::rc::Rc;

/// One change to a tree's structure or displayed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    RowsInserted {
        parent: TreePath,
        first: usize,
        last: usize,
    },
    RowsRemoved {
        parent: TreePath,
        first: usize,
        last: usize,
    },
    DataChanged {
        start: TreePath,
        end: TreePath,
    },
}

type Listener = Box<dyn FnMut(&TreeChange)>;

/// Fan-out point for [`TreeChange`] events. Owned by a tree; listeners are
/// invoked in subscription order.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<Listener>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F: FnMut(&TreeChange) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn emit(&mut self, change: TreeChange) {
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Collects every change it sees; the standard test listener.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    changes: Rc<RefCell<Vec<TreeChange>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes this recorder to `notifier`. Clones share the same log.
    pub fn attach(&self, notifier: &mut ChangeNotifier) {
        let changes = Rc::clone(&self.changes);
        notifier.subscribe(move |change| changes.borrow_mut().push(change.clone()));
    }

    pub fn take(&self) -> Vec<TreeChange> {
        self.changes.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let mut notifier = ChangeNotifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            notifier.subscribe(move |_| log.borrow_mut().push(tag));
        }
        notifier.emit(TreeChange::DataChanged {
            start: TreePath::root(),
            end: TreePath::root(),
        });
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_recorder_collects_and_drains() {
        let mut notifier = ChangeNotifier::new();
        let recorder = Recorder::new();
        recorder.attach(&mut notifier);

        notifier.emit(TreeChange::RowsInserted {
            parent: TreePath::root(),
            first: 0,
            last: 0,
        });
        assert_eq!(recorder.len(), 1);
        let changes = recorder.take();
        assert!(matches!(changes[0], TreeChange::RowsInserted { .. }));
        assert!(recorder.is_empty());
    }
}
