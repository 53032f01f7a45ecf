//! Call journal

use std::cell::RefCell;
use std::rc::Rc;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// API name, e.g. `close_image`.
    pub call: &'static str,
    /// The call's primary argument rendered as text (handle, file name, key).
    pub argument: String,
    /// The option list passed to the call, empty if it takes none.
    pub options: String,
}

/// Shared, append-only record of engine calls.
///
/// Cloning a `Journal` yields another view onto the same record, so a test
/// can keep one while the engine itself is moved into its owner.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &self,
        call: &'static str,
        argument: impl Into<String>,
        options: impl Into<String>,
    ) {
        self.entries.borrow_mut().push(JournalEntry {
            call,
            argument: argument.into(),
            options: options.into(),
        });
    }

    /// Snapshot of all entries recorded so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.borrow().clone()
    }

    /// Names of all calls recorded so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(|e| e.call).collect()
    }

    /// Entries for a single API call, in order.
    pub fn calls_to(&self, call: &str) -> Vec<JournalEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.call == call)
            .cloned()
            .collect()
    }

    /// Number of times `call` was made.
    pub fn count(&self, call: &str) -> usize {
        self.entries.borrow().iter().filter(|e| e.call == call).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let journal = Journal::new();
        let view = journal.clone();
        journal.record("begin_document", "", "compatibility=1.7");
        journal.record("end_document", "", "");
        assert_eq!(view.calls(), vec!["begin_document", "end_document"]);
        assert_eq!(view.count("end_document"), 1);
        assert_eq!(view.calls_to("begin_document")[0].options, "compatibility=1.7");
        view.clear();
        assert!(journal.entries().is_empty());
    }
}
