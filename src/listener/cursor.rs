//! Bracketing of [`Feature`] events.
//!
//! [`Feature`]: crate::event::Feature

use std::{sync::Arc, time::SystemTime};

use crate::event::{Document, Event, Lifecycle};

/// Tracker of the currently open [`Document`].
///
/// At most one [`Document`] is open at a time: entering another one closes
/// the current one first, so [`Feature`] brackets never overlap even when the
/// engine interleaves scenarios of different documents.
///
/// [`Feature`]: crate::event::Feature
#[derive(Debug, Default)]
pub struct Cursor {
    /// Currently open [`Document`].
    current: Option<Arc<Document>>,
}

impl Cursor {
    /// Returns the currently open [`Document`].
    #[must_use]
    pub const fn current(&self) -> Option<&Arc<Document>> {
        self.current.as_ref()
    }

    /// Makes the given `doc` the open one, returning the bracketing events
    /// required for that.
    ///
    /// Entering the already open [`Document`] emits nothing.
    pub fn enter(
        &mut self,
        doc: &Arc<Document>,
        at: SystemTime,
    ) -> Vec<Event<Lifecycle>> {
        if self.current.as_ref().is_some_and(|cur| cur.uri == doc.uri) {
            return vec![];
        }

        let mut events = Vec::with_capacity(2);
        events.extend(self.close(at));

        self.current = Some(Arc::clone(doc));
        events.push(Event::stamped(
            Lifecycle::feature_started(Arc::clone(doc)),
            at,
        ));
        events
    }

    /// Closes the open [`Document`], if any.
    pub fn close(&mut self, at: SystemTime) -> Option<Event<Lifecycle>> {
        self.current
            .take()
            .map(|doc| Event::stamped(Lifecycle::feature_finished(doc), at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::GherkinDocument;

    fn doc(uri: &str) -> Arc<Document> {
        Arc::new(Document::new(GherkinDocument {
            uri: Some(uri.into()),
            ..GherkinDocument::default()
        }))
    }

    fn labels(events: &[Event<Lifecycle>]) -> Vec<&'static str> {
        events.iter().map(|ev| ev.label()).collect()
    }

    #[test]
    fn closes_previous_before_opening_next() {
        let mut cursor = Cursor::default();
        let (a, b) = (doc("a.feature"), doc("b.feature"));

        let first = cursor.enter(&a, SystemTime::UNIX_EPOCH);
        let again = cursor.enter(&a, SystemTime::UNIX_EPOCH);
        let second = cursor.enter(&b, SystemTime::UNIX_EPOCH);

        assert_eq!(labels(&first), ["before-feature"]);
        assert!(again.is_empty());
        assert_eq!(labels(&second), ["after-feature", "before-feature"]);
        assert!(matches!(
            &second[0].value,
            Lifecycle::Feature(d, _) if d.uri == "a.feature",
        ));
        assert_eq!(cursor.current().map(|d| d.uri.as_str()), Some("b.feature"));
    }

    #[test]
    fn re_enters_finished_document() {
        let mut cursor = Cursor::default();
        let (a, b) = (doc("a.feature"), doc("b.feature"));
        drop(cursor.enter(&a, SystemTime::UNIX_EPOCH));
        drop(cursor.enter(&b, SystemTime::UNIX_EPOCH));

        let events = cursor.enter(&a, SystemTime::UNIX_EPOCH);

        assert_eq!(labels(&events), ["after-feature", "before-feature"]);
        assert!(cursor.close(SystemTime::UNIX_EPOCH).is_some());
        assert!(cursor.close(SystemTime::UNIX_EPOCH).is_none());
    }
}
