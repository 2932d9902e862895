// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Indexes of the entities received so far, keyed by their IDs.

use std::{collections::HashMap, sync::Arc};

use derive_more::with_trait::Display;
use linked_hash_map::LinkedHashMap;

use crate::{
    error::CorrelationError,
    event::Document,
    message::{GherkinDocument, Hook, Pickle, TestCase},
};

/// Local ID of a [`Pickle`], uniquely identifying it within a [`Store`].
///
/// Unlike the engine-assigned ID, it's a plain monotonic counter, so it's
/// cheap to use as a map key and stays the same across retries.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScenarioId(pub u64);

/// In-memory arena of correlated entities.
///
/// All lookups return [`Option`] or [`Result`], as envelopes of a streaming
/// protocol may reference IDs the [`Store`] hasn't seen (yet).
#[derive(Debug, Default)]
pub struct Store {
    /// [`Document`]s in the order they were registered, keyed by URI.
    documents: LinkedHashMap<String, Arc<Document>>,

    /// [`Pickle`]s by their [`ScenarioId`].
    scenarios: HashMap<ScenarioId, Arc<Pickle>>,

    /// Engine-assigned [`Pickle`] IDs mapped to [`ScenarioId`]s.
    scenario_ids: HashMap<String, ScenarioId>,

    /// Scenario AST node IDs of [`Pickle`]s.
    ast_roots: HashMap<ScenarioId, String>,

    /// Next [`ScenarioId`] to assign.
    next_scenario: u64,

    /// Every [`TestCase`] ever prepared, retries included.
    test_cases: Vec<Arc<TestCase>>,

    /// [`Hook`]s by their IDs.
    hooks: HashMap<String, Arc<Hook>>,
}

impl Store {
    /// Creates a new empty [`Store`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the given [`GherkinDocument`], replacing a previous one with
    /// the same URI.
    pub fn register_document(&mut self, doc: GherkinDocument) -> Arc<Document> {
        let doc = Arc::new(Document::new(doc));
        drop(self.documents.insert(doc.uri.clone(), Arc::clone(&doc)));
        doc
    }

    /// Returns the number of registered [`Document`]s.
    #[must_use]
    pub fn documents_len(&self) -> usize {
        self.documents.len()
    }

    /// Iterates over the registered [`Document`]s in registration order.
    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    /// Looks up a [`Document`] by its `uri`.
    #[must_use]
    pub fn document(&self, uri: &str) -> Option<&Arc<Document>> {
        self.documents.get(uri)
    }

    /// Discards the [`Document`] with the given `uri`.
    pub fn remove_document(&mut self, uri: &str) -> Option<Arc<Document>> {
        self.documents.remove(uri)
    }

    /// Registers the given [`Pickle`], assigning it the next [`ScenarioId`].
    ///
    /// Registering an already known [`Pickle`] replaces it, but keeps its
    /// [`ScenarioId`].
    pub fn register_scenario(&mut self, pickle: Pickle) -> ScenarioId {
        let id = *self.scenario_ids.entry(pickle.id.clone()).or_insert_with(|| {
            let id = ScenarioId(self.next_scenario);
            self.next_scenario += 1;
            id
        });
        if let Some(root) = pickle.ast_root() {
            drop(self.ast_roots.insert(id, root.to_owned()));
        }
        drop(self.scenarios.insert(id, Arc::new(pickle)));
        id
    }

    /// Looks up a [`Pickle`] by its [`ScenarioId`].
    #[must_use]
    pub fn scenario(&self, id: ScenarioId) -> Option<&Arc<Pickle>> {
        self.scenarios.get(&id)
    }

    /// Resolves an engine-assigned [`Pickle`] ID into a [`ScenarioId`].
    #[must_use]
    pub fn scenario_id(&self, pickle_id: &str) -> Option<ScenarioId> {
        self.scenario_ids.get(pickle_id).copied()
    }

    /// Returns the scenario AST node ID of the [`Pickle`].
    #[must_use]
    pub fn ast_root(&self, id: ScenarioId) -> Option<&str> {
        self.ast_roots.get(&id).map(String::as_str)
    }

    /// Discards the [`Pickle`] with the given [`ScenarioId`].
    pub fn remove_scenario(&mut self, id: ScenarioId) -> Option<Arc<Pickle>> {
        drop(self.ast_roots.remove(&id));
        let pickle = self.scenarios.remove(&id)?;
        _ = self.scenario_ids.remove(&pickle.id);
        Some(pickle)
    }

    /// Registers the given [`TestCase`].
    ///
    /// Retries append a new [`TestCase`] instead of replacing the previous
    /// one, so the history is preserved.
    pub fn register_test_case(&mut self, test_case: TestCase) -> Arc<TestCase> {
        let test_case = Arc::new(test_case);
        self.test_cases.push(Arc::clone(&test_case));
        test_case
    }

    /// Looks up the latest [`TestCase`] with the given `id`.
    #[must_use]
    pub fn test_case(&self, id: &str) -> Option<&Arc<TestCase>> {
        self.test_cases.iter().rev().find(|tc| tc.id == id)
    }

    /// Iterates over all the [`TestCase`]s prepared for the given `pickle_id`,
    /// oldest first.
    pub fn test_case_history<'s>(
        &'s self,
        pickle_id: &'s str,
    ) -> impl Iterator<Item = &'s Arc<TestCase>> + 's {
        self.test_cases.iter().filter(move |tc| tc.pickle_id == pickle_id)
    }

    /// Registers the given [`Hook`].
    pub fn register_hook(&mut self, hook: Hook) -> Arc<Hook> {
        let hook = Arc::new(hook);
        drop(self.hooks.insert(hook.id.clone(), Arc::clone(&hook)));
        hook
    }

    /// Looks up a [`Hook`] by its `id`.
    #[must_use]
    pub fn hook(&self, id: &str) -> Option<&Arc<Hook>> {
        self.hooks.get(id)
    }

    /// Resolves the [`Pickle`] planned by the [`TestCase`] with the given
    /// `test_case_id`.
    ///
    /// # Errors
    ///
    /// If either the [`TestCase`] or its [`Pickle`] is unknown.
    pub fn find_scenario_for_test_case(
        &self,
        test_case_id: &str,
    ) -> Result<(ScenarioId, &Arc<Pickle>), CorrelationError> {
        let tc = self.test_case(test_case_id).ok_or_else(|| {
            CorrelationError::UnknownTestCase { id: test_case_id.to_owned() }
        })?;
        let unknown_pickle =
            || CorrelationError::UnknownPickle { id: tc.pickle_id.clone() };
        let id = self.scenario_id(&tc.pickle_id).ok_or_else(unknown_pickle)?;
        let pickle = self.scenario(id).ok_or_else(unknown_pickle)?;
        Ok((id, pickle))
    }

    /// Resolves the [`Document`] the given [`Pickle`] was compiled from.
    ///
    /// # Errors
    ///
    /// If no [`Document`] with the [`Pickle::uri`] is registered.
    pub fn find_document_for_scenario(
        &self,
        pickle: &Pickle,
    ) -> Result<&Arc<Document>, CorrelationError> {
        self.document(&pickle.uri).ok_or_else(|| {
            CorrelationError::UnknownDocument { uri: pickle.uri.clone() }
        })
    }
}
