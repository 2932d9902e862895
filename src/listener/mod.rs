// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! State machine translating [`Envelope`]s into [`Lifecycle`] events.

mod cursor;
pub mod reconcile;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, SystemTime},
};

use crate::{
    error::CorrelationError,
    event::{
        self, Document, Event, Lifecycle, ScenarioStep, StepResult, resolved,
    },
    message::{
        Envelope, TestCase, TestCaseFinished, TestCaseStarted,
        TestRunFinished, TestRunStarted, TestStepFinished, TestStepStarted,
        Timestamp,
    },
    store::Store,
};

pub use self::cursor::Cursor;

/// Stage of an execution, as seen by a [`Listener`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RunState {
    /// Nothing received yet.
    #[default]
    Idle,

    /// Documents are being parsed, execution didn't start yet.
    DocumentsLoading,

    /// Execution is in progress.
    RunStarted,

    /// Execution finished (or was aborted), nothing is emitted anymore.
    RunFinished,
}

/// Currently open attempt of a scenario.
#[derive(Debug)]
struct Attempt {
    /// ID of the `testCaseStarted` envelope opening this attempt.
    id: String,

    /// [`Document`] the scenario belongs to.
    document: Arc<Document>,

    /// Resolved scenario.
    scenario: Arc<resolved::Scenario>,

    /// Results of the finished steps along with their test step IDs, in
    /// order.
    results: Vec<(String, StepResult)>,

    /// Started step whose finish wasn't received yet.
    open_step: Option<Arc<ScenarioStep>>,

    /// Started unnamed hook, whose events are held back until its outcome is
    /// known.
    held: Option<(Arc<ScenarioStep>, SystemTime)>,
}

/// Stateful correlator of an [`Envelope`] stream.
///
/// Consumes [`Envelope`]s strictly in arrival order and emits fully resolved
/// [`Lifecycle`] events, properly nested: a [`Feature`] bracket encloses
/// [`Scenario`] brackets, which enclose [`Step`] brackets.
///
/// Envelopes referencing unknown IDs are logged and dropped, never failing
/// the whole stream.
///
/// [`Feature`]: event::Feature
/// [`Scenario`]: event::Scenario
/// [`Step`]: event::Step
#[derive(Debug, Default)]
pub struct Listener {
    /// Correlation indexes.
    store: Store,

    /// Current [`RunState`].
    state: RunState,

    /// Whether more than one document takes part in the execution.
    grouping: bool,

    /// [`Feature`] bracketing.
    ///
    /// [`Feature`]: event::Feature
    cursor: Cursor,

    /// Reconciled entries of prepared test cases, by test case ID.
    plans: HashMap<String, Vec<ScenarioStep>>,

    /// Currently open attempt.
    current: Option<Attempt>,

    /// IDs of the attempts dropped due to correlation misses.
    dropped: HashSet<String>,

    /// Time of the latest received engine timestamp.
    last_seen: Option<SystemTime>,
}

impl Listener {
    /// Creates a new [`Listener`] waiting for the first envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current [`RunState`].
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Indicates whether more than one document takes part in the execution.
    ///
    /// Decided once the `testRunStarted` envelope is received.
    #[must_use]
    pub const fn is_grouping(&self) -> bool {
        self.grouping
    }

    /// Returns the correlation [`Store`].
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Consumes the given [`Envelope`], returning the [`Lifecycle`] events it
    /// causes, in order.
    pub fn handle(&mut self, envelope: Envelope) -> Vec<Event<Lifecycle>> {
        if self.state == RunState::RunFinished {
            tracing::debug!(
                kind = envelope.kind(),
                "run already finished, ignoring envelope",
            );
            return vec![];
        }

        match envelope {
            Envelope::GherkinDocument(doc) => {
                let doc = self.store.register_document(doc);
                tracing::debug!(uri = %doc.uri, "document registered");
                if self.state == RunState::Idle {
                    self.state = RunState::DocumentsLoading;
                }
                vec![]
            }
            Envelope::Pickle(pickle) => {
                let id = self.store.register_scenario(pickle);
                tracing::debug!(scenario = %id, "pickle registered");
                vec![]
            }
            Envelope::Hook(hook) => {
                drop(self.store.register_hook(hook));
                vec![]
            }
            Envelope::TestRunStarted(ev) => self.run_started(&ev),
            Envelope::TestCase(tc) => {
                self.prepare(tc);
                vec![]
            }
            Envelope::TestCaseStarted(ev) => self.case_started(ev),
            Envelope::TestStepStarted(ev) => self.step_started(&ev),
            Envelope::TestStepFinished(ev) => self.step_finished(ev),
            Envelope::TestCaseFinished(ev) => self.case_finished(&ev),
            Envelope::TestRunFinished(ev) => self.run_finished(&ev),
        }
    }

    /// Aborts the execution, closing every open bracket with a
    /// [`Status::Failed`] outcome carrying the given `reason`.
    ///
    /// Nothing is emitted afterwards.
    ///
    /// [`Status::Failed`]: crate::message::Status::Failed
    pub fn abort(&mut self, reason: &str) -> Vec<Event<Lifecycle>> {
        if self.state == RunState::RunFinished {
            return vec![];
        }
        tracing::debug!(reason, "aborting run");

        let at = self.now(None);
        let mut events = vec![];
        if let Some(mut attempt) = self.current.take() {
            let failure = StepResult::failed(reason, Duration::ZERO);
            if let Some(step) = attempt.open_step.take() {
                let id = step.test_step_id().to_owned();
                attempt.results.push((id, failure.clone()));
                let finished = event::Step::Finished(failure.clone());
                events.push(attempt.step_event(step, finished, at));
            }
            let result = StepResult::select(attempt.results())
                .filter(|r| r.is_failure())
                .cloned()
                .unwrap_or(failure);
            events.push(attempt.event(event::Scenario::Finished(result), at));
        }
        events.extend(self.cursor.close(at));
        events.push(Event::stamped(Lifecycle::Finished { success: false }, at));
        self.plans.clear();
        self.state = RunState::RunFinished;
        events
    }

    /// Replaces the recorded outcome of the given test step of the open
    /// attempt, so the outcome of the whole scenario is selected out of the
    /// replaced one.
    ///
    /// Returns `false` if the open attempt hasn't recorded such a step.
    pub fn amend_step_result(
        &mut self,
        test_step_id: &str,
        result: StepResult,
    ) -> bool {
        let recorded = self.current.as_mut().and_then(|a| {
            a.results.iter_mut().rev().find(|(id, _)| id == test_step_id)
        });
        let Some((_, slot)) = recorded else {
            return false;
        };
        *slot = result;
        true
    }

    /// Converts the given engine timestamp into a [`SystemTime`], falling back
    /// to the latest seen one (or now) if absent.
    fn now(&mut self, ts: Option<Timestamp>) -> SystemTime {
        let at = ts
            .map(Timestamp::to_system_time)
            .or(self.last_seen)
            .unwrap_or_else(SystemTime::now);
        self.last_seen = Some(at);
        at
    }

    fn run_started(&mut self, ev: &TestRunStarted) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        self.state = RunState::RunStarted;
        self.grouping = self.store.documents_len() > 1;
        tracing::debug!(
            documents = self.store.documents_len(),
            grouping = self.grouping,
            "run started",
        );

        let mut events = vec![Event::stamped(Lifecycle::Started, at)];
        if !self.grouping {
            if let Some(doc) = self.store.documents().next().cloned() {
                events.extend(self.cursor.enter(&doc, at));
            }
        }
        events
    }

    fn prepare(&mut self, tc: TestCase) {
        let tc = self.store.register_test_case(tc);
        let plan = self
            .store
            .find_scenario_for_test_case(&tc.id)
            .and_then(|(_, pickle)| {
                reconcile::reconcile(&tc, pickle, &self.store)
            });
        match plan {
            Ok(steps) => {
                tracing::debug!(
                    test_case_id = %tc.id,
                    hooks = steps.iter().filter(|s| s.is_hook()).count(),
                    "test case prepared",
                );
                drop(self.plans.insert(tc.id.clone(), steps));
            }
            Err(e) => {
                tracing::warn!(
                    test_case_id = %tc.id,
                    error = %e,
                    "cannot reconcile test case, dropping it",
                );
            }
        }
    }

    fn case_started(&mut self, ev: TestCaseStarted) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        let mut events = vec![];

        if let Some(prev) = self.current.take() {
            tracing::warn!(
                previous = %prev.id,
                next = %ev.id,
                "attempt started before the previous one finished",
            );
            events.extend(prev.close(at));
        }

        let resolved =
            self.resolve_attempt(&ev).map(|(doc, sc)| (doc, Arc::new(sc)));
        let (document, scenario) = match resolved {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    attempt = %ev.id,
                    test_case_id = %ev.test_case_id,
                    error = %e,
                    "cannot correlate attempt, dropping it",
                );
                _ = self.dropped.insert(ev.id);
                return events;
            }
        };

        events.extend(self.cursor.enter(&document, at));
        let attempt = Attempt {
            id: ev.id,
            document,
            scenario,
            results: vec![],
            open_step: None,
            held: None,
        };
        events.push(attempt.event(event::Scenario::Started, at));
        self.current = Some(attempt);
        events
    }

    fn resolve_attempt(
        &self,
        ev: &TestCaseStarted,
    ) -> Result<(Arc<Document>, resolved::Scenario), CorrelationError> {
        let plan = self.plans.get(&ev.test_case_id).ok_or_else(|| {
            CorrelationError::UnknownTestCase { id: ev.test_case_id.clone() }
        })?;
        let (id, pickle) =
            self.store.find_scenario_for_test_case(&ev.test_case_id)?;
        let doc = self.store.find_document_for_scenario(pickle)?;

        let scenario = resolved::Scenario {
            id,
            pickle_id: pickle.id.clone(),
            test_case_id: ev.test_case_id.clone(),
            attempt: ev.attempt,
            uri: pickle.uri.clone(),
            name: pickle.name.clone(),
            tags: pickle.tags.iter().map(|t| t.name.clone()).collect(),
            rule: reconcile::rule_name(doc, pickle.ast_root()),
            ast_node_ids: pickle.ast_node_ids.clone(),
            steps: reconcile::decorate(plan.clone(), doc),
        };
        Ok((Arc::clone(doc), scenario))
    }

    /// Returns the current [`Attempt`] if it's the one with the given `id`.
    fn attempt(&mut self, id: &str) -> Option<&mut Attempt> {
        match self.current.as_mut() {
            Some(a) if a.id == id => Some(a),
            _ => {
                if self.dropped.contains(id) {
                    tracing::debug!(attempt = %id, "ignoring dropped attempt");
                } else {
                    let e =
                        CorrelationError::UnknownAttempt { id: id.to_owned() };
                    tracing::warn!(error = %e, "dropping envelope");
                }
                None
            }
        }
    }

    fn step_started(&mut self, ev: &TestStepStarted) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        let Some(attempt) = self.attempt(&ev.test_case_started_id) else {
            return vec![];
        };
        let Some(step) = attempt.step(&ev.test_step_id) else {
            return vec![];
        };

        if matches!(&*step, ScenarioStep::Hook(h) if h.name.is_none()) {
            attempt.held = Some((step, at));
            return vec![];
        }
        if let Some(open) = attempt.open_step.replace(Arc::clone(&step)) {
            tracing::warn!(
                test_step_id = %open.test_step_id(),
                "step started before the previous one finished",
            );
        }
        vec![attempt.step_event(step, event::Step::Started, at)]
    }

    fn step_finished(&mut self, ev: TestStepFinished) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        let Some(attempt) = self.attempt(&ev.test_case_started_id) else {
            return vec![];
        };
        let Some(step) = attempt.step(&ev.test_step_id) else {
            return vec![];
        };
        let result = StepResult::from(ev.test_step_result);
        attempt
            .results
            .push((step.test_step_id().to_owned(), result.clone()));

        let held = attempt
            .held
            .take_if(|(h, _)| h.test_step_id() == step.test_step_id());
        if let Some((hook, started_at)) = held {
            if !result.is_failure() {
                tracing::debug!(
                    test_step_id = %hook.test_step_id(),
                    "omitting successful unnamed hook",
                );
                return vec![];
            }
            return vec![
                attempt.step_event(
                    Arc::clone(&hook),
                    event::Step::Started,
                    started_at,
                ),
                attempt.step_event(hook, event::Step::Finished(result), at),
            ];
        }

        if attempt
            .open_step
            .as_ref()
            .is_some_and(|s| s.test_step_id() == step.test_step_id())
        {
            attempt.open_step = None;
        }
        vec![attempt.step_event(step, event::Step::Finished(result), at)]
    }

    fn case_finished(
        &mut self,
        ev: &TestCaseFinished,
    ) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        if self.dropped.remove(&ev.test_case_started_id) {
            tracing::debug!(
                attempt = %ev.test_case_started_id,
                "dropped attempt finished",
            );
            return vec![];
        }
        if self.attempt(&ev.test_case_started_id).is_none() {
            return vec![];
        }
        let Some(mut attempt) = self.current.take() else {
            return vec![];
        };

        if ev.will_be_retried {
            tracing::debug!(
                attempt = %attempt.id,
                scenario = %attempt.scenario.id,
                "attempt will be retried, superseding its results",
            );
            let mut events = attempt.close_open_step(at);
            events.push(attempt.event(event::Scenario::Retried, at));
            return events;
        }

        drop(self.plans.remove(&attempt.scenario.test_case_id));
        let scenario = attempt.scenario.id;
        let events = attempt.close(at);
        if !self.grouping {
            drop(self.store.remove_scenario(scenario));
        }
        events
    }

    fn run_finished(&mut self, ev: &TestRunFinished) -> Vec<Event<Lifecycle>> {
        let at = self.now(ev.timestamp);
        let mut events = vec![];
        if let Some(attempt) = self.current.take() {
            tracing::warn!(
                attempt = %attempt.id,
                "run finished before the attempt did",
            );
            events.extend(attempt.close(at));
        }
        if let Some(closed) = self.cursor.close(at) {
            if let Lifecycle::Feature(doc, _) = &closed.value {
                if !self.grouping {
                    drop(self.store.remove_document(&doc.uri));
                }
            }
            events.push(closed);
        }
        events.push(Event::stamped(
            Lifecycle::Finished { success: ev.success.unwrap_or(true) },
            at,
        ));
        self.plans.clear();
        self.state = RunState::RunFinished;
        tracing::debug!("run finished");
        events
    }
}

impl Attempt {
    /// Looks up an entry of this attempt by its test step ID.
    fn step(&self, test_step_id: &str) -> Option<Arc<ScenarioStep>> {
        let step = self.scenario.step(test_step_id).cloned();
        if step.is_none() {
            let e = CorrelationError::UnknownTestStep {
                test_case_id: self.scenario.test_case_id.clone(),
                id: test_step_id.to_owned(),
            };
            tracing::warn!(error = %e, "dropping envelope");
        }
        step
    }

    fn results(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().map(|(_, r)| r)
    }

    fn event(&self, ev: event::Scenario, at: SystemTime) -> Event<Lifecycle> {
        Event::stamped(
            Lifecycle::scenario(
                Arc::clone(&self.document),
                Arc::clone(&self.scenario),
                ev,
            ),
            at,
        )
    }

    fn step_event(
        &self,
        step: Arc<ScenarioStep>,
        ev: event::Step,
        at: SystemTime,
    ) -> Event<Lifecycle> {
        self.event(event::Scenario::Step(step, ev), at)
    }

    /// Closes the step left open, if any, with an unknown outcome.
    fn close_open_step(&mut self, at: SystemTime) -> Vec<Event<Lifecycle>> {
        self.held = None;
        let Some(step) = self.open_step.take() else {
            return vec![];
        };
        tracing::warn!(
            test_step_id = %step.test_step_id(),
            "attempt finished before its step did",
        );
        let result = StepResult {
            status: crate::message::Status::Unknown,
            message: None,
            duration: Duration::ZERO,
        };
        vec![self.step_event(step, event::Step::Finished(result), at)]
    }

    /// Closes this attempt with the outcome selected out of its results.
    fn close(mut self, at: SystemTime) -> Vec<Event<Lifecycle>> {
        let mut events = self.close_open_step(at);
        let result = StepResult::select(self.results())
            .cloned()
            .unwrap_or_else(|| StepResult::passed(Duration::ZERO));
        events.push(self.event(event::Scenario::Finished(result), at));
        events
    }
}
