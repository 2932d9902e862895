// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Translation of [`Lifecycle`] events into reporting [`Message`]s.

mod stats;
pub mod status;
pub mod title;
pub mod trace;

use std::time::SystemTime;

use crate::{
    config::Config,
    event::{
        self, Document, Event, HookRef, Lifecycle, ScenarioStep, StepRef,
        StepResult, resolved::Scenario,
    },
    hooks::HookFailure,
    message::Status,
    report::{ErrorPayload, Kind, Message, Payload, State},
};

pub use self::stats::Stats;

/// Currently open scenario attempt.
///
/// Everything reported for an attempt is buffered until it's known whether
/// the attempt is final or will be retried.
#[derive(Debug)]
struct Attempt {
    /// Time the attempt started at.
    started_at: SystemTime,

    /// Messages to emit once the attempt is final.
    buffer: Vec<Message>,

    /// Failures recorded for the attempt.
    failures: usize,

    /// [`Stats`] of the attempt.
    stats: Stats,
}

/// Translator of [`Lifecycle`] events into reporting [`Message`]s.
///
/// Also keeps the failure counter, being the source of truth for the run
/// verdict when undefined steps are ignored.
#[derive(Debug, Default)]
pub struct Formatter {
    /// Reporting options.
    config: Config,

    /// Time the currently open feature started at.
    feature_started: Option<SystemTime>,

    /// Currently open scenario attempt.
    attempt: Option<Attempt>,

    /// Committed failures.
    failures: usize,

    /// Committed [`Stats`].
    stats: Stats,
}

impl Formatter {
    /// Creates a new [`Formatter`] with the given [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, ..Self::default() }
    }

    /// Returns the number of failures recorded so far.
    ///
    /// Failures of attempts still open or retried are not included.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.failures
    }

    /// Returns the [`Stats`] collected so far.
    #[must_use]
    pub const fn stats(&self) -> Stats {
        self.stats
    }

    /// Translates the given [`Lifecycle`] event, returning [`Message`]s ready
    /// to be emitted.
    ///
    /// Messages of a scenario attempt are held back until it finishes, and
    /// dropped altogether if it's retried.
    pub fn handle(&mut self, ev: &Event<Lifecycle>) -> Vec<Message> {
        let at = ev.at;
        let Lifecycle::Feature(doc, ev) = &ev.value else {
            return vec![];
        };
        match ev {
            event::Feature::Started => {
                self.feature_started = Some(at);
                vec![Message::SuiteStart(self.feature_payload(doc))]
            }
            event::Feature::Finished => {
                let started = self.feature_started.take().unwrap_or(at);
                let duration = at.duration_since(started).unwrap_or_default();
                let payload = self.feature_payload(doc).with_duration(duration);
                vec![Message::SuiteEnd(payload)]
            }
            event::Feature::Scenario(sc, ev) => self.scenario(doc, sc, ev, at),
        }
    }

    /// Records the given failure of a user hook, returning [`Message`]s ready
    /// to be emitted.
    ///
    /// Failures of scenario and step hooks follow the fate of the open
    /// attempt.
    pub fn record_hook_failure(
        &mut self,
        failure: &HookFailure,
    ) -> Vec<Message> {
        let doc = &failure.document;
        let (parent, full) = match &failure.scenario {
            Some(sc) => {
                let p = self.scenario_payload(doc, sc);
                (p.uid, p.full_title)
            }
            None => {
                let p = self.feature_payload(doc);
                (p.uid, p.full_title)
            }
        };
        let uid = match &failure.step {
            Some(st) => format!("{}:{}", st.test_step_id(), failure.kind),
            None => format!("{parent}:{}", failure.kind),
        };
        let title = failure.title();
        let stack = failure.message.clone();
        let msg = Message::HookEnd(
            Payload {
                uid,
                full_title: title::full_title(&full, &title),
                title,
                parent: Some(parent),
                kind: Kind::Hook,
                file: doc.uri.clone(),
                tags: vec![],
                ..Payload::default()
            }
            .with_duration(failure.duration)
            .with_error(Some(ErrorPayload {
                message: stack.lines().next().unwrap_or_default().to_owned(),
                stack,
            })),
        );

        match self.attempt.as_mut() {
            Some(attempt) if failure.scenario.is_some() => {
                attempt.failures += 1;
                attempt.buffer.push(msg);
                vec![]
            }
            _ => {
                self.failures += 1;
                vec![msg]
            }
        }
    }

    fn scenario(
        &mut self,
        doc: &Document,
        sc: &Scenario,
        ev: &event::Scenario,
        at: SystemTime,
    ) -> Vec<Message> {
        let scenario_level = self.config.scenario_level_reporter;

        if matches!(ev, event::Scenario::Started) {
            self.start_attempt(doc, sc, at);
            return vec![];
        }

        let Some(mut attempt) = self.attempt.take() else {
            tracing::debug!(
                scenario = %sc.id,
                "no open scenario, ignoring event",
            );
            return vec![];
        };
        match ev {
            event::Scenario::Started => {
                self.attempt = Some(attempt);
                vec![]
            }
            event::Scenario::Step(step, ev) => {
                if !scenario_level {
                    self.step(doc, sc, step, ev, &mut attempt);
                }
                self.attempt = Some(attempt);
                vec![]
            }
            event::Scenario::Retried => {
                tracing::debug!(
                    scenario = %sc.id,
                    attempt = sc.attempt,
                    discarded = attempt.buffer.len(),
                    "discarding retried attempt",
                );
                self.stats.retried += 1;
                vec![]
            }
            event::Scenario::Finished(result) => {
                let duration = at
                    .duration_since(attempt.started_at)
                    .unwrap_or_default();
                let payload =
                    self.scenario_payload(doc, sc).with_duration(duration);
                if scenario_level {
                    let config = &self.config;
                    let verdict = status::classify(result, config, |hint| {
                        let message = format!(
                            "Scenario {} has undefined steps. {hint}",
                            payload.title,
                        );
                        let stack = format!(
                            "{message}\n{}",
                            trace::scenario_trace(doc, sc),
                        );
                        ErrorPayload { message, stack }
                    });
                    attempt.failures += usize::from(verdict.failure);
                    attempt.stats.record(verdict.state);
                    attempt.buffer.push(Message::test_end(
                        verdict.state,
                        payload.with_error(verdict.error),
                    ));
                } else {
                    attempt.buffer.push(Message::SuiteEnd(payload));
                }
                self.failures += attempt.failures;
                self.stats += attempt.stats;
                attempt.buffer
            }
        }
    }

    fn start_attempt(&mut self, doc: &Document, sc: &Scenario, at: SystemTime) {
        if self.attempt.is_some() {
            tracing::warn!(
                scenario = %sc.id,
                "scenario started before the previous one finished",
            );
        }
        let payload = self.scenario_payload(doc, sc);
        let first = if self.config.scenario_level_reporter {
            Message::TestStart(payload)
        } else {
            Message::SuiteStart(payload)
        };
        self.attempt = Some(Attempt {
            started_at: at,
            buffer: vec![first],
            failures: 0,
            stats: Stats::new(),
        });
    }

    fn step(
        &self,
        doc: &Document,
        sc: &Scenario,
        step: &ScenarioStep,
        ev: &event::Step,
        attempt: &mut Attempt,
    ) {
        match (step, ev) {
            (ScenarioStep::Step(st), event::Step::Started) => {
                let payload = self.step_payload(doc, sc, st);
                attempt.buffer.push(Message::TestStart(payload));
            }
            (ScenarioStep::Step(st), event::Step::Finished(result)) => {
                let payload = self.step_payload(doc, sc, st);
                let verdict = status::classify(result, &self.config, |hint| {
                    let message = format!(
                        "Step \"{}\" is not defined. {hint}",
                        payload.title,
                    );
                    let stack = format!(
                        "{message}\n{}",
                        trace::step_trace(doc, sc, st),
                    );
                    ErrorPayload { message, stack }
                });
                let payload = if verdict.ignored_undefined {
                    Payload {
                        title: format!(
                            "{}{}",
                            payload.title,
                            title::UNDEFINED_SUFFIX,
                        ),
                        full_title: format!(
                            "{}{}",
                            payload.full_title,
                            title::UNDEFINED_SUFFIX,
                        ),
                        ..payload
                    }
                } else {
                    payload
                };
                attempt.failures += usize::from(verdict.failure);
                attempt.stats.record(verdict.state);
                attempt.buffer.push(Message::test_end(
                    verdict.state,
                    payload
                        .with_duration(result.duration)
                        .with_error(verdict.error),
                ));
            }
            (ScenarioStep::Hook(_), event::Step::Started) => {}
            (ScenarioStep::Hook(hook), event::Step::Finished(result)) => {
                let error =
                    result.is_failure().then(|| status::error_of(result));
                attempt.failures +=
                    usize::from(result.status == Status::Failed);
                attempt.buffer.push(Message::HookEnd(
                    self.hook_payload(doc, sc, hook, result)
                        .with_error(error),
                ));
            }
        }
    }

    fn feature_payload(&self, doc: &Document) -> Payload {
        let title = title::feature_title(doc, &self.config);
        Payload {
            uid: title::feature_uid(doc),
            full_title: title.clone(),
            title,
            parent: None,
            kind: Kind::Feature,
            file: doc.uri.clone(),
            tags: doc.tags().map(ToOwned::to_owned).collect(),
            ..Payload::default()
        }
    }

    fn scenario_payload(&self, doc: &Document, sc: &Scenario) -> Payload {
        let parent = self.feature_payload(doc);
        let title = title::scenario_title(doc, sc, &self.config);
        Payload {
            uid: sc.pickle_id.clone(),
            full_title: title::full_title(&parent.full_title, &title),
            title,
            parent: Some(parent.uid),
            kind: Kind::Scenario,
            file: sc.uri.clone(),
            tags: sc.tags.clone(),
            ..Payload::default()
        }
    }

    fn step_payload(
        &self,
        doc: &Document,
        sc: &Scenario,
        st: &StepRef,
    ) -> Payload {
        let parent = self.scenario_payload(doc, sc);
        let title = st.title();
        Payload {
            uid: st.id.clone(),
            full_title: title::full_title(&parent.full_title, &title),
            title,
            parent: Some(parent.uid),
            kind: Kind::Step,
            file: sc.uri.clone(),
            tags: sc.tags.clone(),
            ..Payload::default()
        }
    }

    fn hook_payload(
        &self,
        doc: &Document,
        sc: &Scenario,
        hook: &HookRef,
        result: &StepResult,
    ) -> Payload {
        let parent = self.scenario_payload(doc, sc);
        let title = hook.title();
        let state = if result.is_failure() { State::Fail } else { State::Pass };
        Payload {
            uid: hook.test_step_id.clone(),
            full_title: title::full_title(&parent.full_title, &title),
            title,
            parent: Some(parent.uid),
            kind: Kind::Hook,
            file: hook.source_uri.clone().unwrap_or_else(|| sc.uri.clone()),
            tags: vec![],
            state: Some(state),
            ..Payload::default()
        }
        .with_duration(result.duration)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;

    use super::*;
    use crate::{
        hooks::HookKind,
        message::{GherkinDocument, HookType},
        store::ScenarioId,
    };

    fn doc() -> Arc<Document> {
        Arc::new(Document::new(
            serde_json::from_value::<GherkinDocument>(json!({
                "uri": "features/login.feature",
                "feature": {
                    "location": {"line": 1, "column": 1},
                    "name": "Login",
                    "children": [{"scenario": {
                        "id": "sc",
                        "location": {"line": 3, "column": 3},
                        "name": "Plain",
                        "steps": [
                            {"id": "st-1", "location": {"line": 4, "column": 5}, "keyword": "Given ", "text": "one"},
                            {"id": "st-2", "location": {"line": 5, "column": 5}, "keyword": "Then ", "text": "two"}
                        ]
                    }}]
                }
            }))
            .unwrap(),
        ))
    }

    fn step(n: u8) -> ScenarioStep {
        ScenarioStep::Step(StepRef {
            id: format!("ps-{n}"),
            test_step_id: format!("ts-{n}"),
            keyword: if n == 1 { "Given" } else { "Then" }.into(),
            text: if n == 1 { "one" } else { "two" }.into(),
            ast_node_ids: vec![format!("st-{n}")],
        })
    }

    fn hook() -> ScenarioStep {
        ScenarioStep::Hook(HookRef {
            test_step_id: "th".into(),
            hook_id: "h".into(),
            name: Some("open browser".into()),
            kind: Some(HookType::BeforeTestCase),
            source_uri: Some("support/hooks.js".into()),
            location: None,
        })
    }

    fn scenario() -> Arc<Scenario> {
        Arc::new(Scenario {
            id: ScenarioId(0),
            pickle_id: "p".into(),
            test_case_id: "tc".into(),
            attempt: 0,
            uri: "features/login.feature".into(),
            name: "Plain".into(),
            tags: vec!["@smoke".into()],
            rule: None,
            ast_node_ids: vec!["sc".into()],
            steps: [hook(), step(1), step(2)].into_iter().map(Arc::new).collect(),
        })
    }

    fn result(status: Status) -> StepResult {
        StepResult {
            status,
            message: (status == Status::Failed).then(|| "boom\n  at x".into()),
            duration: Duration::from_millis(5),
        }
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Feeds a whole scenario attempt through the given [`Formatter`].
    fn attempt(
        f: &mut Formatter,
        statuses: [Status; 2],
        closing: event::Scenario,
    ) -> Vec<Message> {
        let (doc, sc) = (doc(), scenario());
        let mut events = vec![Lifecycle::scenario(
            Arc::clone(&doc),
            Arc::clone(&sc),
            event::Scenario::Started,
        )];
        for (i, status) in statuses.into_iter().enumerate() {
            let st = Arc::clone(&sc.steps[i + 1]);
            events.push(Lifecycle::step(
                Arc::clone(&doc),
                Arc::clone(&sc),
                Arc::clone(&st),
                event::Step::Started,
            ));
            events.push(Lifecycle::step(
                Arc::clone(&doc),
                Arc::clone(&sc),
                st,
                event::Step::Finished(result(status)),
            ));
        }
        events.push(Lifecycle::scenario(doc, sc, closing));

        events
            .into_iter()
            .enumerate()
            .flat_map(|(i, ev)| f.handle(&Event::stamped(ev, at(i as u64))))
            .collect()
    }

    fn names(msgs: &[Message]) -> Vec<&'static str> {
        msgs.iter().map(Message::name).collect()
    }

    fn finished(status: Status) -> event::Scenario {
        event::Scenario::Finished(result(status))
    }

    #[test]
    fn reports_feature_brackets_with_duration() {
        let mut f = Formatter::new(Config::default());

        let start = f.handle(&Event::stamped(Lifecycle::feature_started(doc()), at(1)));
        let end = f.handle(&Event::stamped(Lifecycle::feature_finished(doc()), at(4)));

        assert_eq!(names(&start), ["suite:start"]);
        assert_eq!(start[0].payload().uid, "login.feature:1:1");
        assert_eq!(start[0].payload().parent, None);
        assert_eq!(end[0].payload().duration, Some(3000));
    }

    #[test]
    fn buffers_attempt_until_finished() {
        let mut f = Formatter::new(Config::default());

        let msgs = attempt(&mut f, [Status::Passed, Status::Passed], finished(Status::Passed));

        assert_eq!(
            names(&msgs),
            ["suite:start", "test:start", "test:pass", "test:start", "test:pass", "suite:end"],
        );
        assert_eq!(msgs[5].payload().duration, Some(5000));
        assert_eq!(f.stats().passed, 2);
        assert_eq!(f.failures(), 0);
    }

    #[test]
    fn children_reference_parent_uids() {
        let mut f = Formatter::new(Config::default());
        let feature = f.handle(&Event::stamped(Lifecycle::feature_started(doc()), at(0)));

        let msgs = attempt(&mut f, [Status::Passed, Status::Failed], finished(Status::Failed));

        let scenario_uid = &msgs[0].payload().uid;
        assert_eq!(msgs[0].payload().parent.as_ref(), Some(&feature[0].payload().uid));
        assert!(msgs[1..5].iter().all(|m| m.payload().parent.as_ref() == Some(scenario_uid)));
        assert_eq!(msgs[1].payload().full_title, "Login: Plain: Given one");
    }

    #[test]
    fn discards_retried_attempt() {
        let mut f = Formatter::new(Config::default());

        let msgs = attempt(&mut f, [Status::Failed, Status::Skipped], event::Scenario::Retried);

        assert!(msgs.is_empty());
        assert_eq!(f.failures(), 0);
        assert_eq!(f.stats().retried, 1);
        assert_eq!(f.stats().total(), 0);
    }

    #[test]
    fn counts_failing_step_once() {
        let mut f = Formatter::new(Config::default());

        let msgs = attempt(&mut f, [Status::Passed, Status::Failed], finished(Status::Failed));

        assert_eq!(f.failures(), 1);
        let fail = &msgs[4];
        assert_eq!(fail.name(), "test:fail");
        assert_eq!(
            fail.payload().error,
            Some(ErrorPayload { message: "boom".into(), stack: "boom\n  at x".into() }),
        );
    }

    #[test]
    fn undefined_steps_fail_with_source_trace() {
        let mut f = Formatter::new(Config::default());

        let msgs = attempt(&mut f, [Status::Undefined, Status::Skipped], finished(Status::Undefined));

        assert_eq!(f.failures(), 1);
        let fail = &msgs[2];
        assert_eq!(fail.name(), "test:fail");
        assert_eq!(fail.payload().title, "Given one");
        let err = fail.payload().error.as_ref().unwrap();
        assert_eq!(
            err.message,
            "Step \"Given one\" is not defined. You can ignore this error by \
             setting ignoreUndefinedDefinitions as true.",
        );
        assert!(err.stack.ends_with(
            "\tat Feature(features/login.feature):1:1\n\
             \tat Scenario(Plain):3:3\n\
             \tat Step(one):4:5\n",
        ));
    }

    #[test]
    fn ignored_undefined_steps_are_pending_with_suffix() {
        let mut f = Formatter::new(Config {
            ignore_undefined_definitions: true,
            ..Config::default()
        });

        let msgs = attempt(&mut f, [Status::Undefined, Status::Skipped], finished(Status::Undefined));

        assert_eq!(f.failures(), 0);
        assert_eq!(msgs[2].name(), "test:pending");
        assert_eq!(msgs[2].payload().title, "Given one (undefined step)");
        assert_eq!(f.stats().pending, 1);
    }

    #[test]
    fn scenario_level_reports_scenarios_as_tests() {
        let mut f = Formatter::new(Config {
            scenario_level_reporter: true,
            ..Config::default()
        });

        let msgs = attempt(&mut f, [Status::Undefined, Status::Skipped], finished(Status::Undefined));

        assert_eq!(names(&msgs), ["test:start", "test:fail"]);
        assert_eq!(f.failures(), 1);
        assert_eq!(f.stats().failed, 1);
        let err = msgs[1].payload().error.as_ref().unwrap();
        assert!(err.message.starts_with("Scenario Plain has undefined steps."));
    }

    #[test]
    fn engine_hooks_report_hook_end() {
        let mut f = Formatter::new(Config::default());
        let (doc, sc) = (doc(), scenario());
        let h = Arc::clone(&sc.steps[0]);
        let events = [
            Lifecycle::scenario(Arc::clone(&doc), Arc::clone(&sc), event::Scenario::Started),
            Lifecycle::step(Arc::clone(&doc), Arc::clone(&sc), Arc::clone(&h), event::Step::Started),
            Lifecycle::step(
                Arc::clone(&doc),
                Arc::clone(&sc),
                h,
                event::Step::Finished(result(Status::Failed)),
            ),
            Lifecycle::scenario(doc, sc, finished(Status::Failed)),
        ];

        let msgs = events
            .into_iter()
            .flat_map(|ev| f.handle(&Event::stamped(ev, at(0))))
            .collect::<Vec<_>>();

        assert_eq!(names(&msgs), ["suite:start", "hook:end", "suite:end"]);
        assert_eq!(msgs[1].payload().title, "open browser");
        assert_eq!(msgs[1].payload().file, "support/hooks.js");
        assert_eq!(msgs[1].payload().error.as_ref().unwrap().message, "boom");
        assert_eq!(f.failures(), 1);
    }

    #[test]
    fn user_hook_failures_are_counted() {
        let mut f = Formatter::new(Config::default());
        let failure = HookFailure {
            kind: HookKind::AfterFeature,
            message: "teardown failed".into(),
            duration: Duration::ZERO,
            document: doc(),
            scenario: None,
            step: None,
        };

        let msgs = f.record_hook_failure(&failure);

        assert_eq!(names(&msgs), ["hook:end"]);
        assert_eq!(msgs[0].payload().parent.as_deref(), Some("login.feature:1:1"));
        assert_eq!(msgs[0].payload().title, "\"afterFeature\" hook for Login");
        assert_eq!(f.failures(), 1);
    }

    #[test]
    fn tags_in_title_prefix_scenarios() {
        let mut f = Formatter::new(Config { tags_in_title: true, ..Config::default() });

        let msgs = attempt(&mut f, [Status::Passed, Status::Passed], finished(Status::Passed));

        assert_eq!(msgs[0].payload().title, "@smoke: Plain");
    }
}
