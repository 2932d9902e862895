// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level pipeline of the crate.
//!
//! [`Runtime`] feeds every [`Envelope`] through the [`Listener`], then hands
//! the produced [`Lifecycle`] events to the [`Dispatcher`] and the
//! [`Formatter`], and finally passes the resulting [`Message`]s to the
//! [`Writer`].

use std::{mem, pin::pin};

use futures::{Stream, StreamExt as _};

use crate::{
    config::Config,
    event::{self, Event, Lifecycle, StepResult},
    formatter::{Formatter, Stats},
    hooks::{Dispatcher, HookFailure, HookKind, Hooks, Outcome},
    listener::{Listener, RunState},
    message::{Envelope, Status},
    report::Message,
    writer::Writer,
};

/// Reason of the failures synthesized when `failFast` stops the run.
pub const FAIL_FAST_REASON: &str = "aborted: fail-fast";

/// Reason of the failures synthesized for the brackets still open when the
/// input ends.
pub const INCOMPLETE_REASON: &str =
    "aborted: stream ended before the run finished";

/// Outcome of a whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// [`Stats`] of the reported entities.
    pub stats: Stats,

    /// Number of recorded failures.
    pub failures: usize,

    /// Every failed invocation of a user callback, retried attempts
    /// included.
    pub hook_failures: Vec<HookFailure>,

    /// Whether the run succeeded.
    pub success: bool,
}

/// Pipeline driving a single run, one [`Envelope`] at a time.
///
/// # Ordering
///
/// For events opening a bracket ([`Feature`], [`Scenario`] or [`Step`]
/// started) the [`Formatter`] runs before user callbacks, and for events
/// closing one the user callbacks run first. This way messages caused by
/// failed callbacks are always emitted inside the brackets they belong to.
///
/// [`Feature`]: event::Feature
/// [`Scenario`]: event::Scenario
/// [`Step`]: event::Step
#[derive(Debug)]
pub struct Runtime<Wr> {
    /// Run options.
    config: Config,

    /// Correlator of the input.
    listener: Listener,

    /// Invoker of user callbacks.
    dispatcher: Dispatcher,

    /// Translator into reporting messages.
    formatter: Formatter,

    /// Sink of reporting messages.
    writer: Wr,

    /// Every failed invocation of a user callback so far.
    hook_failures: Vec<HookFailure>,

    /// Failures of `beforeStep` callbacks, applied once their step finishes.
    step_failures: Vec<HookFailure>,

    /// Step result, rewritten due to a failed step callback after the
    /// [`Listener`] has closed the attempt, to fail the attempt with.
    scenario_failure: Option<StepResult>,

    /// Engine's own verdict of the run, once known.
    engine_success: Option<bool>,

    /// Indicator whether the run was aborted.
    aborted: bool,
}

impl<Wr: Writer> Runtime<Wr> {
    /// Creates a new [`Runtime`] invoking the given [`Hooks`] and outputting
    /// into the given [`Writer`].
    #[must_use]
    pub fn new(config: Config, hooks: Hooks, writer: Wr) -> Self {
        Self {
            config,
            listener: Listener::new(),
            dispatcher: Dispatcher::new(hooks),
            formatter: Formatter::new(config),
            writer,
            hook_failures: vec![],
            step_failures: vec![],
            scenario_failure: None,
            engine_success: None,
            aborted: false,
        }
    }

    /// Indicates whether the run was aborted, so no more input is consumed.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Returns the underlying [`Listener`].
    #[must_use]
    pub const fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Returns the underlying [`Formatter`].
    #[must_use]
    pub const fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Returns the underlying [`Writer`].
    #[must_use]
    pub const fn writer(&self) -> &Wr {
        &self.writer
    }

    /// Consumes the given [`Envelope`], fully processing every event it
    /// causes before returning.
    ///
    /// With `failFast` set, the run is aborted once a failure is recorded.
    /// Nothing is consumed after that.
    pub async fn handle(&mut self, envelope: Envelope) {
        if self.aborted {
            tracing::debug!(
                kind = envelope.kind(),
                "run aborted, ignoring envelope",
            );
            return;
        }
        for ev in self.listener.handle(envelope) {
            self.process(ev).await;
        }
        if self.config.fail_fast && self.formatter.failures() > 0 {
            tracing::warn!(
                failures = self.formatter.failures(),
                "failure recorded, stopping the run",
            );
            self.abort(FAIL_FAST_REASON).await;
        }
    }

    /// Consumes the whole `envelopes` stream and finishes the run.
    ///
    /// Stops consuming as soon as the run is aborted.
    pub async fn run<S>(mut self, envelopes: S) -> (RunSummary, Wr)
    where
        S: Stream<Item = Envelope>,
    {
        let mut envelopes = pin!(envelopes);
        while let Some(envelope) = envelopes.next().await {
            self.handle(envelope).await;
            if self.aborted {
                break;
            }
        }
        self.finish().await
    }

    /// Finishes the run, returning its [`RunSummary`] along with the
    /// [`Writer`].
    ///
    /// Brackets left open by an incomplete input are closed with failures.
    pub async fn finish(mut self) -> (RunSummary, Wr) {
        if self.listener.state() == RunState::RunStarted {
            tracing::warn!("input ended before the run finished");
            self.abort(INCOMPLETE_REASON).await;
        }

        let failures = self.formatter.failures();
        let success = if self.config.ignore_undefined_definitions {
            failures == 0
        } else {
            failures == 0 && self.engine_success.unwrap_or(true)
        };
        let summary = RunSummary {
            stats: self.formatter.stats(),
            failures,
            hook_failures: self.hook_failures,
            success,
        };
        tracing::info!(
            success,
            failures,
            total = summary.stats.total(),
            retried = summary.stats.retried,
            "run finished",
        );
        (summary, self.writer)
    }

    async fn abort(&mut self, reason: &str) {
        self.aborted = true;
        for ev in self.listener.abort(reason) {
            self.process(ev).await;
        }
    }

    async fn process(&mut self, mut ev: Event<Lifecycle>) {
        tracing::trace!(event = ev.label(), "processing event");
        self.amend(&mut ev.value).await;

        if let Lifecycle::Finished { success } = ev.value {
            self.engine_success = Some(success);
        }

        if opens_bracket(&ev.value) {
            let msgs = self.formatter.handle(&ev);
            self.emit(msgs).await;
            let outcome = self.dispatcher.dispatch(&ev).await;
            self.record(outcome, &mut ev.value).await;
        } else {
            let outcome = self.dispatcher.dispatch(&ev).await;
            self.record(outcome, &mut ev.value).await;
            let msgs = self.formatter.handle(&ev);
            self.emit(msgs).await;
        }
    }

    /// Applies failures of earlier step callbacks to the given event.
    async fn amend(&mut self, ev: &mut Lifecycle) {
        let Lifecycle::Feature(_, event::Feature::Scenario(_, ev)) = ev else {
            return;
        };
        match ev {
            event::Scenario::Started | event::Scenario::Retried => {
                self.step_failures.clear();
                self.scenario_failure = None;
            }
            event::Scenario::Step(step, event::Step::Finished(result)) => {
                let id = step.test_step_id();
                let (own, rest) = mem::take(&mut self.step_failures)
                    .into_iter()
                    .partition::<Vec<_>, _>(|f| {
                        f.step.as_ref().is_some_and(|s| s.test_step_id() == id)
                    });
                self.step_failures = rest;
                for failure in &own {
                    self.fail_step(id, result, failure).await;
                }
            }
            event::Scenario::Step(_, event::Step::Started) => {}
            event::Scenario::Finished(result) => {
                if let Some(failure) = self.scenario_failure.take() {
                    if !result.is_failure() {
                        *result = failure;
                    }
                }
                self.step_failures.clear();
            }
        }
    }

    /// Records the given [`Outcome`] of user callbacks invoked for the given
    /// event.
    async fn record(&mut self, outcome: Outcome, ev: &mut Lifecycle) {
        for failure in outcome.failures {
            match failure.kind {
                HookKind::BeforeStep => {
                    if failure.step.is_some() {
                        self.step_failures.push(failure.clone());
                    }
                }
                HookKind::AfterStep => {
                    if let Some((id, result)) = step_result_mut(ev) {
                        self.fail_step(id, result, &failure).await;
                    }
                }
                HookKind::BeforeFeature
                | HookKind::AfterFeature
                | HookKind::BeforeScenario
                | HookKind::AfterScenario => {
                    let msgs = self.formatter.record_hook_failure(&failure);
                    self.emit(msgs).await;
                }
            }
            self.hook_failures.push(failure);
        }
    }

    /// Fails the step `result` of the given test step with the message of
    /// the given step callback `failure`.
    ///
    /// An already failed step keeps its own error, and the callback `failure`
    /// is reported separately.
    async fn fail_step(
        &mut self,
        test_step_id: &str,
        result: &mut StepResult,
        failure: &HookFailure,
    ) {
        if result.status == Status::Failed {
            let msgs = self.formatter.record_hook_failure(failure);
            self.emit(msgs).await;
            return;
        }
        *result = StepResult::failed(failure.message.clone(), result.duration);
        if !self.listener.amend_step_result(test_step_id, result.clone()) {
            tracing::debug!(
                test_step_id,
                "attempt already closed, failing it on finish",
            );
            if self.scenario_failure.is_none() {
                self.scenario_failure = Some(result.clone());
            }
        }
    }

    async fn emit(&mut self, msgs: Vec<Message>) {
        for msg in msgs {
            self.writer.handle_message(msg).await;
        }
    }
}

/// Indicates whether the given event opens a bracket.
const fn opens_bracket(ev: &Lifecycle) -> bool {
    matches!(
        ev,
        Lifecycle::Started
            | Lifecycle::Feature(
                _,
                event::Feature::Started
                    | event::Feature::Scenario(
                        _,
                        event::Scenario::Started
                            | event::Scenario::Step(_, event::Step::Started),
                    ),
            ),
    )
}

/// Returns the test step ID and the result carried by the given `after-step`
/// event, if it's one.
fn step_result_mut(ev: &mut Lifecycle) -> Option<(&str, &mut StepResult)> {
    match ev {
        Lifecycle::Feature(
            _,
            event::Feature::Scenario(
                _,
                event::Scenario::Step(step, event::Step::Finished(result)),
            ),
        ) => Some((step.test_step_id(), result)),
        _ => None,
    }
}
