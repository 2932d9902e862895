//! Invocation of [`Hooks`] for [`Lifecycle`] events.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{FutureExt as _, future::LocalBoxFuture};
use tracing::Instrument as _;

use super::{HookFailure, HookKind, Hooks, Outcome, Registered};
use crate::event::{
    self, Document, Event, Lifecycle, ScenarioStep, resolved::Scenario,
};

/// Invoker of user [`Hooks`].
///
/// Each callback is awaited to completion before the next one starts, so
/// callbacks may rely on the side effects of the previous ones.
#[derive(Debug, Default)]
pub struct Dispatcher {
    /// Registered callbacks.
    hooks: Hooks,
}

impl From<Hooks> for Dispatcher {
    fn from(hooks: Hooks) -> Self {
        Self::new(hooks)
    }
}

impl Dispatcher {
    /// Creates a new [`Dispatcher`] of the given [`Hooks`].
    #[must_use]
    pub const fn new(hooks: Hooks) -> Self {
        Self { hooks }
    }

    /// Invokes the callbacks registered for the given [`Lifecycle`] event.
    ///
    /// Panicking callbacks don't prevent the rest from running, and are
    /// reported as [`HookFailure`]s.
    pub async fn dispatch(&self, ev: &Event<Lifecycle>) -> Outcome {
        let Lifecycle::Feature(doc, ev) = &ev.value else {
            return Outcome::default();
        };
        let mut out = Outcome::default();

        match ev {
            event::Feature::Started | event::Feature::Finished => {
                let (kind, hooks) = if matches!(ev, event::Feature::Started) {
                    (HookKind::BeforeFeature, &self.hooks.before_feature)
                } else {
                    (HookKind::AfterFeature, &self.hooks.after_feature)
                };
                for hook in applicable(hooks, doc.tags()) {
                    let span = tracing::info_span!(
                        "feature hook",
                        hook = %kind,
                        feature = %doc.name(),
                    );
                    let res = run((hook.func)(doc)).instrument(span).await;
                    out.record(res, || Target::new(kind, doc, None, None));
                }
            }
            event::Feature::Scenario(sc, ev) => {
                self.dispatch_scenario(doc, sc, ev, &mut out).await;
            }
        }
        out
    }

    async fn dispatch_scenario(
        &self,
        doc: &Arc<Document>,
        sc: &Arc<Scenario>,
        ev: &event::Scenario,
        out: &mut Outcome,
    ) {
        let tags = &sc.tags;
        match ev {
            event::Scenario::Started => {
                let kind = HookKind::BeforeScenario;
                for hook in applicable(&self.hooks.before_scenario, tags) {
                    let res = run((hook.func)(doc, sc))
                        .instrument(scenario_span(kind, sc))
                        .await;
                    out.record(res, || Target::new(kind, doc, Some(sc), None));
                }
            }
            event::Scenario::Finished(result) => {
                let kind = HookKind::AfterScenario;
                for hook in applicable(&self.hooks.after_scenario, tags) {
                    let res = run((hook.func)(doc, sc, result))
                        .instrument(scenario_span(kind, sc))
                        .await;
                    out.record(res, || Target::new(kind, doc, Some(sc), None));
                }
            }
            event::Scenario::Retried => {}
            event::Scenario::Step(step, ev) => {
                let Some(st) = step.as_step() else {
                    return;
                };
                match ev {
                    event::Step::Started => {
                        let kind = HookKind::BeforeStep;
                        for hook in applicable(&self.hooks.before_step, tags) {
                            let res = run((hook.func)(doc, sc, st))
                                .instrument(step_span(kind, st.title()))
                                .await;
                            out.record(res, || {
                                Target::new(kind, doc, Some(sc), Some(step))
                            });
                        }
                    }
                    event::Step::Finished(result) => {
                        let kind = HookKind::AfterStep;
                        for hook in applicable(&self.hooks.after_step, tags) {
                            let res = run((hook.func)(doc, sc, st, result))
                                .instrument(step_span(kind, st.title()))
                                .await;
                            out.record(res, || {
                                Target::new(kind, doc, Some(sc), Some(step))
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Entity a callback was invoked for.
struct Target {
    kind: HookKind,
    document: Arc<Document>,
    scenario: Option<Arc<Scenario>>,
    step: Option<Arc<ScenarioStep>>,
}

impl Target {
    fn new(
        kind: HookKind,
        doc: &Arc<Document>,
        sc: Option<&Arc<Scenario>>,
        step: Option<&Arc<ScenarioStep>>,
    ) -> Self {
        Self {
            kind,
            document: Arc::clone(doc),
            scenario: sc.cloned(),
            step: step.cloned(),
        }
    }
}

impl Outcome {
    /// Records the result of a single callback invocation.
    fn record(
        &mut self,
        (res, duration): (Result<(), String>, Duration),
        target: impl FnOnce() -> Target,
    ) {
        self.invoked += 1;
        if let Err(message) = res {
            let Target { kind, document, scenario, step } = target();
            tracing::debug!(hook = %kind, %message, "hook failed");
            self.failures.push(HookFailure {
                kind,
                message,
                duration,
                document,
                scenario,
                step,
            });
        }
    }
}

/// Filters the given `hooks` applying to the given `tags`.
fn applicable<'h, F, I, S>(
    hooks: &'h [Registered<F>],
    tags: I,
) -> impl Iterator<Item = &'h Registered<F>>
where
    S: AsRef<str>,
    I: IntoIterator<Item = S> + Clone + 'h,
{
    hooks.iter().filter(move |h| h.applies(tags.clone()))
}

fn scenario_span(kind: HookKind, sc: &Scenario) -> tracing::Span {
    tracing::info_span!(
        "scenario hook",
        hook = %kind,
        scenario = %sc.name,
        attempt = sc.attempt,
    )
}

fn step_span(kind: HookKind, step: String) -> tracing::Span {
    tracing::info_span!("step hook", hook = %kind, step = %step)
}

/// Runs the given callback future to completion, catching its panic.
async fn run(fut: LocalBoxFuture<'_, ()>) -> (Result<(), String>, Duration) {
    let started = Instant::now();
    let res = AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|e| coerce_error(&*e));
    (res, started.elapsed())
}

/// Coerces the given panic payload into a readable message.
fn coerce_error(err: &(dyn Any + Send + 'static)) -> String {
    if let Some(string) = err.downcast_ref::<String>() {
        string.clone()
    } else if let Some(&string) = err.downcast_ref::<&str>() {
        string.to_owned()
    } else {
        "(Could not resolve panic payload)".to_owned()
    }
}
