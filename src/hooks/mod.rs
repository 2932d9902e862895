// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! User callbacks invoked on [`Lifecycle`] boundaries.
//!
//! Callbacks are plain functions returning a [`LocalBoxFuture`], and are
//! considered failed if they panic:
//! ```rust
//! # use cucumber_lifecycle::Hooks;
//! use futures::FutureExt as _;
//!
//! let hooks = Hooks::new()
//!     .before_scenario(|_, scenario| {
//!         async move { assert!(!scenario.name.is_empty()) }.boxed_local()
//!     })
//!     .after_step(|_, _, step, res| {
//!         async move { println!("{}: {}", step.title(), res.status) }
//!             .boxed_local()
//!     });
//! # drop(hooks);
//! ```
//!
//! [`Lifecycle`]: crate::event::Lifecycle

mod dispatcher;

use std::{fmt, sync::Arc, time::Duration};

use derive_more::with_trait::Display;
use futures::future::LocalBoxFuture;
use gherkin::tagexpr::TagOperation;

use crate::{
    event::{Document, ScenarioStep, StepRef, StepResult, resolved::Scenario},
    tag::Ext as _,
};

pub use self::dispatcher::Dispatcher;

/// Alias for a callback executed before or after each feature.
pub type FeatureHookFn =
    Box<dyn for<'a> Fn(&'a Document) -> LocalBoxFuture<'a, ()>>;

/// Alias for a callback executed before each scenario attempt.
pub type BeforeScenarioHookFn = Box<
    dyn for<'a> Fn(&'a Document, &'a Scenario) -> LocalBoxFuture<'a, ()>,
>;

/// Alias for a callback executed after each scenario attempt, along with its
/// outcome.
pub type AfterScenarioHookFn = Box<
    dyn for<'a> Fn(
        &'a Document,
        &'a Scenario,
        &'a StepResult,
    ) -> LocalBoxFuture<'a, ()>,
>;

/// Alias for a callback executed before each step.
pub type BeforeStepHookFn = Box<
    dyn for<'a> Fn(
        &'a Document,
        &'a Scenario,
        &'a StepRef,
    ) -> LocalBoxFuture<'a, ()>,
>;

/// Alias for a callback executed after each step, along with its outcome.
pub type AfterStepHookFn = Box<
    dyn for<'a> Fn(
        &'a Document,
        &'a Scenario,
        &'a StepRef,
        &'a StepResult,
    ) -> LocalBoxFuture<'a, ()>,
>;

/// Callback along with its optional tag filter.
struct Registered<F> {
    /// Tag expression the tags must satisfy for the callback to run.
    filter: Option<TagOperation>,

    /// Callback itself.
    func: F,
}

impl<F> Registered<F> {
    /// Indicates whether this callback applies to the given `tags`.
    fn applies<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        self.filter.as_ref().map_or(true, |op| op.eval(tags))
    }
}

/// Registry of user callbacks, keyed by the lifecycle boundary.
///
/// Callbacks of the same boundary run in their registration order. Step
/// callbacks run for scenario steps only, never for hook placeholders.
#[derive(Default)]
pub struct Hooks {
    before_feature: Vec<Registered<FeatureHookFn>>,
    after_feature: Vec<Registered<FeatureHookFn>>,
    before_scenario: Vec<Registered<BeforeScenarioHookFn>>,
    after_scenario: Vec<Registered<AfterScenarioHookFn>>,
    before_step: Vec<Registered<BeforeStepHookFn>>,
    after_step: Vec<Registered<AfterStepHookFn>>,
}

// Manual implementation is required as callbacks are not `Debug`.
impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_feature", &self.before_feature.len())
            .field("after_feature", &self.after_feature.len())
            .field("before_scenario", &self.before_scenario.len())
            .field("after_scenario", &self.after_scenario.len())
            .field("before_step", &self.before_step.len())
            .field("after_step", &self.after_step.len())
            .finish()
    }
}

macro_rules! registration {
    (
        $(#[doc = $doc:literal])*
        $field:ident, $tagged:ident, $alias:ident,
        for<$a:lifetime> ($($arg:ty),+)
    ) => {
        $(#[doc = $doc])*
        #[must_use]
        pub fn $field<F>(mut self, func: F) -> Self
        where
            F: for<$a> Fn($($arg),+) -> LocalBoxFuture<$a, ()> + 'static,
        {
            let func: $alias = Box::new(func);
            self.$field.push(Registered { filter: None, func });
            self
        }

        $(#[doc = $doc])*
        ///
        /// Runs only if the tags satisfy the given [`TagOperation`].
        #[must_use]
        pub fn $tagged<F>(mut self, filter: TagOperation, func: F) -> Self
        where
            F: for<$a> Fn($($arg),+) -> LocalBoxFuture<$a, ()> + 'static,
        {
            let func: $alias = Box::new(func);
            self.$field.push(Registered { filter: Some(filter), func });
            self
        }
    };
}

impl Hooks {
    /// Creates an empty [`Hooks`] registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    registration!(
        /// Registers a callback executed before each feature starts, with
        /// feature tags being matched by filters.
        before_feature, before_feature_tagged, FeatureHookFn,
        for<'a> (&'a Document)
    );

    registration!(
        /// Registers a callback executed after each feature finishes, with
        /// feature tags being matched by filters.
        after_feature, after_feature_tagged, FeatureHookFn,
        for<'a> (&'a Document)
    );

    registration!(
        /// Registers a callback executed before each scenario attempt.
        before_scenario, before_scenario_tagged, BeforeScenarioHookFn,
        for<'a> (&'a Document, &'a Scenario)
    );

    registration!(
        /// Registers a callback executed after each scenario attempt, unless
        /// the attempt is going to be retried.
        after_scenario, after_scenario_tagged, AfterScenarioHookFn,
        for<'a> (&'a Document, &'a Scenario, &'a StepResult)
    );

    registration!(
        /// Registers a callback executed before each scenario step.
        before_step, before_step_tagged, BeforeStepHookFn,
        for<'a> (&'a Document, &'a Scenario, &'a StepRef)
    );

    registration!(
        /// Registers a callback executed after each scenario step.
        after_step, after_step_tagged, AfterStepHookFn,
        for<'a> (&'a Document, &'a Scenario, &'a StepRef, &'a StepResult)
    );

    /// Indicates whether no callbacks are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before_feature.is_empty()
            && self.after_feature.is_empty()
            && self.before_scenario.is_empty()
            && self.after_scenario.is_empty()
            && self.before_step.is_empty()
            && self.after_step.is_empty()
    }
}

/// Lifecycle boundary a callback is registered for.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookKind {
    /// Before a feature.
    #[display("beforeFeature")]
    BeforeFeature,

    /// After a feature.
    #[display("afterFeature")]
    AfterFeature,

    /// Before a scenario attempt.
    #[display("beforeScenario")]
    BeforeScenario,

    /// After a scenario attempt.
    #[display("afterScenario")]
    AfterScenario,

    /// Before a step.
    #[display("beforeStep")]
    BeforeStep,

    /// After a step.
    #[display("afterStep")]
    AfterStep,
}

impl HookKind {
    /// Indicates whether this [`HookKind`] is bound to a step, so its failure
    /// fails the step.
    #[must_use]
    pub const fn is_step_level(self) -> bool {
        matches!(self, Self::BeforeStep | Self::AfterStep)
    }
}

/// Failed invocation of a user callback.
#[derive(Clone, Debug, PartialEq)]
pub struct HookFailure {
    /// [`HookKind`] of the failed callback.
    pub kind: HookKind,

    /// Panic message of the callback.
    pub message: String,

    /// Time the callback took.
    pub duration: Duration,

    /// [`Document`] the callback was invoked for.
    pub document: Arc<Document>,

    /// [`Scenario`] the callback was invoked for, unless it's a feature one.
    pub scenario: Option<Arc<Scenario>>,

    /// Step the callback was invoked for, if it's a step one.
    pub step: Option<Arc<ScenarioStep>>,
}

impl HookFailure {
    /// Returns the title of the failed callback, qualified with the entity it
    /// was invoked for.
    #[must_use]
    pub fn title(&self) -> String {
        let target = match (&self.scenario, &self.step) {
            (_, Some(st)) => st.text().map(ToOwned::to_owned),
            (Some(sc), None) => Some(sc.name.clone()),
            (None, None) => Some(self.document.name().to_owned()),
        };
        match target {
            Some(t) if !t.is_empty() => {
                format!("\"{}\" hook for {t}", self.kind)
            }
            _ => format!("\"{}\" hook", self.kind),
        }
    }
}

/// Outcome of dispatching a single [`Lifecycle`] event.
///
/// [`Lifecycle`]: crate::event::Lifecycle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    /// Number of invoked callbacks.
    pub invoked: usize,

    /// Failures of the invoked callbacks, in invocation order.
    pub failures: Vec<HookFailure>,
}

impl Outcome {
    /// Indicates whether any invoked callback failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}
