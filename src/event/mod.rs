// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key occurrences in a lifecycle of a correlated execution.
//!
//! The top-level enum here is [`Lifecycle`].
//!
//! Each event enum contains variants indicating what stage of execution the
//! [`Listener`] is at, and variants with detailed content about the precise
//! sub-event. Nesting of the enums mirrors nesting of the brackets: every
//! [`Step`] happens inside a [`Scenario`], which happens inside a
//! [`Feature`].
//!
//! [`Listener`]: crate::Listener

pub mod event_struct;
pub mod resolved;

use std::sync::Arc;

#[doc(inline)]
pub use self::{
    event_struct::Event,
    resolved::{Document, HookRef, ScenarioStep, StepRef, StepResult},
};

/// Top-level event of an execution.
#[derive(Clone, Debug, PartialEq)]
pub enum Lifecycle {
    /// Execution being started.
    Started,

    /// [`Feature`] event.
    Feature(Arc<Document>, Feature),

    /// Execution being finished.
    Finished {
        /// Engine's own verdict of the run, `true` if it didn't report one.
        success: bool,
    },
}

impl Lifecycle {
    /// Constructs an event of a [`Feature`] being started.
    #[must_use]
    pub const fn feature_started(doc: Arc<Document>) -> Self {
        Self::Feature(doc, Feature::Started)
    }

    /// Constructs an event of a [`Feature`] being finished.
    #[must_use]
    pub const fn feature_finished(doc: Arc<Document>) -> Self {
        Self::Feature(doc, Feature::Finished)
    }

    /// Constructs a [`Scenario`] event.
    #[must_use]
    pub const fn scenario(
        doc: Arc<Document>,
        scenario: Arc<resolved::Scenario>,
        event: Scenario,
    ) -> Self {
        Self::Feature(doc, Feature::Scenario(scenario, event))
    }

    /// Constructs a [`Step`] event.
    #[must_use]
    pub const fn step(
        doc: Arc<Document>,
        scenario: Arc<resolved::Scenario>,
        step: Arc<ScenarioStep>,
        event: Step,
    ) -> Self {
        Self::scenario(doc, scenario, Scenario::Step(step, event))
    }

    /// Returns a short label of this event, like `before-feature` or
    /// `after-step`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Started => "run-started",
            Self::Finished { .. } => "run-finished",
            Self::Feature(_, ev) => match ev {
                Feature::Started => "before-feature",
                Feature::Finished => "after-feature",
                Feature::Scenario(_, ev) => match ev {
                    Scenario::Started => "before-scenario",
                    Scenario::Finished(_) => "after-scenario",
                    Scenario::Retried => "scenario-retried",
                    Scenario::Step(_, Step::Started) => "before-step",
                    Scenario::Step(_, Step::Finished(_)) => "after-step",
                },
            },
        }
    }
}

/// Event specific to a particular [Feature].
///
/// [Feature]: https://cucumber.io/docs/gherkin/reference#feature
#[derive(Clone, Debug, PartialEq)]
pub enum Feature {
    /// [`Feature`] execution being started.
    Started,

    /// [`Scenario`] event.
    Scenario(Arc<resolved::Scenario>, Scenario),

    /// [`Feature`] execution being finished.
    Finished,
}

/// Event specific to a particular attempt of a [Scenario].
///
/// [Scenario]: https://cucumber.io/docs/gherkin/reference#example
#[derive(Clone, Debug, PartialEq)]
pub enum Scenario {
    /// [`Scenario`] attempt being started.
    Started,

    /// [`Step`] or hook event.
    Step(Arc<ScenarioStep>, Step),

    /// [`Scenario`] attempt being finished.
    ///
    /// Carries the first non-passed [`StepResult`] of the attempt, or the
    /// last one if all of them passed.
    Finished(StepResult),

    /// [`Scenario`] attempt being finished, with another attempt to follow.
    ///
    /// Closes the attempt in place of [`Scenario::Finished`], so its outcome
    /// is superseded by the next attempt.
    Retried,
}

/// Event specific to a particular [Step] or hook.
///
/// [Step]: https://cucumber.io/docs/gherkin/reference#steps
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// [`Step`] execution being started.
    Started,

    /// [`Step`] execution being finished.
    Finished(StepResult),
}
