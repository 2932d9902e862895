// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Correlated snapshots carried by [`event`]s.
//!
//! These are built by the [`Listener`] once every referenced ID is resolved,
//! and are only read afterwards: consumers of [`event`]s never have to look
//! anything up by ID.
//!
//! [`event`]: super
//! [`Listener`]: crate::Listener

use std::{sync::Arc, time::Duration};

use crate::{
    message::{self, GherkinDocument, HookType, Location, Status},
    store::ScenarioId,
};

/// Parsed feature file along with its URI.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// URI of the file.
    pub uri: String,

    /// Parsed AST.
    pub ast: GherkinDocument,
}

impl Document {
    /// Creates a new [`Document`] out of the given [`GherkinDocument`].
    #[must_use]
    pub fn new(ast: GherkinDocument) -> Self {
        Self { uri: ast.uri.clone().unwrap_or_default(), ast }
    }

    /// Returns the root [`message::Feature`], if any.
    #[must_use]
    pub fn feature(&self) -> Option<&message::Feature> {
        self.ast.feature.as_ref()
    }

    /// Returns the name of the [`message::Feature`], or an empty string.
    #[must_use]
    pub fn name(&self) -> &str {
        self.feature().map_or("", |f| f.name.as_str())
    }

    /// Returns the tag names of the [`message::Feature`].
    pub fn tags(&self) -> impl Iterator<Item = &str> + Clone {
        self.feature()
            .into_iter()
            .flat_map(|f| &f.tags)
            .map(|t| t.name.as_str())
    }

    /// Returns [`Location`] of the `Feature:` keyword.
    #[must_use]
    pub fn location(&self) -> Location {
        self.feature().map(|f| f.location).unwrap_or_default()
    }
}

/// Attempt of a scenario, with its steps reconciled against the prepared test
/// case.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    /// Local ID, stable across retries.
    pub id: ScenarioId,

    /// Engine-assigned pickle ID.
    pub pickle_id: String,

    /// Engine-assigned ID of the attempted test case.
    pub test_case_id: String,

    /// Zero-based attempt number.
    pub attempt: u32,

    /// URI of the owning [`Document`].
    pub uri: String,

    /// Name as compiled by the engine.
    pub name: String,

    /// Tag names, inherited ones included.
    pub tags: Vec<String>,

    /// Name of the enclosing `Rule:` block, if any.
    pub rule: Option<String>,

    /// AST node IDs of the scenario (and example row for outlines).
    pub ast_node_ids: Vec<String>,

    /// Steps and hooks in execution order.
    pub steps: Vec<Arc<ScenarioStep>>,
}

impl Scenario {
    /// Looks up a step by the ID of the test step executing it.
    #[must_use]
    pub fn step(&self, test_step_id: &str) -> Option<&Arc<ScenarioStep>> {
        self.steps.iter().find(|s| s.test_step_id() == test_step_id)
    }

    /// Returns the ID of the scenario AST node.
    #[must_use]
    pub fn ast_root(&self) -> Option<&str> {
        self.ast_node_ids.first().map(String::as_str)
    }

    /// Returns the ID of the example row AST node, for outlines.
    #[must_use]
    pub fn example_row(&self) -> Option<&str> {
        self.ast_node_ids.get(1).map(String::as_str)
    }
}

/// Entry of a [`Scenario`]: either a user-authored step or a hook.
#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioStep {
    /// Step from the scenario text.
    Step(StepRef),

    /// Hook placeholder, synthesized from the test case plan.
    Hook(HookRef),
}

impl ScenarioStep {
    /// Returns ID of the test step executing this entry.
    #[must_use]
    pub fn test_step_id(&self) -> &str {
        match self {
            Self::Step(s) => &s.test_step_id,
            Self::Hook(h) => &h.test_step_id,
        }
    }

    /// Returns the text of this entry, if it has any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Step(s) => Some(s.text.as_str()),
            Self::Hook(h) => h.name.as_deref(),
        }
    }

    /// Indicates whether this entry is a hook.
    #[must_use]
    pub const fn is_hook(&self) -> bool {
        matches!(self, Self::Hook(_))
    }

    /// Returns the [`StepRef`], if this entry is a step.
    #[must_use]
    pub const fn as_step(&self) -> Option<&StepRef> {
        match self {
            Self::Step(s) => Some(s),
            Self::Hook(_) => None,
        }
    }
}

/// Resolved pickle step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRef {
    /// Engine-assigned pickle step ID.
    pub id: String,

    /// ID of the test step executing it.
    pub test_step_id: String,

    /// Keyword of the source step without trailing whitespace (`"Given"`),
    /// empty if the source step wasn't found.
    pub keyword: String,

    /// Text after the keyword.
    pub text: String,

    /// AST node IDs of the source step.
    pub ast_node_ids: Vec<String>,
}

impl StepRef {
    /// Returns the text prefixed with the keyword.
    #[must_use]
    pub fn title(&self) -> String {
        if self.keyword.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.keyword, self.text)
        }
    }
}

/// Hook placeholder of a [`Scenario`].
#[derive(Clone, Debug, PartialEq)]
pub struct HookRef {
    /// ID of the test step executing it.
    pub test_step_id: String,

    /// Engine-assigned hook ID.
    pub hook_id: String,

    /// Name given to the hook, if any.
    pub name: Option<String>,

    /// [`HookType`], if known.
    pub kind: Option<HookType>,

    /// URI of the support code file defining the hook.
    pub source_uri: Option<String>,

    /// [`Location`] of the hook in [`HookRef::source_uri`].
    pub location: Option<Location>,
}

impl HookRef {
    /// Returns the hook name, falling back to its kind.
    #[must_use]
    pub fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.kind.map_or("Hook", HookType::label).to_owned()
        })
    }
}

/// Outcome of a step, hook or whole scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    /// [`Status`] of the outcome.
    pub status: Status,

    /// Failure message, usually with a stack trace.
    pub message: Option<String>,

    /// Time taken.
    pub duration: Duration,
}

impl StepResult {
    /// Creates a [`Status::Passed`] [`StepResult`].
    #[must_use]
    pub const fn passed(duration: Duration) -> Self {
        Self { status: Status::Passed, message: None, duration }
    }

    /// Creates a [`Status::Failed`] [`StepResult`] with the given `message`.
    #[must_use]
    pub fn failed(message: impl Into<String>, duration: Duration) -> Self {
        Self { status: Status::Failed, message: Some(message.into()), duration }
    }

    /// Indicates whether this outcome is [`Status::Passed`].
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        self.status.is_passed()
    }

    /// Indicates whether this outcome is neither passed nor skipped.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self.status, Status::Passed | Status::Skipped)
    }

    /// Selects the outcome of a whole scenario: the first non-passed one, or
    /// the last one if all passed.
    #[must_use]
    pub fn select<'r>(
        results: impl IntoIterator<Item = &'r Self>,
    ) -> Option<&'r Self> {
        let mut last = None;
        for res in results {
            if !res.is_passed() {
                return Some(res);
            }
            last = Some(res);
        }
        last
    }
}

impl From<message::TestStepResult> for StepResult {
    fn from(res: message::TestStepResult) -> Self {
        Self {
            status: res.status,
            message: res.message,
            duration: res.duration.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: Status, message: &str) -> StepResult {
        StepResult {
            status,
            message: Some(message.into()),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn selects_first_non_passed_result() {
        let results = [
            result(Status::Passed, "1"),
            result(Status::Failed, "2"),
            result(Status::Skipped, "3"),
        ];

        let selected = StepResult::select(&results).unwrap();

        assert_eq!(selected.message.as_deref(), Some("2"));
    }

    #[test]
    fn selects_last_result_when_all_passed() {
        let results = [result(Status::Passed, "1"), result(Status::Passed, "2")];

        let selected = StepResult::select(&results).unwrap();

        assert_eq!(selected.message.as_deref(), Some("2"));
    }

    #[test]
    fn selects_nothing_from_nothing() {
        assert!(StepResult::select(&[]).is_none());
    }

    #[test]
    fn step_title_includes_keyword() {
        let step = StepRef {
            id: "s".into(),
            test_step_id: "ts".into(),
            keyword: "Given".into(),
            text: "a browser".into(),
            ast_node_ids: vec![],
        };

        assert_eq!(step.title(), "Given a browser");
        assert_eq!(StepRef { keyword: String::new(), ..step }.title(), "a browser");
    }

    #[test]
    fn hook_title_falls_back_to_kind() {
        let hook = HookRef {
            test_step_id: "ts".into(),
            hook_id: "h".into(),
            name: None,
            kind: Some(HookType::AfterTestCase),
            source_uri: None,
            location: None,
        };

        assert_eq!(hook.title(), "After");
        assert_eq!(HookRef { kind: None, ..hook.clone() }.title(), "Hook");
        assert_eq!(
            HookRef { name: Some("close".into()), ..hook }.title(),
            "close",
        );
    }
}
