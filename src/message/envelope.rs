//! Tagged union over the correlated envelope kinds.

use derive_more::with_trait::From;
use serde::Deserialize;

use super::{
    GherkinDocument, Hook, Pickle, TestCase, TestCaseFinished,
    TestCaseStarted, TestRunFinished, TestRunStarted, TestStepFinished,
    TestStepStarted,
};

/// Single message of the engine's execution stream.
///
/// Only the kinds participating in correlation are represented. Use
/// [`RawEnvelope`] for decoding the wire format.
#[derive(Clone, Debug, From, PartialEq)]
pub enum Envelope {
    /// Parsed feature file.
    GherkinDocument(GherkinDocument),

    /// Compiled scenario accepted for execution.
    Pickle(Pickle),

    /// Hook defined in the support code.
    Hook(Hook),

    /// Execution started.
    TestRunStarted(TestRunStarted),

    /// Execution plan of a [`Pickle`] prepared.
    TestCase(TestCase),

    /// Attempt of a [`TestCase`] started.
    TestCaseStarted(TestCaseStarted),

    /// Step of an attempt started.
    TestStepStarted(TestStepStarted),

    /// Step of an attempt finished.
    TestStepFinished(TestStepFinished),

    /// Attempt of a [`TestCase`] finished.
    TestCaseFinished(TestCaseFinished),

    /// Execution finished.
    TestRunFinished(TestRunFinished),
}

impl Envelope {
    /// Returns the wire name of this [`Envelope`] kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GherkinDocument(_) => "gherkinDocument",
            Self::Pickle(_) => "pickle",
            Self::Hook(_) => "hook",
            Self::TestRunStarted(_) => "testRunStarted",
            Self::TestCase(_) => "testCase",
            Self::TestCaseStarted(_) => "testCaseStarted",
            Self::TestStepStarted(_) => "testStepStarted",
            Self::TestStepFinished(_) => "testStepFinished",
            Self::TestCaseFinished(_) => "testCaseFinished",
            Self::TestRunFinished(_) => "testRunFinished",
        }
    }
}

/// Wire representation of an [`Envelope`]: an object with a single populated
/// key named after the message kind.
///
/// Unknown keys are ignored, so envelopes of kinds not modeled by
/// [`Envelope`] decode into an empty [`RawEnvelope`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    gherkin_document: Option<GherkinDocument>,
    pickle: Option<Pickle>,
    hook: Option<Hook>,
    test_run_started: Option<TestRunStarted>,
    test_case: Option<TestCase>,
    test_case_started: Option<TestCaseStarted>,
    test_step_started: Option<TestStepStarted>,
    test_step_finished: Option<TestStepFinished>,
    test_case_finished: Option<TestCaseFinished>,
    test_run_finished: Option<TestRunFinished>,
}

impl RawEnvelope {
    /// Converts this [`RawEnvelope`] into an [`Envelope`], if it carries one
    /// of the correlated kinds.
    #[must_use]
    pub fn into_envelope(self) -> Option<Envelope> {
        let Self {
            gherkin_document,
            pickle,
            hook,
            test_run_started,
            test_case,
            test_case_started,
            test_step_started,
            test_step_finished,
            test_case_finished,
            test_run_finished,
        } = self;

        gherkin_document
            .map(Envelope::from)
            .or_else(|| pickle.map(Envelope::from))
            .or_else(|| hook.map(Envelope::from))
            .or_else(|| test_run_started.map(Envelope::from))
            .or_else(|| test_case.map(Envelope::from))
            .or_else(|| test_case_started.map(Envelope::from))
            .or_else(|| test_step_started.map(Envelope::from))
            .or_else(|| test_step_finished.map(Envelope::from))
            .or_else(|| test_case_finished.map(Envelope::from))
            .or_else(|| test_run_finished.map(Envelope::from))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_populated_kind() {
        let raw: RawEnvelope = serde_json::from_value(json!({
            "testCaseStarted": {"id": "a", "testCaseId": "tc", "attempt": 1},
        }))
        .unwrap();

        let Some(Envelope::TestCaseStarted(started)) = raw.into_envelope() else {
            panic!("expected `testCaseStarted`");
        };
        assert_eq!(started.attempt, 1);
        assert_eq!(started.test_case_id, "tc");
    }

    #[test]
    fn unknown_kind_is_none() {
        let raw: RawEnvelope = serde_json::from_value(json!({
            "stepDefinition": {"id": "sd"},
        }))
        .unwrap();

        assert!(raw.into_envelope().is_none());
    }
}
