//! Envelopes describing the execution of [`Pickle`]s.
//!
//! [`Pickle`]: super::Pickle

use derive_more::with_trait::Display;
use serde::Deserialize;

use super::{Duration, Location, Timestamp};

/// `testRunStarted` envelope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TestRunStarted {
    /// Time the run started at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// `testRunFinished` envelope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TestRunFinished {
    /// Engine's own verdict of the run.
    #[serde(default)]
    pub success: Option<bool>,

    /// Time the run finished at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// Error message, if the run was aborted.
    #[serde(default)]
    pub message: Option<String>,
}

/// Execution plan of a single [`Pickle`], emitted by the `testCase` envelope.
///
/// [`Pickle`]: super::Pickle
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Engine-assigned ID.
    pub id: String,

    /// ID of the planned [`Pickle`].
    ///
    /// [`Pickle`]: super::Pickle
    pub pickle_id: String,

    /// [`TestStep`]s in execution order.
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
}

/// Entry of a [`TestCase`] plan.
///
/// Exactly one of [`TestStep::pickle_step_id`] and [`TestStep::hook_id`] is
/// expected to be present.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// Engine-assigned ID.
    pub id: String,

    /// ID of the executed [`PickleStep`].
    ///
    /// [`PickleStep`]: super::PickleStep
    #[serde(default)]
    pub pickle_step_id: Option<String>,

    /// ID of the executed [`Hook`].
    #[serde(default)]
    pub hook_id: Option<String>,
}

/// `testCaseStarted` envelope, opening a single attempt of a [`TestCase`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseStarted {
    /// ID of this attempt.
    pub id: String,

    /// ID of the attempted [`TestCase`].
    pub test_case_id: String,

    /// Zero-based attempt number.
    #[serde(default)]
    pub attempt: u32,

    /// Time the attempt started at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// `testStepStarted` envelope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestStepStarted {
    /// ID of the [`TestCaseStarted`] attempt.
    pub test_case_started_id: String,

    /// ID of the started [`TestStep`].
    pub test_step_id: String,

    /// Time the step started at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// `testStepFinished` envelope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestStepFinished {
    /// ID of the [`TestCaseStarted`] attempt.
    pub test_case_started_id: String,

    /// ID of the finished [`TestStep`].
    pub test_step_id: String,

    /// Outcome of the step.
    pub test_step_result: TestStepResult,

    /// Time the step finished at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// Outcome of a [`TestStep`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TestStepResult {
    /// [`Status`] of the step.
    pub status: Status,

    /// Failure message, usually with a stack trace.
    #[serde(default)]
    pub message: Option<String>,

    /// Time the step took.
    #[serde(default)]
    pub duration: Duration,
}

/// Status of a finished [`TestStep`].
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Status is not known to the producer.
    #[default]
    #[display("UNKNOWN")]
    Unknown,

    /// Step passed.
    #[display("PASSED")]
    Passed,

    /// Step was skipped, usually after a failed one.
    #[display("SKIPPED")]
    Skipped,

    /// Step definition is marked as pending.
    #[display("PENDING")]
    Pending,

    /// No step definition matches the step.
    #[display("UNDEFINED")]
    Undefined,

    /// Multiple step definitions match the step.
    #[display("AMBIGUOUS")]
    Ambiguous,

    /// Step failed.
    #[display("FAILED")]
    Failed,
}

impl Status {
    /// Indicates whether this [`Status`] is [`Status::Passed`].
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// `testCaseFinished` envelope, closing a single attempt of a [`TestCase`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFinished {
    /// ID of the [`TestCaseStarted`] attempt.
    pub test_case_started_id: String,

    /// Whether the engine is going to run another attempt.
    #[serde(default)]
    pub will_be_retried: bool,

    /// Time the attempt finished at.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// `hook` envelope, describing a hook defined in the support code.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Engine-assigned ID.
    pub id: String,

    /// Name given to the hook, if any.
    #[serde(default)]
    pub name: Option<String>,

    /// Tag expression restricting the hook.
    #[serde(default)]
    pub tag_expression: Option<String>,

    /// Where the hook is defined.
    #[serde(default)]
    pub source_reference: Option<SourceReference>,

    /// [`HookType`], if the producer reports it.
    #[serde(default, rename = "type")]
    pub kind: Option<HookType>,
}

/// Reference to a place in the support code.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SourceReference {
    /// URI of the file.
    #[serde(default)]
    pub uri: Option<String>,

    /// [`Location`] in the file.
    #[serde(default)]
    pub location: Option<Location>,
}

/// Kind of a [`Hook`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookType {
    /// Before the whole run.
    BeforeTestRun,

    /// After the whole run.
    AfterTestRun,

    /// Before each scenario.
    BeforeTestCase,

    /// After each scenario.
    AfterTestCase,

    /// Before each step.
    BeforeTestStep,

    /// After each step.
    AfterTestStep,
}

impl HookType {
    /// Returns the [`HookScope`] of this [`HookType`].
    #[must_use]
    pub const fn scope(self) -> HookScope {
        match self {
            Self::BeforeTestRun | Self::AfterTestRun => HookScope::Run,
            Self::BeforeTestCase | Self::AfterTestCase => HookScope::Scenario,
            Self::BeforeTestStep | Self::AfterTestStep => HookScope::Step,
        }
    }

    /// Returns a human-readable label of this [`HookType`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BeforeTestRun => "BeforeAll",
            Self::AfterTestRun => "AfterAll",
            Self::BeforeTestCase => "Before",
            Self::AfterTestCase => "After",
            Self::BeforeTestStep => "BeforeStep",
            Self::AfterTestStep => "AfterStep",
        }
    }
}

/// Granularity a [`Hook`] runs at.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookScope {
    /// Once per run.
    #[display("run")]
    Run,

    /// Once per scenario.
    #[display("scenario")]
    Scenario,

    /// Once per step.
    #[display("step")]
    Step,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_step_result_status() {
        let res: TestStepResult = serde_json::from_value(json!({
            "status": "UNDEFINED",
            "duration": {"seconds": 0, "nanos": 1000},
        }))
        .unwrap();

        assert_eq!(res.status, Status::Undefined);
        assert!(res.message.is_none());
    }

    #[test]
    fn decodes_hook_with_type() {
        let hook: Hook = serde_json::from_value(json!({
            "id": "h",
            "type": "AFTER_TEST_STEP",
            "sourceReference": {"uri": "steps.rs", "location": {"line": 4}},
        }))
        .unwrap();

        assert_eq!(hook.kind.map(HookType::scope), Some(HookScope::Step));
        assert_eq!(
            hook.source_reference.and_then(|s| s.location).map(|l| l.line),
            Some(4),
        );
    }

    #[test]
    fn test_case_finished_defaults_to_not_retried() {
        let fin: TestCaseFinished =
            serde_json::from_value(json!({"testCaseStartedId": "a"})).unwrap();

        assert!(!fin.will_be_retried);
    }
}
