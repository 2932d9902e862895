// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Messages of a generic test-runner reporting contract.

use std::time::Duration;

use serde::Serialize;

/// Reporting message, produced by the [`Formatter`].
///
/// Serializes as `{"event": "test:pass", "payload": {...}}`.
///
/// [`Formatter`]: crate::Formatter
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum Message {
    /// Suite (feature or scenario) started.
    #[serde(rename = "suite:start")]
    SuiteStart(Payload),

    /// Suite (feature or scenario) finished.
    #[serde(rename = "suite:end")]
    SuiteEnd(Payload),

    /// Test (step, or scenario in scenario-level mode) started.
    #[serde(rename = "test:start")]
    TestStart(Payload),

    /// Test passed.
    #[serde(rename = "test:pass")]
    TestPass(Payload),

    /// Test failed.
    #[serde(rename = "test:fail")]
    TestFail(Payload),

    /// Test is pending.
    #[serde(rename = "test:pending")]
    TestPending(Payload),

    /// Test was skipped.
    #[serde(rename = "test:skip")]
    TestSkip(Payload),

    /// Hook finished, either successfully or not.
    #[serde(rename = "hook:end")]
    HookEnd(Payload),
}

impl Message {
    /// Creates a message finishing a test in the given [`State`].
    #[must_use]
    pub fn test_end(state: State, payload: Payload) -> Self {
        let payload = Payload { state: Some(state), ..payload };
        match state {
            State::Pass => Self::TestPass(payload),
            State::Fail => Self::TestFail(payload),
            State::Pending => Self::TestPending(payload),
            State::Skip => Self::TestSkip(payload),
        }
    }

    /// Returns the wire name of this [`Message`], like `test:pass`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SuiteStart(_) => "suite:start",
            Self::SuiteEnd(_) => "suite:end",
            Self::TestStart(_) => "test:start",
            Self::TestPass(_) => "test:pass",
            Self::TestFail(_) => "test:fail",
            Self::TestPending(_) => "test:pending",
            Self::TestSkip(_) => "test:skip",
            Self::HookEnd(_) => "hook:end",
        }
    }

    /// Returns the [`Payload`] of this [`Message`].
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        match self {
            Self::SuiteStart(p)
            | Self::SuiteEnd(p)
            | Self::TestStart(p)
            | Self::TestPass(p)
            | Self::TestFail(p)
            | Self::TestPending(p)
            | Self::TestSkip(p)
            | Self::HookEnd(p) => p,
        }
    }
}

/// Description of a reported entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Unique ID of the entity.
    pub uid: String,

    /// Title of the entity.
    pub title: String,

    /// [`Payload::uid`] of the enclosing entity, absent for features.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// [`Kind`] of the entity.
    #[serde(rename = "type")]
    pub kind: Kind,

    /// URI of the feature file.
    pub file: String,

    /// Tag names.
    pub tags: Vec<String>,

    /// Time taken, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// [`State`] of a finished test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,

    /// Error of a failed entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,

    /// Title prefixed with the titles of all the enclosing entities.
    pub full_title: String,
}

impl Payload {
    /// Sets the [`Payload::duration`] from the given [`Duration`].
    #[must_use]
    pub fn with_duration(self, duration: Duration) -> Self {
        Self {
            duration: Some(
                u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            ),
            ..self
        }
    }

    /// Sets the [`Payload::error`].
    #[must_use]
    pub fn with_error(self, error: Option<ErrorPayload>) -> Self {
        Self { error, ..self }
    }
}

/// Kind of a reported entity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Feature file.
    #[default]
    Feature,

    /// Scenario attempt.
    Scenario,

    /// Scenario step.
    Step,

    /// Hook of a scenario.
    Hook,
}

/// State of a finished test.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Test passed.
    Pass,

    /// Test failed.
    Fail,

    /// Test is pending.
    Pending,

    /// Test was skipped.
    Skip,
}

/// Error of a failed entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Short message.
    pub message: String,

    /// Full message along with a stack trace.
    pub stack: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_adjacently_tagged() {
        let msg = Message::test_end(
            State::Fail,
            Payload {
                uid: "s1".into(),
                title: "Given a step".into(),
                parent: Some("sc".into()),
                kind: Kind::Step,
                file: "a.feature".into(),
                full_title: "F: sc: Given a step".into(),
                ..Payload::default()
            }
            .with_duration(Duration::from_millis(1500))
            .with_error(Some(ErrorPayload {
                message: "boom".into(),
                stack: "boom\n  at x".into(),
            })),
        );

        assert_eq!(msg.name(), "test:fail");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "event": "test:fail",
                "payload": {
                    "uid": "s1",
                    "title": "Given a step",
                    "parent": "sc",
                    "type": "step",
                    "file": "a.feature",
                    "tags": [],
                    "duration": 1500,
                    "state": "fail",
                    "error": {"message": "boom", "stack": "boom\n  at x"},
                    "fullTitle": "F: sc: Given a step",
                },
            }),
        );
    }

    #[test]
    fn omits_absent_fields() {
        let msg = Message::SuiteStart(Payload {
            uid: "a.feature:1:1".into(),
            title: "Login".into(),
            ..Payload::default()
        });

        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["event"], "suite:start");
        assert_eq!(value["payload"]["type"], "feature");
        assert!(value["payload"].get("parent").is_none());
        assert!(value["payload"].get("state").is_none());
        assert_eq!(msg.payload().title, "Login");
    }
}
