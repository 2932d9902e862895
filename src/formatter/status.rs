//! Mapping of engine [`Status`]es into reporting [`State`]s.

use crate::{
    config::Config,
    event::StepResult,
    message::Status,
    report::{ErrorPayload, State},
};

/// Hint appended to the messages of undefined steps.
const IGNORE_HINT: &str =
    "You can ignore this error by setting ignoreUndefinedDefinitions as true.";

/// Classification of a [`StepResult`].
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    /// Reported [`State`].
    pub state: State,

    /// Reported error, if any.
    pub error: Option<ErrorPayload>,

    /// Whether the result counts as a failure of the run.
    pub failure: bool,

    /// Whether the result is an undefined step being ignored.
    pub ignored_undefined: bool,
}

impl Verdict {
    const fn of(state: State) -> Self {
        Self { state, error: None, failure: false, ignored_undefined: false }
    }

    fn failed(error: ErrorPayload) -> Self {
        Self {
            state: State::Fail,
            error: Some(error),
            failure: true,
            ignored_undefined: false,
        }
    }
}

/// Classifies the given `result` according to the `config`.
///
/// `undefined` builds the error of an undefined step out of the hint to
/// append, and is only called if undefined steps aren't ignored.
#[must_use]
pub fn classify(
    result: &StepResult,
    config: &Config,
    undefined: impl FnOnce(&str) -> ErrorPayload,
) -> Verdict {
    match result.status {
        Status::Passed => Verdict::of(State::Pass),
        Status::Skipped => Verdict::of(State::Skip),
        Status::Pending | Status::Unknown => Verdict::of(State::Pending),
        Status::Undefined if config.ignore_undefined_definitions => Verdict {
            ignored_undefined: true,
            ..Verdict::of(State::Pending)
        },
        Status::Undefined => Verdict::failed(undefined(IGNORE_HINT)),
        Status::Ambiguous if config.fail_ambiguous_definitions => {
            Verdict::failed(error_of(result))
        }
        Status::Ambiguous => Verdict::of(State::Pending),
        Status::Failed => Verdict::failed(error_of(result)),
    }
}

/// Builds an [`ErrorPayload`] out of the message of the given `result`: its
/// first line becomes the message, and the whole of it becomes the stack.
#[must_use]
pub fn error_of(result: &StepResult) -> ErrorPayload {
    let full = result
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| result.status.to_string());
    ErrorPayload {
        message: full.lines().next().unwrap_or_default().to_owned(),
        stack: full,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn result(status: Status, message: Option<&str>) -> StepResult {
        StepResult {
            status,
            message: message.map(Into::into),
            duration: Duration::ZERO,
        }
    }

    fn undefined(hint: &str) -> ErrorPayload {
        ErrorPayload { message: hint.into(), stack: hint.into() }
    }

    #[test]
    fn maps_plain_statuses() {
        let config = Config::default();
        let state = |s| classify(&result(s, None), &config, undefined).state;

        assert_eq!(state(Status::Passed), State::Pass);
        assert_eq!(state(Status::Skipped), State::Skip);
        assert_eq!(state(Status::Pending), State::Pending);
        assert_eq!(state(Status::Unknown), State::Pending);
        assert_eq!(state(Status::Ambiguous), State::Pending);
    }

    #[test]
    fn undefined_depends_on_config() {
        let res = result(Status::Undefined, None);

        let strict = classify(&res, &Config::default(), undefined);
        let lenient = classify(
            &res,
            &Config { ignore_undefined_definitions: true, ..Config::default() },
            undefined,
        );

        assert_eq!(strict.state, State::Fail);
        assert!(strict.failure);
        assert!(strict.error.unwrap().message.contains("ignoreUndefinedDefinitions"));
        assert_eq!(lenient.state, State::Pending);
        assert!(!lenient.failure);
        assert!(lenient.ignored_undefined);
    }

    #[test]
    fn ambiguous_fails_when_configured() {
        let res = result(Status::Ambiguous, Some("multiple matches\n  a\n  b"));
        let config =
            Config { fail_ambiguous_definitions: true, ..Config::default() };

        let verdict = classify(&res, &config, undefined);

        assert!(verdict.failure);
        assert_eq!(
            verdict.error,
            Some(ErrorPayload {
                message: "multiple matches".into(),
                stack: "multiple matches\n  a\n  b".into(),
            }),
        );
    }

    #[test]
    fn failure_without_message_uses_status() {
        let verdict =
            classify(&result(Status::Failed, None), &Config::default(), undefined);

        assert_eq!(verdict.error.unwrap().message, "FAILED");
    }
}
