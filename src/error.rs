// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types of this crate.
//!
//! [`CorrelationError`]s never escape the [`Listener`]: a streaming producer
//! can't be asked for redelivery, so unresolvable envelopes are logged and
//! dropped instead.
//!
//! [`Listener`]: crate::Listener

use std::io;

use derive_more::{Display, Error, From};

/// Failure to resolve an engine-assigned ID referenced by an envelope.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum CorrelationError {
    /// No `gherkinDocument` with the given URI was received.
    #[display("unknown document `{uri}`")]
    UnknownDocument {
        /// URI of the missing document.
        uri: String,
    },

    /// No `pickle` with the given ID was received.
    #[display("unknown pickle `{id}`")]
    UnknownPickle {
        /// ID of the missing pickle.
        id: String,
    },

    /// Referenced step is not part of its pickle.
    #[display("unknown pickle step `{id}` in pickle `{pickle_id}`")]
    UnknownPickleStep {
        /// ID of the pickle.
        pickle_id: String,

        /// ID of the missing pickle step.
        id: String,
    },

    /// No `testCase` with the given ID was received.
    #[display("unknown test case `{id}`")]
    UnknownTestCase {
        /// ID of the missing test case.
        id: String,
    },

    /// No `testCaseStarted` with the given ID was received, or it is not the
    /// current attempt.
    #[display("unknown test case attempt `{id}`")]
    UnknownAttempt {
        /// ID of the missing attempt.
        id: String,
    },

    /// Referenced test step is not part of its test case.
    #[display("unknown test step `{id}` in test case `{test_case_id}`")]
    UnknownTestStep {
        /// ID of the test case.
        test_case_id: String,

        /// ID of the missing test step.
        id: String,
    },

    /// Test step references neither a pickle step nor a hook.
    #[display("test step `{id}` references neither a pickle step nor a hook")]
    UnresolvableTestStep {
        /// ID of the test step.
        id: String,
    },

    /// Test step references both a pickle step and a hook.
    #[display("test step `{id}` references both a pickle step and a hook")]
    AmbiguousTestStep {
        /// ID of the test step.
        id: String,
    },
}

/// Top-level error of this crate.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Envelope couldn't be decoded.
    #[display("Failed to decode message envelope: {_0}")]
    Json(serde_json::Error),

    /// I/O operation failed.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),

    /// Envelope couldn't be correlated.
    #[display("Correlation failed: {_0}")]
    Correlation(CorrelationError),
}

/// [`Result`](std::result::Result) alias with [`Error`] as a default.
pub type Result<T, E = Error> = std::result::Result<T, E>;
