// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [Cucumber Messages] consumed by the [`Listener`].
//!
//! Only the envelopes (and the fields of them) required for correlating an
//! execution are modeled here. Everything else in the protocol is accepted
//! and ignored, so producers of newer schema versions keep working.
//!
//! [Cucumber Messages]: https://github.com/cucumber/messages
//! [`Listener`]: crate::Listener

pub mod document;
pub mod envelope;
pub mod execution;
pub mod pickle;
pub mod time;

use std::io;

#[doc(inline)]
pub use self::{
    document::{
        Background, Comment, Examples, Feature, FeatureChild, GherkinDocument,
        Location, Rule, RuleChild, Scenario, Step, TableCell, TableRow, Tag,
    },
    envelope::{Envelope, RawEnvelope},
    execution::{
        Hook, HookScope, HookType, SourceReference, Status, TestCase,
        TestCaseFinished, TestCaseStarted, TestRunFinished, TestRunStarted,
        TestStep, TestStepFinished, TestStepResult, TestStepStarted,
    },
    pickle::{Pickle, PickleStep, PickleStepType, PickleTag},
    time::{Duration, Timestamp},
};

use crate::Result;

/// Reads [`Envelope`]s from the given newline-delimited JSON `reader`.
///
/// Envelopes of kinds not participating in correlation (`meta`, `source`,
/// `stepDefinition`, `attachment`, etc.) are skipped silently.
///
/// # Errors
///
/// Yields an [`Error::Json`] for input that cannot be decoded. Callers are
/// expected to stop on the first error, as the stream position is lost.
///
/// [`Error::Json`]: crate::Error::Json
pub fn read_ndjson<R: io::Read>(
    reader: R,
) -> impl Iterator<Item = Result<Envelope>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<RawEnvelope>()
        .filter_map(|raw| {
            raw.map_err(Into::into)
                .map(RawEnvelope::into_envelope)
                .transpose()
        })
}
