// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reporting and failure policy options.

use serde::Deserialize;

/// Options of the [`Formatter`] and the [`Runtime`].
///
/// May be either merged into a CLI as [`clap::Args`] or deserialized from a
/// camelCase configuration object (`{"tagsInTitle": true, ...}`).
///
/// [`Formatter`]: crate::Formatter
/// [`Runtime`]: crate::Runtime
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, clap::Args,
)]
#[group(skip)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Prefix feature and scenario titles with their comma-joined tags.
    #[arg(long)]
    pub tags_in_title: bool,

    /// Report undefined steps as pending instead of failing them.
    #[arg(long)]
    pub ignore_undefined_definitions: bool,

    /// Fail steps matching multiple step definitions instead of reporting
    /// them as pending.
    #[arg(long)]
    pub fail_ambiguous_definitions: bool,

    /// Report scenarios as tests, omitting steps and hooks.
    #[arg(long)]
    pub scenario_level_reporter: bool,

    /// Stop consuming the stream on the first recorded failure.
    #[arg(long)]
    pub fail_fast: bool,
}
