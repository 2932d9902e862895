// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(nonstandard_style, rustdoc::all, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::if_then_some_else_none,
    clippy::missing_const_for_fn,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::str_to_string,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::use_debug,
    future_incompatible,
    let_underscore_drop,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_import_braces
)]
// Tests rely on `unwrap()` for brevity.
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::as_conversions)
)]

pub mod config;
pub mod error;
pub mod event;
pub mod formatter;
pub mod hooks;
pub mod listener;
pub mod message;
pub mod report;
pub mod runtime;
pub mod store;
pub mod tag;
pub mod writer;

// Re-exported as `gherkin::tagexpr::TagOperation` is a part of the public API
// of `Hooks`.
pub use gherkin;

#[doc(inline)]
pub use self::{
    config::Config,
    error::{CorrelationError, Error, Result},
    event::{Event, Lifecycle},
    formatter::{Formatter, Stats},
    hooks::{Dispatcher, HookFailure, HookKind, Hooks},
    listener::Listener,
    message::{Envelope, read_ndjson},
    report::Message,
    runtime::{RunSummary, Runtime},
    store::Store,
    writer::Writer,
};
