// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for outputting reporting [`Message`]s.

pub mod ndjson;

use std::future::Future;

use crate::report::Message;

#[doc(inline)]
pub use self::ndjson::Json;

/// Sink of reporting [`Message`]s.
///
/// As [`Runtime::finish()`] returns the [`Writer`], it can hold some state
/// inside for inspection after the run.
///
/// [`Runtime::finish()`]: crate::Runtime::finish
pub trait Writer {
    /// Handles the given [`Message`].
    ///
    /// [`Message`]s are handed over in the order they should be emitted in.
    fn handle_message(&mut self, msg: Message) -> impl Future<Output = ()>;
}

/// Collects all the [`Message`]s in memory.
impl Writer for Vec<Message> {
    async fn handle_message(&mut self, msg: Message) {
        self.push(msg);
    }
}
