// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Newline-delimited JSON [`Writer`] implementation.

use std::io;

use crate::{Writer, report::Message};

/// [`Writer`] outputting each [`Message`] as a single JSON line into an
/// [`io::Write`] implementor.
///
/// Output errors don't interrupt the run: the first one is kept and may be
/// inspected via [`Json::error()`], while the rest of the [`Message`]s are
/// dropped.
#[derive(Debug)]
pub struct Json<Out: io::Write> {
    /// [`io::Write`] implementor to output into.
    output: Out,

    /// Number of [`Message`]s written.
    written: usize,

    /// First error happened while writing.
    error: Option<io::Error>,
}

impl<Out: io::Write> Json<Out> {
    /// Creates a new [`Json`] [`Writer`] outputting into the given `output`.
    #[must_use]
    pub const fn new(output: Out) -> Self {
        Self { output, written: 0, error: None }
    }

    /// Returns the number of [`Message`]s written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Returns the first error happened while writing, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Returns the underlying `output`, flushing it first.
    ///
    /// # Errors
    ///
    /// If writing or flushing has failed at any point.
    pub fn into_inner(mut self) -> io::Result<Out> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.output.flush()?;
        Ok(self.output)
    }

    fn write_line(&mut self, msg: &Message) -> io::Result<()> {
        serde_json::to_writer(&mut self.output, msg)?;
        self.output.write_all(b"\n")?;
        self.output.flush()
    }
}

impl<Out: io::Write> Writer for Json<Out> {
    async fn handle_message(&mut self, msg: Message) {
        if self.error.is_some() {
            return;
        }
        match self.write_line(&msg) {
            Ok(()) => self.written += 1,
            Err(e) => {
                tracing::error!(
                    event = msg.name(),
                    error = %e,
                    "failed to write message",
                );
                self.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::report::{Kind, Payload};

    /// [`io::Write`] implementor failing every write.
    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn message(uid: &str) -> Message {
        Message::SuiteStart(Payload {
            uid: uid.into(),
            title: "Login".into(),
            kind: Kind::Feature,
            full_title: "Login".into(),
            ..Payload::default()
        })
    }

    #[test]
    fn writes_one_line_per_message() {
        let mut w = Json::new(Vec::new());

        block_on(async {
            w.handle_message(message("a")).await;
            w.handle_message(message("b")).await;
        });

        assert_eq!(w.written(), 2);
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "suite:start");
        assert_eq!(first["payload"]["uid"], "a");
    }

    #[test]
    fn keeps_first_error() {
        let mut w = Json::new(Broken);

        block_on(w.handle_message(message("a")));
        block_on(w.handle_message(message("b")));

        assert_eq!(w.written(), 0);
        assert_eq!(w.error().map(io::Error::kind), Some(io::ErrorKind::BrokenPipe));
        assert!(w.into_inner().is_err());
    }
}
