// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extension of a [`TagOperation`].

use gherkin::tagexpr::TagOperation;
use sealed::sealed;

/// Extension of a [`TagOperation`] allowing to evaluate it against message
/// tags.
///
/// Tags are compared without their leading `@`, as [`gherkin`] strips it
/// while Cucumber Messages keep it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => {
                let t = t.trim_start_matches('@');
                tags.into_iter()
                    .any(|tag| tag.as_ref().trim_start_matches('@') == t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Box<TagOperation> {
        Box::new(TagOperation::Tag(name.into()))
    }

    #[test]
    fn matches_regardless_of_at_sign() {
        let op = TagOperation::Tag("smoke".into());

        assert!(op.eval(["@smoke", "@slow"]));
        assert!(!op.eval(["@slow"]));
    }

    #[test]
    fn evaluates_composite_expressions() {
        let op = TagOperation::And(tag("@smoke"), Box::new(TagOperation::Not(tag("wip"))));

        assert!(op.eval(["@smoke"]));
        assert!(!op.eval(["@smoke", "@wip"]));
        assert!(TagOperation::Or(tag("a"), tag("b")).eval(["@b"]));
    }
}
