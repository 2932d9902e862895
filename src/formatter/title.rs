//! Titles and UIDs of reported entities.

use std::path::Path;

use itertools::Itertools as _;
use lazy_regex::regex_replace_all;

use crate::{
    config::Config,
    event::{Document, resolved::Scenario},
};

/// Suffix of the titles of undefined steps, when they're ignored.
pub const UNDEFINED_SUFFIX: &str = " (undefined step)";

/// Returns the UID of the feature of the given [`Document`]: file name along
/// with the position of the `Feature:` keyword.
#[must_use]
pub fn feature_uid(doc: &Document) -> String {
    let file = Path::new(&doc.uri)
        .file_name()
        .map_or_else(|| doc.uri.clone(), |f| f.to_string_lossy().into_owned());
    let loc = doc.location();
    format!("{file}:{}:{}", loc.line, loc.column_or_first())
}

/// Returns the title of the feature of the given [`Document`].
#[must_use]
pub fn feature_title(doc: &Document, config: &Config) -> String {
    with_tags(doc.name(), doc.tags(), config)
}

/// Returns the title of the given [`Scenario`], with outline placeholders
/// substituted from its example row.
#[must_use]
pub fn scenario_title(
    doc: &Document,
    sc: &Scenario,
    config: &Config,
) -> String {
    let name = match sc.example_row().and_then(|id| doc.ast.example_row(id)) {
        Some((header, row)) => interpolate(&sc.name, |key| {
            header
                .cells
                .iter()
                .zip(&row.cells)
                .find_map(|(h, v)| (h.value == key).then_some(v.value.as_str()))
        }),
        None => sc.name.clone(),
    };
    with_tags(&name, sc.tags.iter().map(String::as_str), config)
}

/// Joins the given titles into a full title.
#[must_use]
pub fn full_title(parent: &str, title: &str) -> String {
    if parent.is_empty() {
        title.to_owned()
    } else {
        format!("{parent}: {title}")
    }
}

/// Substitutes `<placeholder>`s in the given `template` with the values
/// `lookup` finds for them, leaving unknown ones intact.
#[must_use]
pub fn interpolate<'v>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'v str>,
) -> String {
    regex_replace_all!(r"<([^>\s]+)>", template, |whole: &str, key: &str| {
        lookup(key).unwrap_or(whole).to_owned()
    })
    .into_owned()
}

/// Prefixes the given `name` with the comma-joined `tags`, if configured.
fn with_tags<'t>(
    name: &str,
    mut tags: impl Iterator<Item = &'t str>,
    config: &Config,
) -> String {
    if !config.tags_in_title {
        return name.to_owned();
    }
    let tags = tags.join(", ");
    if tags.is_empty() {
        name.to_owned()
    } else {
        format!("{tags}: {name}")
    }
}
