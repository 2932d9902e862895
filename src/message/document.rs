//! Gherkin AST as carried by the `gherkinDocument` envelope.
//!
//! Every node referenced from a [`Pickle`] has an `id`, which is the only way
//! to recover the structure (enclosing [`Rule`], step keywords, example rows,
//! source locations) lost during pickle compilation.
//!
//! [`Pickle`]: super::Pickle

use serde::Deserialize;

/// Parsed `.feature` file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GherkinDocument {
    /// URI of the parsed file, relative to the working directory.
    #[serde(default)]
    pub uri: Option<String>,

    /// Root [`Feature`], absent for empty files.
    #[serde(default)]
    pub feature: Option<Feature>,

    /// All the comments of the file.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl GherkinDocument {
    /// Iterates over all the [`Scenario`]s of this document, including the
    /// ones nested into [`Rule`]s.
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.feature
            .iter()
            .flat_map(|f| &f.children)
            .flat_map(|child| {
                child.scenario.iter().chain(
                    child
                        .rule
                        .iter()
                        .flat_map(|r| &r.children)
                        .filter_map(|c| c.scenario.as_ref()),
                )
            })
    }

    /// Iterates over all the [`Background`]s of this document, including the
    /// ones nested into [`Rule`]s.
    pub fn backgrounds(&self) -> impl Iterator<Item = &Background> {
        self.feature
            .iter()
            .flat_map(|f| &f.children)
            .flat_map(|child| {
                child.background.iter().chain(
                    child
                        .rule
                        .iter()
                        .flat_map(|r| &r.children)
                        .filter_map(|c| c.background.as_ref()),
                )
            })
    }

    /// Looks up a [`Scenario`] by its AST node `id`.
    #[must_use]
    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios().find(|sc| sc.id == id)
    }

    /// Looks up the [`Rule`] enclosing the [`Scenario`] with the given AST
    /// node `id`.
    #[must_use]
    pub fn rule_of(&self, scenario_id: &str) -> Option<&Rule> {
        self.feature
            .iter()
            .flat_map(|f| &f.children)
            .filter_map(|child| child.rule.as_ref())
            .find(|rule| {
                rule.children
                    .iter()
                    .filter_map(|c| c.scenario.as_ref())
                    .any(|sc| sc.id == scenario_id)
            })
    }

    /// Looks up a [`Step`] by its AST node `id`, either in a [`Scenario`] or
    /// in a [`Background`].
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.scenarios()
            .flat_map(|sc| &sc.steps)
            .chain(self.backgrounds().flat_map(|bg| &bg.steps))
            .find(|st| st.id == id)
    }

    /// Looks up an [`Examples`] table row by its AST node `id`, returning the
    /// header row of its table along.
    #[must_use]
    pub fn example_row(&self, row_id: &str) -> Option<(&TableRow, &TableRow)> {
        self.scenarios().flat_map(|sc| &sc.examples).find_map(|ex| {
            let row = ex.table_body.iter().find(|r| r.id == row_id)?;
            Some((ex.table_header.as_ref()?, row))
        })
    }
}

/// `Feature:` block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// [`Location`] of the `Feature:` keyword.
    #[serde(default)]
    pub location: Location,

    /// [`Tag`]s of this [`Feature`].
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Language of the document.
    #[serde(default)]
    pub language: String,

    /// Keyword in the document's language.
    #[serde(default)]
    pub keyword: String,

    /// Name of this [`Feature`].
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Children in their source order.
    #[serde(default)]
    pub children: Vec<FeatureChild>,
}

/// Child of a [`Feature`]. Exactly one field is populated.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct FeatureChild {
    /// `Rule:` block.
    #[serde(default)]
    pub rule: Option<Rule>,

    /// `Background:` block.
    #[serde(default)]
    pub background: Option<Background>,

    /// `Scenario:` or `Scenario Outline:` block.
    #[serde(default)]
    pub scenario: Option<Scenario>,
}

/// `Rule:` block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the `Rule:` keyword.
    #[serde(default)]
    pub location: Location,

    /// [`Tag`]s of this [`Rule`].
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Keyword in the document's language.
    #[serde(default)]
    pub keyword: String,

    /// Name of this [`Rule`].
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Children in their source order.
    #[serde(default)]
    pub children: Vec<RuleChild>,
}

/// Child of a [`Rule`]. Exactly one field is populated.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RuleChild {
    /// `Background:` block.
    #[serde(default)]
    pub background: Option<Background>,

    /// `Scenario:` or `Scenario Outline:` block.
    #[serde(default)]
    pub scenario: Option<Scenario>,
}

/// `Background:` block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the `Background:` keyword.
    #[serde(default)]
    pub location: Location,

    /// Keyword in the document's language.
    #[serde(default)]
    pub keyword: String,

    /// Name of this [`Background`].
    #[serde(default)]
    pub name: String,

    /// [`Step`]s of this [`Background`].
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// `Scenario:` or `Scenario Outline:` block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the keyword.
    #[serde(default)]
    pub location: Location,

    /// [`Tag`]s of this [`Scenario`].
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Keyword in the document's language.
    #[serde(default)]
    pub keyword: String,

    /// Name of this [`Scenario`], possibly with `<placeholder>`s.
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// [`Step`]s of this [`Scenario`].
    #[serde(default)]
    pub steps: Vec<Step>,

    /// `Examples:` tables of a `Scenario Outline:`.
    #[serde(default)]
    pub examples: Vec<Examples>,
}

/// Single step line.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the keyword.
    #[serde(default)]
    pub location: Location,

    /// Keyword including its trailing whitespace (`"Given "`).
    #[serde(default)]
    pub keyword: String,

    /// Text of this [`Step`] after the keyword.
    #[serde(default)]
    pub text: String,
}

/// `Examples:` table of a `Scenario Outline:`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Examples {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the keyword.
    #[serde(default)]
    pub location: Location,

    /// [`Tag`]s of this table.
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Name of this table.
    #[serde(default)]
    pub name: String,

    /// Header row naming the placeholders.
    #[serde(default)]
    pub table_header: Option<TableRow>,

    /// Value rows, each producing a separate pickle.
    #[serde(default)]
    pub table_body: Vec<TableRow>,
}

/// Row of an [`Examples`] table.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TableRow {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the row.
    #[serde(default)]
    pub location: Location,

    /// Cells in their column order.
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

/// Cell of a [`TableRow`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TableCell {
    /// [`Location`] of the cell.
    #[serde(default)]
    pub location: Location,

    /// Unescaped value.
    #[serde(default)]
    pub value: String,
}

/// `@tag` attached to a node.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Tag {
    /// AST node ID.
    #[serde(default)]
    pub id: String,

    /// [`Location`] of the tag.
    #[serde(default)]
    pub location: Location,

    /// Name including the leading `@`.
    #[serde(default)]
    pub name: String,
}

/// `# comment` line.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Comment {
    /// [`Location`] of the comment.
    #[serde(default)]
    pub location: Location,

    /// Raw text, including the `#`.
    #[serde(default)]
    pub text: String,
}

/// Position in a source file.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,

    /// 1-based column number, if known.
    #[serde(default)]
    pub column: Option<u32>,
}

impl Default for Location {
    fn default() -> Self {
        Self { line: 1, column: None }
    }
}

impl Location {
    /// Returns the column, falling back to the first one.
    #[must_use]
    pub fn column_or_first(&self) -> u32 {
        self.column.unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> GherkinDocument {
        serde_json::from_value(json!({
            "uri": "features/login.feature",
            "feature": {
                "location": {"line": 1, "column": 1},
                "keyword": "Feature",
                "name": "Login",
                "children": [
                    {"background": {
                        "id": "bg",
                        "steps": [{"id": "bg-1", "keyword": "Given ", "text": "a browser"}]
                    }},
                    {"scenario": {
                        "id": "sc-1",
                        "name": "Login as <role>",
                        "steps": [{"id": "st-1", "keyword": "When ", "text": "I log in"}],
                        "examples": [{
                            "id": "ex",
                            "tableHeader": {"id": "hdr", "cells": [{"value": "role"}]},
                            "tableBody": [{"id": "row-1", "cells": [{"value": "admin"}]}]
                        }]
                    }},
                    {"rule": {
                        "id": "rule-1",
                        "name": "Admins",
                        "children": [{"scenario": {
                            "id": "sc-2",
                            "name": "Ruled",
                            "steps": [{"id": "st-2", "keyword": "Then ", "text": "ok"}]
                        }}]
                    }}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn finds_scenarios_including_ruled_ones() {
        let doc = document();

        assert_eq!(doc.scenarios().count(), 2);
        assert_eq!(doc.scenario("sc-2").map(|s| s.name.as_str()), Some("Ruled"));
        assert!(doc.scenario("missing").is_none());
    }

    #[test]
    fn finds_enclosing_rule() {
        let doc = document();

        assert_eq!(doc.rule_of("sc-2").map(|r| r.name.as_str()), Some("Admins"));
        assert!(doc.rule_of("sc-1").is_none());
    }

    #[test]
    fn finds_steps_in_scenarios_and_backgrounds() {
        let doc = document();

        assert_eq!(doc.step("st-2").map(|s| s.keyword.as_str()), Some("Then "));
        assert_eq!(doc.step("bg-1").map(|s| s.text.as_str()), Some("a browser"));
    }

    #[test]
    fn finds_example_row_with_header() {
        let doc = document();

        let (header, row) = doc.example_row("row-1").unwrap();

        assert_eq!(header.cells[0].value, "role");
        assert_eq!(row.cells[0].value, "admin");
    }

    #[test]
    fn location_defaults_to_first_line() {
        let loc = Location::default();

        assert_eq!((loc.line, loc.column_or_first()), (1, 1));
    }
}
