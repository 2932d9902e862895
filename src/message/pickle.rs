//! Compiled scenarios as carried by the `pickle` envelope.

use serde::Deserialize;

/// Single concrete instance of a scenario.
///
/// Every `Scenario Outline:` expands into one [`Pickle`] per example row, and
/// [`Background`] steps are already prepended to [`Pickle::steps`].
///
/// [`Background`]: super::Background
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    /// Engine-assigned ID.
    pub id: String,

    /// URI of the [`GherkinDocument`] this [`Pickle`] was compiled from.
    ///
    /// [`GherkinDocument`]: super::GherkinDocument
    #[serde(default)]
    pub uri: String,

    /// Name of the scenario.
    #[serde(default)]
    pub name: String,

    /// Language of the source document.
    #[serde(default)]
    pub language: String,

    /// [`PickleStep`]s in execution order.
    #[serde(default)]
    pub steps: Vec<PickleStep>,

    /// [`PickleTag`]s, inherited ones included.
    #[serde(default)]
    pub tags: Vec<PickleTag>,

    /// AST node IDs this [`Pickle`] originates from: the scenario node first,
    /// followed by the example row node for outlines.
    #[serde(default)]
    pub ast_node_ids: Vec<String>,
}

impl Pickle {
    /// Looks up a [`PickleStep`] by its `id`.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&PickleStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Returns the ID of the scenario AST node this [`Pickle`] was compiled
    /// from.
    #[must_use]
    pub fn ast_root(&self) -> Option<&str> {
        self.ast_node_ids.first().map(String::as_str)
    }

    /// Returns the ID of the example row AST node, if this [`Pickle`] was
    /// compiled from a `Scenario Outline:`.
    #[must_use]
    pub fn example_row(&self) -> Option<&str> {
        self.ast_node_ids.get(1).map(String::as_str)
    }
}

/// Step of a [`Pickle`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    /// Engine-assigned ID.
    pub id: String,

    /// Text with the outline placeholders substituted, lacking a keyword.
    #[serde(default)]
    pub text: String,

    /// [`PickleStepType`], if the producer knows it.
    #[serde(default, rename = "type")]
    pub kind: Option<PickleStepType>,

    /// AST node IDs of the source step (and example row for outlines).
    #[serde(default)]
    pub ast_node_ids: Vec<String>,
}

/// Semantic kind of a [`PickleStep`], derived from its keyword.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum PickleStepType {
    /// Keyword is `*` or unrecognized.
    Unknown,

    /// `Given`.
    Context,

    /// `When`.
    Action,

    /// `Then`.
    Outcome,
}

/// Tag of a [`Pickle`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickleTag {
    /// Name including the leading `@`.
    pub name: String,

    /// AST node ID of the source [`Tag`].
    ///
    /// [`Tag`]: super::Tag
    #[serde(default)]
    pub ast_node_id: String,
}
