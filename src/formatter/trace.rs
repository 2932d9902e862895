//! Source-location traces pointing at Gherkin entities.
//!
//! Undefined steps have no real stack trace, so one is synthesized out of the
//! positions of the feature, scenario and step they were found in.

use std::fmt::Write as _;

use crate::event::{Document, StepRef, resolved::Scenario};

/// Builds a trace of the given `step`, innermost frame last.
#[must_use]
pub fn step_trace(doc: &Document, sc: &Scenario, step: &StepRef) -> String {
    let mut out = scenario_trace(doc, sc);
    let loc = step
        .ast_node_ids
        .first()
        .and_then(|id| doc.ast.step(id))
        .map(|s| s.location)
        .unwrap_or_default();
    _ = writeln!(
        out,
        "\tat Step({}):{}:{}",
        step.text,
        loc.line,
        loc.column_or_first(),
    );
    out
}

/// Builds a trace of the given [`Scenario`], innermost frame last.
#[must_use]
pub fn scenario_trace(doc: &Document, sc: &Scenario) -> String {
    let feature = doc.location();
    let scenario = sc
        .ast_root()
        .and_then(|id| doc.ast.scenario(id))
        .map(|s| s.location)
        .unwrap_or_default();

    let mut out = String::new();
    _ = writeln!(
        out,
        "\tat Feature({}):{}:{}",
        doc.uri,
        feature.line,
        feature.column_or_first(),
    );
    _ = writeln!(
        out,
        "\tat Scenario({}):{}:{}",
        sc.name,
        scenario.line,
        scenario.column_or_first(),
    );
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{message::GherkinDocument, store::ScenarioId};

    #[test]
    fn points_at_source_positions() {
        let doc = Document::new(
            serde_json::from_value::<GherkinDocument>(json!({
                "uri": "features/login.feature",
                "feature": {
                    "location": {"line": 1, "column": 1},
                    "name": "Login",
                    "children": [{"scenario": {
                        "id": "sc",
                        "location": {"line": 3, "column": 3},
                        "name": "Plain",
                        "steps": [{"id": "st", "location": {"line": 4, "column": 5}, "keyword": "Given ", "text": "a step"}]
                    }}]
                }
            }))
            .unwrap(),
        );
        let sc = Scenario {
            id: ScenarioId(0),
            pickle_id: "p".into(),
            test_case_id: "tc".into(),
            attempt: 0,
            uri: doc.uri.clone(),
            name: "Plain".into(),
            tags: vec![],
            rule: None,
            ast_node_ids: vec!["sc".into()],
            steps: vec![],
        };
        let step = StepRef {
            id: "ps".into(),
            test_step_id: "ts".into(),
            keyword: "Given".into(),
            text: "a step".into(),
            ast_node_ids: vec!["st".into()],
        };

        assert_eq!(
            step_trace(&doc, &sc, &step),
            "\tat Feature(features/login.feature):1:1\n\
             \tat Scenario(Plain):3:3\n\
             \tat Step(a step):4:5\n",
        );
    }
}
