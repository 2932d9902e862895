//! Reconciliation of [`TestCase`] plans against [`Pickle`]s.

use std::sync::Arc;

use crate::{
    error::CorrelationError,
    event::{Document, HookRef, ScenarioStep, StepRef},
    message::{Pickle, TestCase, TestStep},
    store::Store,
};

/// Builds the ordered entries of the given `test_case`, resolving each
/// [`TestStep`] into either a [`StepRef`] of the `pickle` or a [`HookRef`].
///
/// The [`Pickle`] itself is never touched: hooks planned by the engine end up
/// in the returned list only, at the positions the engine planned them.
///
/// A hook unknown to the `store` still yields a placeholder (without a name),
/// as hooks carry no information required for correlation.
///
/// # Errors
///
/// If a [`TestStep`] references neither or both of a pickle step and a hook,
/// or references a pickle step the `pickle` doesn't have.
pub fn reconcile(
    test_case: &TestCase,
    pickle: &Pickle,
    store: &Store,
) -> Result<Vec<ScenarioStep>, CorrelationError> {
    test_case
        .test_steps
        .iter()
        .map(|ts| resolve(ts, pickle, store))
        .collect()
}

fn resolve(
    test_step: &TestStep,
    pickle: &Pickle,
    store: &Store,
) -> Result<ScenarioStep, CorrelationError> {
    match (&test_step.pickle_step_id, &test_step.hook_id) {
        (Some(_), Some(_)) => Err(CorrelationError::AmbiguousTestStep {
            id: test_step.id.clone(),
        }),
        (None, None) => Err(CorrelationError::UnresolvableTestStep {
            id: test_step.id.clone(),
        }),
        (Some(step_id), None) => {
            let step = pickle.step(step_id).ok_or_else(|| {
                CorrelationError::UnknownPickleStep {
                    pickle_id: pickle.id.clone(),
                    id: step_id.clone(),
                }
            })?;
            Ok(ScenarioStep::Step(StepRef {
                id: step.id.clone(),
                test_step_id: test_step.id.clone(),
                keyword: String::new(),
                text: step.text.clone(),
                ast_node_ids: step.ast_node_ids.clone(),
            }))
        }
        (None, Some(hook_id)) => {
            let hook = store.hook(hook_id);
            if hook.is_none() {
                tracing::debug!(
                    hook_id = %hook_id,
                    test_step_id = %test_step.id,
                    "unknown hook, synthesizing an anonymous placeholder",
                );
            }
            let source = hook.and_then(|h| h.source_reference.as_ref());
            Ok(ScenarioStep::Hook(HookRef {
                test_step_id: test_step.id.clone(),
                hook_id: hook_id.clone(),
                name: hook
                    .and_then(|h| h.name.clone())
                    .filter(|n| !n.is_empty()),
                kind: hook.and_then(|h| h.kind),
                source_uri: source.and_then(|s| s.uri.clone()),
                location: source.and_then(|s| s.location),
            }))
        }
    }
}

/// Fills the keywords of the given `steps` from their source steps in the
/// `doc`, as pickles lack them.
///
/// Steps whose source isn't found keep an empty keyword.
pub fn decorate(
    steps: Vec<ScenarioStep>,
    doc: &Document,
) -> Vec<Arc<ScenarioStep>> {
    steps
        .into_iter()
        .map(|step| {
            let step = match step {
                ScenarioStep::Step(mut st) => {
                    if let Some(src) =
                        st.ast_node_ids.first().and_then(|id| doc.ast.step(id))
                    {
                        st.keyword = src.keyword.trim().to_owned();
                    }
                    ScenarioStep::Step(st)
                }
                hook @ ScenarioStep::Hook(_) => hook,
            };
            Arc::new(step)
        })
        .collect()
}

/// Returns the name of the `Rule:` block enclosing the scenario with the given
/// AST node ID, if any.
#[must_use]
pub fn rule_name(doc: &Document, ast_root: Option<&str>) -> Option<String> {
    let rule = doc.ast.rule_of(ast_root?)?;
    Some(rule.name.clone())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::{GherkinDocument, Hook, PickleStep};

    fn pickle() -> Pickle {
        Pickle {
            id: "p".into(),
            uri: "a.feature".into(),
            steps: vec![
                PickleStep {
                    id: "ps-1".into(),
                    text: "a browser".into(),
                    ast_node_ids: vec!["st-1".into()],
                    ..PickleStep::default()
                },
                PickleStep {
                    id: "ps-2".into(),
                    text: "I log in".into(),
                    ast_node_ids: vec!["st-2".into()],
                    ..PickleStep::default()
                },
            ],
            ast_node_ids: vec!["sc".into()],
            ..Pickle::default()
        }
    }

    fn step(id: &str, pickle_step: Option<&str>, hook: Option<&str>) -> TestStep {
        TestStep {
            id: id.into(),
            pickle_step_id: pickle_step.map(Into::into),
            hook_id: hook.map(Into::into),
        }
    }

    #[test]
    fn splices_hooks_in_planned_positions() {
        let mut store = Store::new();
        drop(store.register_hook(Hook {
            id: "h".into(),
            name: Some("open browser".into()),
            ..Hook::default()
        }));
        let tc = TestCase {
            id: "tc".into(),
            pickle_id: "p".into(),
            test_steps: vec![
                step("t1", None, Some("h")),
                step("t2", Some("ps-1"), None),
                step("t3", Some("ps-2"), None),
                step("t4", None, Some("ghost")),
            ],
        };
        let original = pickle();

        let steps = reconcile(&tc, &original, &store).unwrap();

        let ids = steps.iter().map(ScenarioStep::test_step_id).collect::<Vec<_>>();
        assert_eq!(ids, ["t1", "t2", "t3", "t4"]);
        assert_eq!(steps[0].text(), Some("open browser"));
        assert!(steps[3].is_hook());
        assert_eq!(steps[3].text(), None);
        assert_eq!(original, pickle(), "pickle is never mutated");
    }

    #[test]
    fn rejects_steps_resolving_to_neither_or_both() {
        let store = Store::new();
        let tc = |ts| TestCase {
            id: "tc".into(),
            pickle_id: "p".into(),
            test_steps: vec![ts],
        };

        assert_eq!(
            reconcile(&tc(step("t", None, None)), &pickle(), &store),
            Err(CorrelationError::UnresolvableTestStep { id: "t".into() }),
        );
        assert_eq!(
            reconcile(&tc(step("t", Some("ps-1"), Some("h"))), &pickle(), &store),
            Err(CorrelationError::AmbiguousTestStep { id: "t".into() }),
        );
        assert_eq!(
            reconcile(&tc(step("t", Some("nope"), None)), &pickle(), &store),
            Err(CorrelationError::UnknownPickleStep {
                pickle_id: "p".into(),
                id: "nope".into(),
            }),
        );
    }

    #[test]
    fn decorates_keywords_and_finds_rule() {
        let doc = Document::new(
            serde_json::from_value::<GherkinDocument>(json!({
                "uri": "a.feature",
                "feature": {
                    "name": "Login",
                    "children": [{"rule": {
                        "id": "r",
                        "name": "Admins",
                        "children": [
                            {"background": {
                                "id": "bg",
                                "steps": [{"id": "st-1", "keyword": "Given ", "text": "a browser"}]
                            }},
                            {"scenario": {
                                "id": "sc",
                                "steps": [{"id": "st-2", "keyword": "When ", "text": "I log in"}]
                            }}
                        ]
                    }}]
                }
            }))
            .unwrap(),
        );
        let tc = TestCase {
            id: "tc".into(),
            pickle_id: "p".into(),
            test_steps: vec![
                step("t1", Some("ps-1"), None),
                step("t2", Some("ps-2"), None),
            ],
        };
        let steps = reconcile(&tc, &pickle(), &Store::new()).unwrap();

        let titles = decorate(steps, &doc)
            .iter()
            .filter_map(|s| s.as_step().map(StepRef::title))
            .collect::<Vec<_>>();

        assert_eq!(titles, ["Given a browser", "When I log in"]);
        assert_eq!(rule_name(&doc, Some("sc")).as_deref(), Some("Admins"));
        assert_eq!(rule_name(&doc, Some("other")), None);
    }
}
