// crates/ade-core/src/expr/tests.rs
// ============================================================================
// Module: Expression Evaluator Tests
// Description: Unit tests for the formula lexer, parser, and walker.
// ============================================================================
//! Parser and evaluation behavior for the restricted formula sublanguage.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only panic-based assertions and exact float checks are permitted."
)]

use std::collections::BTreeMap;

use serde_json::Value;
use serde_json::json;

use super::EvalOptions;
use super::EvalScope;
use super::EvalValue;
use super::ExprError;
use super::Formula;
use super::eval_bool;
use super::eval_number;
use crate::core::action::ActionCandidate;

/// Builds a signals map from JSON pairs.
fn signals(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

#[test]
fn literal_arithmetic_with_parentheses() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("(1 + 2) * 3", &scope, &options, 0.0), 9.0);
    assert_eq!(eval_number("10 - 2 * 3", &scope, &options, 0.0), 4.0);
}

#[test]
fn division_by_zero_yields_zero() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("5 / 0", &scope, &options, -1.0), 0.0);
}

#[test]
fn signal_path_reads_resolve() {
    let map = signals(&[("interactions_7d", json!(5))]);
    let scope = EvalScope {
        signals: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("signals.interactions_7d / 10", &scope, &options, 0.0), 0.5);
}

#[test]
fn missing_state_field_uses_scoring_sentinel() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("state.core.engagement_score", &scope, &options, 0.0), 0.5);
}

#[test]
fn missing_path_is_false_for_guardrails() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_guardrail();
    assert!(!eval_bool("signals.notifications_sent_24h >= 3", &scope, &options));
}

#[test]
fn flat_boolean_precedence_or_splits_first() {
    let map = signals(&[("a", json!(1)), ("b", json!(0))]);
    let scope = EvalScope {
        signals: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_guardrail();
    // (a == 1 && b == 1) || (a == 1) — the OR split must win.
    assert!(eval_bool("signals.a == 1 && signals.b == 1 || signals.a == 1", &scope, &options));
}

#[test]
fn comparison_against_string_literal() {
    let mut action = ActionCandidate::new("workout-a", "workout");
    action.attributes.insert("intensity".to_string(), json!("high"));
    let scope = EvalScope {
        action: Some(&action),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_guardrail();
    assert!(eval_bool("action.attributes.intensity == 'high'", &scope, &options));
    assert!(!eval_bool("action.attributes.intensity == 'low'", &scope, &options));
}

#[test]
fn if_else_selects_branch_by_truthiness() {
    let map = signals(&[("relevance", json!(0.9))]);
    let scope = EvalScope {
        signals: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_scoring();
    assert_eq!(
        eval_number("if_else(signals.relevance > 0.5, 1, 0)", &scope, &options, -1.0),
        1.0
    );
}

#[test]
fn coalesce_bypasses_the_missing_sentinel() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    // Without coalesce the scoring sentinel (0.5) would apply.
    assert_eq!(eval_number("coalesce(signals.absent, 0.25)", &scope, &options, 0.0), 0.25);
}

#[test]
fn clamp_bounds_its_operand() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("clamp(5, 0, 1)", &scope, &options, 0.0), 1.0);
    assert_eq!(eval_number("clamp(-2, 0, 1)", &scope, &options, 0.0), 0.0);
    assert_eq!(eval_number("clamp(0.4, 0, 1)", &scope, &options, 0.0), 0.4);
}

#[test]
fn invalid_formula_yields_fallback_number() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("1 + + 2 )", &scope, &options, 0.75), 0.75);
}

#[test]
fn invalid_formula_yields_false_for_guardrails() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_guardrail();
    assert!(!eval_bool("&& nonsense ||", &scope, &options));
}

#[test]
fn unknown_function_is_a_parse_error() {
    let err = Formula::parse("evaluate(1, 2)").unwrap_err();
    assert!(matches!(err, ExprError::UnknownFunction(name) if name == "evaluate"));
}

#[test]
fn wrong_arity_is_a_parse_error() {
    let err = Formula::parse("clamp(1, 2)").unwrap_err();
    assert!(matches!(
        err,
        ExprError::Arity {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}

#[test]
fn unterminated_string_is_a_lex_error() {
    let err = Formula::parse("signals.x == 'oops").unwrap_err();
    assert!(matches!(err, ExprError::UnterminatedString(_)));
}

#[test]
fn memory_paths_read_namespaced_keys() {
    let map = signals(&[("learned.tone", json!("friendly"))]);
    let scope = EvalScope {
        memory: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_guardrail();
    assert!(eval_bool("memory.learned.tone == 'friendly'", &scope, &options));
}

#[test]
fn evaluation_is_deterministic_across_calls() {
    let map = signals(&[("x", json!(3))]);
    let scope = EvalScope {
        signals: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_scoring();
    let formula = Formula::parse("signals.x * 2 + 1").unwrap();
    let first = formula.evaluate(&scope, &options);
    let second = formula.evaluate(&scope, &options);
    assert_eq!(first, second);
    assert_eq!(first, EvalValue::Number(7.0));
}

#[test]
fn boolean_literals_compare_to_paths() {
    let map = signals(&[("enabled", json!(true))]);
    let scope = EvalScope {
        context: Some(&map),
        ..EvalScope::default()
    };
    let options = EvalOptions::for_guardrail();
    assert!(eval_bool("context.enabled == true", &scope, &options));
    assert!(!eval_bool("context.enabled != true", &scope, &options));
}

#[test]
fn negative_numbers_parse_in_arithmetic() {
    let scope = EvalScope::default();
    let options = EvalOptions::for_scoring();
    assert_eq!(eval_number("-3 + 5", &scope, &options, 0.0), 2.0);
    assert_eq!(eval_number("2 * -2", &scope, &options, 0.0), -4.0);
}
