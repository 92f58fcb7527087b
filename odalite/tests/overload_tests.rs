//! Overload resolution: aggregated diagnostics, generic unification, and
//! candidate rejection behavior

#[path = "testutils/mod.rs"]
mod testutils;

use odalite::{CompileError, TraceArg, TraceBuilder};
use testutils::{init_logging, people_schema, person_compiler};

fn filter(name: &str, args: Vec<TraceArg>) -> TraceBuilder {
    TraceBuilder::utility("filter").get(name).apply(args)
}

fn prop(name: &str) -> TraceArg {
    TraceArg::sub(TraceBuilder::entity().get(name))
}

#[test]
fn test_exhausted_candidates_report_every_near_miss() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    // An integer property fits neither the Date nor the DateTimeOffset
    // alternative of year().
    let err = compiler
        .compile(filter("year", vec![prop("Age")]))
        .unwrap_err();
    let CompileError::NoMatchingOverload { name, explanations } = err else {
        panic!("expected NoMatchingOverload");
    };
    assert_eq!(name, "year");
    assert!(
        explanations.contains("Edm.Date") && explanations.contains("Edm.DateTimeOffset"),
        "both expanded candidates should be reported:\n{}",
        explanations
    );
    assert!(explanations.contains("not assignable"));
}

#[test]
fn test_arity_mismatch_is_reported_not_thrown_per_candidate() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let err = compiler
        .compile(filter(
            "substring",
            vec![
                prop("Name"),
                TraceArg::value(1),
                TraceArg::value(2),
                TraceArg::value(3),
            ],
        ))
        .unwrap_err();
    let CompileError::NoMatchingOverload { explanations, .. } = err else {
        panic!("expected NoMatchingOverload");
    };
    assert!(explanations.contains("arity mismatch"));
}

#[test]
fn test_incompatible_generic_rebind_fails_candidate_only() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    // Int32 and String cannot share the comparison token.
    let err = compiler
        .compile(filter("eq", vec![prop("Age"), prop("Name")]))
        .unwrap_err();
    let CompileError::NoMatchingOverload { explanations, .. } = err else {
        panic!("expected NoMatchingOverload");
    };
    assert!(
        explanations.contains("generic mismatch"),
        "rejection should name the unification failure:\n{}",
        explanations
    );
}

#[test]
fn test_compatible_rebind_narrows_and_succeeds() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    // Double then Int32: numerically inter-convertible, one candidate wins.
    let fragment = compiler
        .compile(filter("eq", vec![prop("Height"), prop("Age")]))
        .unwrap();
    assert_eq!(fragment.text, "Height eq Age");
}

#[test]
fn test_single_successful_candidate_is_order_independent() {
    init_logging();
    let schema = people_schema();

    // Whichever expanded alternative is attempted first, the one matching
    // the argument type is the one that resolves.
    let mut compiler = person_compiler(&schema);
    let via_date = compiler
        .compile(filter("month", vec![prop("DateOfBirth")]))
        .unwrap();
    assert_eq!(via_date.text, "month(DateOfBirth)");

    let via_offset = compiler
        .compile(filter("month", vec![prop("LastSeen")]))
        .unwrap();
    assert_eq!(via_offset.text, "month(LastSeen)");
}

#[test]
fn test_spread_accepts_growing_arity() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let condition = |value: i64| {
        TraceArg::sub(filter("gt", vec![prop("Age"), TraceArg::value(value)]))
    };
    let fragment = compiler
        .compile(filter("or", vec![condition(1), condition(2), condition(3)]))
        .unwrap();
    assert_eq!(fragment.text, "Age gt 1 or Age gt 2 or Age gt 3");
}

#[test]
fn test_uninvoked_function_reference_is_not_a_value() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    // `tolower` without apply() is an overload set, not a value.
    let unapplied = TraceArg::sub(TraceBuilder::utility("filter").get("tolower"));
    let err = compiler
        .compile(filter("eq", vec![unapplied, TraceArg::value("x")]))
        .unwrap_err();
    let CompileError::NoMatchingOverload { explanations, .. } = err else {
        panic!("expected NoMatchingOverload");
    };
    assert!(explanations.contains("uninvoked function reference"));
}

#[test]
fn test_collection_argument_depth_is_enforced() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    // hassubset wants two collections; a scalar cannot unify with the
    // collection-wrapped token.
    let err = compiler
        .compile(filter("hassubset", vec![prop("Tags"), prop("Name")]))
        .unwrap_err();
    assert!(matches!(err, CompileError::NoMatchingOverload { .. }));
}

#[test]
fn test_collection_arguments_resolve() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let fragment = compiler
        .compile(filter("hassubset", vec![prop("Tags"), prop("Tags")]))
        .unwrap();
    assert_eq!(fragment.text, "hassubset(Tags,Tags)");
}
