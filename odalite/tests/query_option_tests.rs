//! Order-by, expansion, custom query options, and out-of-band parameters

#[path = "testutils/mod.rs"]
mod testutils;

use odalite::trace::Lambda;
use odalite::{CompileError, SortDirection, TraceArg, TraceBuilder, Value};
use testutils::{init_logging, people_schema, person_compiler};

fn filter(name: &str, args: Vec<TraceArg>) -> TraceBuilder {
    TraceBuilder::utility("filter").get(name).apply(args)
}

fn prop(name: &str) -> TraceArg {
    TraceArg::sub(TraceBuilder::entity().get(name))
}

#[test]
fn test_orderby_flattens_direction_pairs() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let trace = TraceBuilder::utility("orderby").get("orderby").apply(vec![
        prop("Name"),
        TraceArg::pair(prop("Age"), SortDirection::Descending),
        TraceArg::pair(prop("Height"), SortDirection::Ascending),
    ]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "Name,Age desc,Height asc");
}

#[test]
fn test_expand_renders_navigation_path() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let trace = TraceBuilder::utility("expand")
        .get("expand")
        .apply(vec![prop("Pets")]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "Pets");
}

#[test]
fn test_expand_count_inserts_count_segment() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let trace = TraceBuilder::utility("expand")
        .get("expandcount")
        .apply(vec![prop("Pets")]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "Pets/$count");
}

#[test]
fn test_expand_with_nested_filter() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let nested = Lambda::new(|pet| {
        TraceArg::sub(TraceBuilder::utility("filter").get("gt").apply(vec![
            TraceArg::sub(pet.get("Age")),
            TraceArg::value(2),
        ]))
    });
    let trace = TraceBuilder::utility("expand")
        .get("expandand")
        .apply(vec![prop("Pets"), TraceArg::Lambda(nested)]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "Pets($filter=Age gt 2)");
}

#[test]
fn test_custom_query_option_pair() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let trace = TraceBuilder::utility("custom").get("custom").apply(vec![
        TraceArg::value("$format"),
        TraceArg::value("json"),
    ]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "$format=json");
}

#[test]
fn test_nested_namespace_reaches_same_members() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let trace = TraceBuilder::utility("query")
        .get("filter")
        .get("eq")
        .apply(vec![prop("Age"), TraceArg::value(1)]);
    let fragment = compiler.compile(trace).unwrap();
    assert_eq!(fragment.text, "Age eq 1");
}

#[test]
fn test_named_constant_parameter_binds_out_of_band() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let param = compiler.param_const("who", "Ann");
    let fragment = compiler
        .compile(filter("eq", vec![prop("Name"), TraceArg::Expr(param)]))
        .unwrap();

    assert_eq!(fragment.text, "Name eq @who");
    assert_eq!(fragment.params.len(), 1);
    assert_eq!(fragment.params[0].name, "who");
    assert_eq!(fragment.params[0].serialized_value, "'Ann'");
}

#[test]
fn test_identical_parameters_dedupe_silently() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let lower = filter(
        "ge",
        vec![prop("Age"), TraceArg::Expr(compiler.param_const("x", 1))],
    );
    let upper = filter(
        "le",
        vec![prop("Age"), TraceArg::Expr(compiler.param_const("x", 1))],
    );
    let fragment = compiler
        .compile(filter("and", vec![TraceArg::sub(lower), TraceArg::sub(upper)]))
        .unwrap();

    assert_eq!(fragment.text, "Age ge @x and Age le @x");
    assert_eq!(fragment.params.len(), 1);
}

#[test]
fn test_conflicting_parameter_values_are_rejected() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let lower = filter(
        "ge",
        vec![prop("Age"), TraceArg::Expr(compiler.param_const("x", 1))],
    );
    let upper = filter(
        "le",
        vec![prop("Age"), TraceArg::Expr(compiler.param_const("x", 2))],
    );
    let err = compiler
        .compile(filter("and", vec![TraceArg::sub(lower), TraceArg::sub(upper)]))
        .unwrap_err();
    assert!(matches!(err, CompileError::DuplicateParameterName(name) if name == "x"));
}

#[test]
fn test_raw_parameter_value_is_verbatim() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let param = compiler.param_raw("frag", "year(DateOfBirth)");
    let fragment = compiler
        .compile(filter("eq", vec![TraceArg::Expr(param), TraceArg::value(1999)]))
        .unwrap();

    assert_eq!(fragment.text, "@frag eq 1999");
    assert_eq!(fragment.params[0].serialized_value, "year(DateOfBirth)");
}

#[test]
fn test_reference_parameter_binds_a_path() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let param = compiler.param_ref("target", TraceBuilder::entity().get("Height")).unwrap();
    let fragment = compiler
        .compile(filter("lt", vec![prop("Age"), TraceArg::Expr(param)]))
        .unwrap();

    assert_eq!(fragment.text, "Age lt @target");
    assert_eq!(fragment.params[0].serialized_value, "Height");
}

#[test]
fn test_constant_list_parameter() {
    init_logging();
    let schema = people_schema();
    let mut compiler = person_compiler(&schema);

    let options = Value::List(vec![Value::from("a"), Value::from("b")]);
    let param = compiler.param_const("names", options);
    let fragment = compiler
        .compile(filter("in", vec![prop("Name"), TraceArg::Expr(param)]))
        .unwrap();

    assert_eq!(fragment.text, "Name in @names");
    assert_eq!(fragment.params[0].serialized_value, "('a','b')");
}
