// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Built-in function signature catalog
//!
//! Query-utility namespaces expose the OData v4 operators and canonical
//! functions as overload sets. The whole catalog is assembled once and
//! consulted read-only for the lifetime of the process; per-session state
//! (aliases, parameters, warnings) never lives here.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::functions::signature::{
    generic_t, Arg, CallStyle, Executable, ExecutableBlock, FunctionSignature,
    FunctionSignatureSet, RewriteKind,
};
use crate::schema::edm;
use crate::schema::types::{FunctionDef, SchemaModel, TypeRef};

/// A member of a query-utility namespace: either a nested namespace or an
/// overload set
#[derive(Debug, Clone)]
pub enum UtilityMember {
    Namespace(UtilityNamespace),
    Functions(FunctionSignatureSet),
}

/// A named group of callable members, e.g. `filter` or `orderby`
#[derive(Debug, Clone)]
pub struct UtilityNamespace {
    pub name: String,
    pub members: BTreeMap<String, UtilityMember>,
}

impl UtilityNamespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: BTreeMap::new(),
        }
    }

    fn register(&mut self, signature: FunctionSignature) {
        let name = signature.name.clone();
        if let Some(UtilityMember::Functions(set)) = self.members.get_mut(&name) {
            set.signatures.push(signature);
            return;
        }
        self.members.insert(
            name.clone(),
            UtilityMember::Functions(FunctionSignatureSet::new(&name, vec![signature])),
        );
    }

    fn register_namespace(&mut self, namespace: UtilityNamespace) {
        self.members.insert(
            namespace.name.clone(),
            UtilityMember::Namespace(namespace),
        );
    }
}

/// The catalog of query-utility namespaces
#[derive(Debug, Clone)]
pub struct Catalog {
    pub roots: BTreeMap<String, UtilityNamespace>,
}

impl Catalog {
    /// Resolve a slash-joined path (`filter`, `query/filter`, ...) to a
    /// namespace
    pub fn resolve_namespace(&self, path: &str) -> Option<&UtilityNamespace> {
        let mut segments = path.split('/');
        let mut current = self.roots.get(segments.next()?)?;
        for segment in segments {
            match current.members.get(segment)? {
                UtilityMember::Namespace(ns) => current = ns,
                UtilityMember::Functions(_) => return None,
            }
        }
        Some(current)
    }

    /// Look up a member of the namespace a path points at
    pub fn resolve_member(&self, path: &str, name: &str) -> Option<&UtilityMember> {
        self.resolve_namespace(path)?.members.get(name)
    }

    pub fn global() -> &'static Catalog {
        &CATALOG
    }
}

static CATALOG: Lazy<Catalog> = Lazy::new(build_catalog);

fn build_catalog() -> Catalog {
    let filter = build_filter_namespace();
    let orderby = build_orderby_namespace();
    let expand = build_expand_namespace();
    let custom = build_custom_namespace();

    // The umbrella namespace nests the four groups so a single utility root
    // can reach all of them.
    let mut query = UtilityNamespace::new("query");
    query.register_namespace(filter.clone());
    query.register_namespace(orderby.clone());
    query.register_namespace(expand.clone());
    query.register_namespace(custom.clone());

    let mut roots = BTreeMap::new();
    for ns in [filter, orderby, expand, custom, query] {
        roots.insert(ns.name.clone(), ns);
    }
    Catalog { roots }
}

/// Comparison signature with an optional trailing literal mapper
fn comparison(name: &str, operator: &str) -> FunctionSignature {
    FunctionSignature::infix(
        name,
        operator,
        vec![
            Arg::normal("lhs", generic_t()),
            Arg::normal("rhs", generic_t()),
            Arg::rewrite_optional("map", RewriteKind::Mapper),
        ],
        edm::boolean(),
    )
}

fn arithmetic(name: &str, operator: &str) -> FunctionSignature {
    FunctionSignature::infix(
        name,
        operator,
        vec![
            Arg::normal("lhs", edm::number()),
            Arg::normal("rhs", edm::number()),
        ],
        edm::number(),
    )
}

fn build_filter_namespace() -> UtilityNamespace {
    let mut ns = UtilityNamespace::new("filter");

    // Logical operators
    ns.register(FunctionSignature::infix(
        "and",
        " and ",
        vec![Arg::spread("conditions", edm::boolean())],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::infix(
        "or",
        " or ",
        vec![Arg::spread("conditions", edm::boolean())],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "not",
        vec![Arg::normal("condition", edm::boolean())],
        edm::boolean(),
    ));

    // Comparison operators
    ns.register(comparison("eq", " eq "));
    ns.register(comparison("ne", " ne "));
    ns.register(comparison("gt", " gt "));
    ns.register(comparison("ge", " ge "));
    ns.register(comparison("lt", " lt "));
    ns.register(comparison("le", " le "));
    ns.register(FunctionSignature::infix(
        "has",
        " has ",
        vec![
            Arg::normal("lhs", generic_t()),
            Arg::normal("flag", generic_t()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::infix(
        "in",
        " in ",
        vec![
            Arg::normal("lhs", generic_t()),
            Arg::normal("options", TypeRef::collection(generic_t())),
        ],
        edm::boolean(),
    ));

    // Arithmetic operators
    ns.register(arithmetic("add", " add "));
    ns.register(arithmetic("sub", " sub "));
    ns.register(arithmetic("mul", " mul "));
    ns.register(arithmetic("div", " div "));
    ns.register(arithmetic("mod", " mod "));

    // Canonical string functions
    ns.register(FunctionSignature::function(
        "contains",
        vec![
            Arg::normal("haystack", edm::string()),
            Arg::normal("needle", edm::string()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "startswith",
        vec![
            Arg::normal("haystack", edm::string()),
            Arg::normal("prefix", edm::string()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "endswith",
        vec![
            Arg::normal("haystack", edm::string()),
            Arg::normal("suffix", edm::string()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "matchespattern",
        vec![
            Arg::normal("value", edm::string()),
            Arg::normal("pattern", edm::string()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "tolower",
        vec![Arg::normal("value", edm::string())],
        edm::string(),
    ));
    ns.register(FunctionSignature::function(
        "toupper",
        vec![Arg::normal("value", edm::string())],
        edm::string(),
    ));
    ns.register(FunctionSignature::function(
        "trim",
        vec![Arg::normal("value", edm::string())],
        edm::string(),
    ));
    ns.register(FunctionSignature::function(
        "concat",
        vec![
            Arg::normal("lhs", edm::string()),
            Arg::normal("rhs", edm::string()),
        ],
        edm::string(),
    ));
    ns.register(FunctionSignature::function(
        "indexof",
        vec![
            Arg::normal("haystack", edm::string()),
            Arg::normal("needle", edm::string()),
        ],
        edm::int32(),
    ));
    ns.register(FunctionSignature::function(
        "length",
        vec![Arg::normal("value", edm::string())],
        edm::int32(),
    ));
    ns.register(FunctionSignature::function(
        "substring",
        vec![
            Arg::normal("value", edm::string()),
            Arg::normal("start", edm::int32()),
            Arg::optional("length", edm::int32()),
        ],
        edm::string(),
    ));

    // Collection predicates and functions
    ns.register(FunctionSignature::function(
        "any",
        vec![
            Arg::normal("source", TypeRef::collection(generic_t())),
            Arg::rewrite("predicate", RewriteKind::LogicalCollectionOp),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "all",
        vec![
            Arg::normal("source", TypeRef::collection(generic_t())),
            Arg::rewrite("predicate", RewriteKind::LogicalCollectionOp),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::infix(
        "count",
        "",
        vec![Arg::rewrite("source", RewriteKind::ExpandCount)],
        edm::int64(),
    ));
    ns.register(FunctionSignature::function(
        "hassubset",
        vec![
            Arg::normal("lhs", TypeRef::collection(generic_t())),
            Arg::normal("rhs", TypeRef::collection(generic_t())),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "hassubsequence",
        vec![
            Arg::normal("lhs", TypeRef::collection(generic_t())),
            Arg::normal("rhs", TypeRef::collection(generic_t())),
        ],
        edm::boolean(),
    ));

    // Canonical temporal functions
    for name in ["year", "month", "day"] {
        ns.register(FunctionSignature::function(
            name,
            vec![Arg::normal_sum(
                "value",
                vec![edm::date(), edm::date_time_offset()],
            )],
            edm::int32(),
        ));
    }
    for name in ["hour", "minute", "second"] {
        ns.register(FunctionSignature::function(
            name,
            vec![Arg::normal_sum(
                "value",
                vec![edm::time_of_day(), edm::date_time_offset()],
            )],
            edm::int32(),
        ));
    }
    ns.register(FunctionSignature::function(
        "fractionalseconds",
        vec![Arg::normal_sum(
            "value",
            vec![edm::time_of_day(), edm::date_time_offset()],
        )],
        edm::decimal(),
    ));
    ns.register(FunctionSignature::function(
        "date",
        vec![Arg::normal("value", edm::date_time_offset())],
        edm::date(),
    ));
    ns.register(FunctionSignature::function(
        "time",
        vec![Arg::normal("value", edm::date_time_offset())],
        edm::time_of_day(),
    ));
    ns.register(FunctionSignature::function(
        "totaloffsetminutes",
        vec![Arg::normal("value", edm::date_time_offset())],
        edm::int32(),
    ));
    ns.register(FunctionSignature::function(
        "totalseconds",
        vec![Arg::normal("value", edm::duration())],
        edm::decimal(),
    ));
    ns.register(FunctionSignature::function("now", vec![], edm::date_time_offset()));
    ns.register(FunctionSignature::function(
        "mindatetime",
        vec![],
        edm::date_time_offset(),
    ));
    ns.register(FunctionSignature::function(
        "maxdatetime",
        vec![],
        edm::date_time_offset(),
    ));

    // Canonical math functions
    for name in ["ceiling", "floor", "round"] {
        ns.register(FunctionSignature::function(
            name,
            vec![Arg::normal("value", edm::number())],
            edm::number(),
        ));
    }

    // Type functions
    ns.register(FunctionSignature::function(
        "isof",
        vec![
            Arg::normal("target", generic_t()),
            Arg::normal("type", edm::string()),
        ],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::function(
        "cast",
        vec![
            Arg::normal("target", generic_t()),
            Arg::normal("type", edm::string()),
        ],
        edm::unknown(),
    ));

    // Raw escapes
    ns.register(FunctionSignature::infix(
        "filterraw",
        "",
        vec![Arg::rewrite("fragment", RewriteKind::FilterRawExecutor)],
        edm::boolean(),
    ));
    ns.register(FunctionSignature::infix(
        "filterraw",
        "",
        vec![
            Arg::rewrite("props", RewriteKind::FilterRawProps),
            Arg::rewrite("executor", RewriteKind::FilterRawExecutor),
        ],
        edm::boolean(),
    ));

    ns
}

fn build_orderby_namespace() -> UtilityNamespace {
    let mut ns = UtilityNamespace::new("orderby");
    ns.register(FunctionSignature::infix(
        "orderby",
        ",",
        vec![Arg::Rewrite {
            name: "terms".to_string(),
            kind: RewriteKind::OrderBy,
            modifier: crate::functions::signature::ArgModifier::Spread,
            type_hint: None,
        }],
        edm::unknown(),
    ));
    ns
}

fn build_expand_namespace() -> UtilityNamespace {
    let mut ns = UtilityNamespace::new("expand");
    ns.register(FunctionSignature::infix(
        "expand",
        "",
        vec![Arg::normal("nav", generic_t())],
        edm::unknown(),
    ));
    ns.register(FunctionSignature::infix(
        "expandcount",
        "",
        vec![Arg::rewrite("nav", RewriteKind::ExpandCount)],
        edm::unknown(),
    ));
    ns.register(FunctionSignature::infix(
        "expandand",
        "",
        vec![
            Arg::normal("nav", TypeRef::collection(generic_t())),
            Arg::rewrite("filter", RewriteKind::ExpandAnd),
        ],
        edm::unknown(),
    ));
    ns
}

fn build_custom_namespace() -> UtilityNamespace {
    let mut ns = UtilityNamespace::new("custom");
    ns.register(FunctionSignature::infix(
        "custom",
        "=",
        vec![
            Arg::normal("name", edm::string()),
            Arg::rewrite("value", RewriteKind::CustomQueryArg),
        ],
        edm::unknown(),
    ));
    ns
}

/// Convert a schema-declared function into a named-argument call signature.
/// Complex-typed non-binding parameters cannot render as URL literals, so
/// such signatures are marked non-executable with one reason per offending
/// argument; callers route those values through `@name` parameters instead.
pub fn from_function_def(
    def: &FunctionDef,
    namespace: &str,
    schema: &SchemaModel,
) -> FunctionSignature {
    let qualified = format!("{}.{}", namespace, def.name);
    let mut blocks = Vec::new();
    let mut args = Vec::new();
    for param in def.non_binding_params() {
        if schema.lookup_complex(&param.param_type).is_some() {
            blocks.push(ExecutableBlock {
                reason: "complex-typed argument cannot render as a URL literal".to_string(),
                arg_name: param.name.clone(),
            });
        }
        args.push(Arg::normal(&param.name, param.param_type.clone()));
    }
    FunctionSignature {
        name: qualified.clone(),
        input_args: args,
        output_type: def.return_type.clone(),
        call_style: CallStyle::Function {
            name: qualified,
            separator: ",".to_string(),
        },
        executable: if blocks.is_empty() {
            Executable::Yes
        } else {
            Executable::No(blocks)
        },
        derived_from: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_members_registered() {
        let catalog = Catalog::global();
        let filter = catalog.resolve_namespace("filter").unwrap();

        for name in ["eq", "and", "any", "substring", "year", "filterraw"] {
            assert!(
                filter.members.contains_key(name),
                "'{}' should be registered",
                name
            );
        }
    }

    #[test]
    fn test_filterraw_has_two_overloads() {
        let catalog = Catalog::global();
        let Some(UtilityMember::Functions(set)) = catalog.resolve_member("filter", "filterraw")
        else {
            panic!("filterraw should be an overload set");
        };
        assert_eq!(set.signatures.len(), 2);
    }

    #[test]
    fn test_nested_namespace_resolution() {
        let catalog = Catalog::global();
        assert!(catalog.resolve_namespace("query/filter").is_some());
        assert!(catalog.resolve_member("query/filter", "eq").is_some());
        assert!(catalog.resolve_namespace("query/nope").is_none());
    }
}
