// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Trace replay: resolves a recorded trace against the schema model into a
//! typed expression tree

use log::debug;

use crate::error::{CompileError, CompileResult};
use crate::expr::tree::{Expr, PropExpr, ReturnType, RootExpr};
use crate::functions::catalog::{self, Catalog, UtilityMember};
use crate::functions::resolver::{self, CallArg};
use crate::functions::signature::FunctionSignatureSet;
use crate::schema::edm;
use crate::schema::types::ResolvedType;
use crate::session::Session;
use crate::trace::{Root, Step, Trace, TraceArg};

/// Build an expression from a recorded trace. With no parent the trace's
/// root symbol is resolved first; with a parent the steps continue from it.
pub fn build(session: &mut Session<'_>, parent: Option<Expr>, trace: &Trace) -> CompileResult<Expr> {
    let mut current = match parent {
        Some(expr) => expr,
        None => build_root(session, &trace.root)?,
    };
    for step in &trace.steps {
        current = build_step(session, current, step)?;
    }
    Ok(current)
}

fn build_root(session: &mut Session<'_>, root: &Root) -> CompileResult<Expr> {
    match root {
        Root::Entity => {
            let scope = session.scope();
            debug!(
                "resolving entity root as {} (alias {:?})",
                scope.entity_type, scope.alias
            );
            Ok(Expr::Root(RootExpr {
                name: "$it".to_string(),
                alias: scope.alias.clone(),
                return_type: ReturnType::Type(scope.entity_type.clone()),
            }))
        }
        Root::Utility(namespace) => {
            if Catalog::global().resolve_namespace(namespace).is_none() {
                return Err(CompileError::UnknownSymbol(namespace.clone()));
            }
            Ok(Expr::Root(RootExpr {
                name: namespace.clone(),
                alias: None,
                return_type: ReturnType::Type(edm::utility(namespace)),
            }))
        }
    }
}

fn build_step(session: &mut Session<'_>, parent: Expr, step: &Step) -> CompileResult<Expr> {
    match step {
        Step::Get(name) => build_get(session, parent, name),
        Step::Apply(args) => build_apply(session, parent, args),
        Step::ApplyNamed(args) => build_apply_named(session, parent, args),
    }
}

fn build_get(session: &mut Session<'_>, parent: Expr, name: &str) -> CompileResult<Expr> {
    let parent_type = match parent.return_type() {
        ReturnType::Type(t) => t.clone(),
        _ => {
            return Err(CompileError::PropertyOfUnknownType {
                property: name.to_string(),
            })
        }
    };

    // Members of a query-utility namespace resolve against the catalog: a
    // nested namespace or an overload set, never a schema property.
    if let Some(path) = edm::utility_path(&parent_type) {
        let return_type = match Catalog::global().resolve_member(path, name) {
            Some(UtilityMember::Namespace(_)) => {
                ReturnType::Type(edm::utility(&format!("{}/{}", path, name)))
            }
            Some(UtilityMember::Functions(set)) => ReturnType::Signatures(set.clone()),
            None => {
                return Err(CompileError::PropertyNotFound {
                    property: name.to_string(),
                    on_type: path.to_string(),
                })
            }
        };
        return Ok(Expr::Prop(PropExpr {
            parent: Box::new(parent),
            name: name.to_string(),
            return_type,
        }));
    }

    if parent_type.is_collection() {
        // Collections navigate through any/all/count, never by direct get.
        return Err(CompileError::PropertyNotFound {
            property: name.to_string(),
            on_type: parent_type.qualified_name(),
        });
    }

    let return_type = match session.schema.lookup(&parent_type)? {
        ResolvedType::Complex(complex) => {
            if let Some(property_type) = session.schema.find_property_type(complex, name) {
                ReturnType::Type(property_type)
            } else {
                let bound = session.schema.find_bound_functions(complex, name);
                if bound.is_empty() {
                    return Err(CompileError::PropertyNotFound {
                        property: name.to_string(),
                        on_type: parent_type.qualified_name(),
                    });
                }
                let namespace = complex.namespace.clone();
                let signatures = bound
                    .into_iter()
                    .map(|def| catalog::from_function_def(def, &namespace, session.schema))
                    .collect();
                ReturnType::Signatures(FunctionSignatureSet::new(name, signatures))
            }
        }
        ResolvedType::Enum(_) | ResolvedType::Primitive => {
            return Err(CompileError::PropertyNotFound {
                property: name.to_string(),
                on_type: parent_type.qualified_name(),
            })
        }
    };

    Ok(Expr::Prop(PropExpr {
        parent: Box::new(parent),
        name: name.to_string(),
        return_type,
    }))
}

fn build_apply(session: &mut Session<'_>, parent: Expr, args: &[TraceArg]) -> CompileResult<Expr> {
    let (set, receiver) = callable_parts(&parent)?;
    let call_args = args
        .iter()
        .map(|arg| build_call_arg(session, arg))
        .collect::<CompileResult<Vec<_>>>()?;
    resolver::resolve_call(session, &set, receiver, call_args)
}

fn build_apply_named(
    session: &mut Session<'_>,
    parent: Expr,
    args: &[(String, TraceArg)],
) -> CompileResult<Expr> {
    let (set, receiver) = callable_parts(&parent)?;
    let named = args
        .iter()
        .map(|(name, arg)| Ok((name.clone(), build_call_arg(session, arg)?)))
        .collect::<CompileResult<Vec<_>>>()?;
    resolver::resolve_named_call(session, &set, receiver, named)
}

/// The overload set an invocation targets, plus the navigation receiver for
/// schema-bound functions. Query-utility members have no receiver: their
/// parent chain is catalog bookkeeping, not a renderable path.
fn callable_parts(parent: &Expr) -> CompileResult<(FunctionSignatureSet, Option<Expr>)> {
    let ReturnType::Signatures(set) = parent.return_type() else {
        return Err(CompileError::NotCallable(parent.describe()));
    };
    let receiver = match parent {
        Expr::Prop(prop) => {
            let grand_type = prop.parent.return_type();
            let is_utility = matches!(
                grand_type,
                ReturnType::Type(t) if edm::utility_path(t).is_some()
            );
            if is_utility {
                None
            } else {
                Some((*prop.parent).clone())
            }
        }
        _ => None,
    };
    Ok((set.clone(), receiver))
}

/// Arguments build standalone: a nested trace resolves from its own root,
/// never from the call's receiver.
fn build_call_arg(session: &mut Session<'_>, arg: &TraceArg) -> CompileResult<CallArg> {
    Ok(match arg {
        TraceArg::Sub(trace) => CallArg::Built(build(session, None, trace)?),
        TraceArg::Expr(expr) => CallArg::Built(expr.clone()),
        TraceArg::Value(value) => CallArg::Built(Expr::constant(value.clone())),
        TraceArg::Pair(inner, direction) => {
            CallArg::Pair(Box::new(build_call_arg(session, inner)?), *direction)
        }
        TraceArg::Lambda(lambda) => CallArg::Lambda(lambda.clone()),
        TraceArg::Map(entries) => {
            let built = entries
                .iter()
                .map(|(name, trace)| Ok((name.clone(), build(session, None, trace)?)))
                .collect::<CompileResult<Vec<_>>>()?;
            CallArg::Map(built)
        }
        TraceArg::Mapper(mapper) => CallArg::Mapper(mapper.clone()),
        TraceArg::Executor(executor) => CallArg::Executor(executor.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::value::Value;
    use crate::trace::TraceBuilder;
    use std::collections::BTreeMap;

    use crate::schema::types::{ComplexType, PropertyDef, SchemaModel, SchemaType, TypeRef};

    fn model() -> SchemaModel {
        let mut model = SchemaModel::new();
        model.insert(SchemaType::Complex(ComplexType {
            name: "Person".to_string(),
            namespace: "My".to_string(),
            base_type: None,
            properties: BTreeMap::from([(
                "Name".to_string(),
                PropertyDef {
                    property_type: TypeRef::named("Edm", "String"),
                    nullable: false,
                    navigation: false,
                },
            )]),
            key_properties: None,
            functions: Vec::new(),
        }));
        model
    }

    #[test]
    fn test_entity_root_resolves_to_ambient_type() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::entity().get("Name").finish();

        let expr = build(&mut session, None, &trace).unwrap();
        assert_eq!(
            expr.return_type(),
            &ReturnType::Type(TypeRef::named("Edm", "String"))
        );
    }

    #[test]
    fn test_unknown_utility_root_fails() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::utility("nope").finish();

        let err = build(&mut session, None, &trace).unwrap_err();
        assert!(matches!(err, CompileError::UnknownSymbol(ns) if ns == "nope"));
    }

    #[test]
    fn test_property_not_found() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::entity().get("Age").finish();

        let err = build(&mut session, None, &trace).unwrap_err();
        assert!(matches!(err, CompileError::PropertyNotFound { .. }));
    }

    #[test]
    fn test_apply_on_non_callable_fails() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::entity()
            .get("Name")
            .apply(vec![TraceArg::Value(Value::Int(1))])
            .finish();

        let err = build(&mut session, None, &trace).unwrap_err();
        assert!(matches!(err, CompileError::NotCallable(_)));
    }

    #[test]
    fn test_utility_member_resolves_to_signature_set() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::utility("filter").get("eq").finish();

        let expr = build(&mut session, None, &trace).unwrap();
        let ReturnType::Signatures(set) = expr.return_type() else {
            panic!("expected an overload set");
        };
        assert_eq!(set.name, "eq");
    }

    #[test]
    fn test_nested_utility_namespace_get() {
        let model = model();
        let mut session = Session::new(&model, TypeRef::named("My", "Person"));
        let trace = TraceBuilder::utility("query").get("filter").get("eq").finish();

        let expr = build(&mut session, None, &trace).unwrap();
        assert!(matches!(expr.return_type(), ReturnType::Signatures(_)));
    }
}
