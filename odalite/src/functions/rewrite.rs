// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Rewrite-argument pipeline
//!
//! A winning signature with rewrite arguments is not final: the pipeline
//! processes the first rewrite argument by position and either replaces the
//! call with a simplified one (looping back into ordinary resolution) or
//! emits a terminal expression. Every rule fails loudly when its structural
//! precondition is unmet; those are authoring contract violations.

use log::debug;

use crate::error::{CompileError, CompileResult};
use crate::expr::builder;
use crate::expr::tree::{
    Expr, NamedQueryExpr, PropExpr, ReturnType, StringBuilderExpr, StringPart,
};
use crate::functions::resolver::CallArg;
use crate::functions::signature::{Arg, FunctionSignature, FunctionSignatureSet, RewriteKind};
use crate::schema::assignable::is_assignable_single;
use crate::schema::edm;
use crate::schema::types::TypeRef;
use crate::serialize::value::Value;
use crate::serialize::writer;
use crate::session::Session;
use crate::trace::TraceArg;

/// What the pipeline did with the call
pub(crate) enum RewriteOutcome {
    /// The call was replaced by a wholly different terminal expression
    Terminal(Expr),
    /// The call was replaced by a simplified call; resolution starts over
    Resolve {
        set: FunctionSignatureSet,
        args: Vec<CallArg>,
        receiver: Option<Expr>,
    },
}

fn contract(sig: &FunctionSignature, argument: &str, message: impl Into<String>) -> CompileError {
    CompileError::RewriteContract {
        signature: sig.to_string(),
        argument: argument.to_string(),
        message: message.into(),
    }
}

/// Process the first rewrite argument of a validated candidate
pub(crate) fn apply(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    output: TypeRef,
    receiver: &Option<Expr>,
) -> CompileResult<RewriteOutcome> {
    let position = pairs
        .iter()
        .position(|(d, _)| matches!(d, Arg::Rewrite { .. }))
        .expect("caller checked a rewrite argument exists");
    let Arg::Rewrite { name, kind, .. } = pairs[position].0.clone() else {
        unreachable!();
    };
    debug!("rewrite pipeline: '{}' argument '{}' ({})", sig.name, name, kind);

    match kind {
        RewriteKind::Mapper => apply_mapper(session, sig, pairs, position, output, receiver),
        RewriteKind::LogicalCollectionOp => {
            apply_collection_op(session, sig, pairs, position, output)
        }
        RewriteKind::OrderBy => apply_order_by(sig, pairs, output, receiver),
        RewriteKind::FilterRawExecutor => apply_raw_fragment(sig, pairs, position, output),
        RewriteKind::FilterRawProps => apply_raw_props(session, sig, pairs, position, output),
        RewriteKind::CustomQueryArg => apply_custom_arg(sig, pairs, position, output, receiver),
        RewriteKind::ExpandAnd => apply_expand_and(session, sig, pairs, position, output),
        RewriteKind::ExpandCount => apply_expand_count(sig, pairs, position, output, receiver),
    }
}

/// Widens all sibling normal args to raw/unknown for serialization and
/// stringifies literal siblings through the caller-supplied mapper,
/// bypassing schema-based rendering. Mixed-type siblings violate the
/// mapper's contract and fail up front.
fn apply_mapper(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
    receiver: &Option<Expr>,
) -> CompileResult<RewriteOutcome> {
    let CallArg::Mapper(mapper) = pairs[position].1.clone() else {
        return Err(contract(sig, pairs[position].0.name(), "expected a literal mapper"));
    };

    // All mappable siblings must share a mutually-mappable type.
    let sibling_types: Vec<TypeRef> = pairs
        .iter()
        .enumerate()
        .filter(|(i, (d, _))| *i != position && matches!(d, Arg::Normal { .. }))
        .filter_map(|(_, (_, a))| match a {
            CallArg::Built(e) => e.return_type().as_type().cloned(),
            _ => None,
        })
        .filter(|t| !edm::is_unknown(t))
        .collect();
    for window in sibling_types.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        if !is_assignable_single(a, b, session.schema)
            && !is_assignable_single(b, a, session.schema)
        {
            return Err(contract(
                sig,
                pairs[position].0.name(),
                format!("mapped siblings disagree on type: {} vs {}", a, b),
            ));
        }
    }

    let mut args = Vec::new();
    let mut decl_args = Vec::new();
    for (i, (decl, supplied)) in pairs.into_iter().enumerate() {
        if i == position {
            continue;
        }
        let Arg::Normal { name, .. } = &decl else {
            // Remaining rewrite args ride along untouched.
            decl_args.push(decl.clone());
            args.push(supplied);
            continue;
        };
        let CallArg::Built(expr) = supplied else {
            unreachable!("normal pairs are always built");
        };
        let mapped = match &expr {
            Expr::Const(c) if !matches!(c.value, Value::Raw(_)) => Expr::typed_constant(
                Value::Raw(mapper.apply(&c.value)),
                edm::unknown(),
            ),
            other => other.clone(),
        };
        decl_args.push(Arg::normal(name, edm::unknown()));
        args.push(CallArg::Built(mapped));
    }

    let simplified = sig.derive(decl_args, output);
    Ok(RewriteOutcome::Resolve {
        set: FunctionSignatureSet::new(&simplified.name.clone(), vec![simplified]),
        args,
        receiver: receiver.clone(),
    })
}

/// Drives `any`/`all`: mints a fresh alias, replays the callback against a
/// root scoped to the collection's element type, and terminally replaces the
/// call with `<collectionPath>/<op>(<alias>:<predicate>)`
fn apply_collection_op(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    if position == 0 {
        return Err(contract(
            sig,
            &arg_name,
            "a collection predicate requires a preceding collection argument",
        ));
    }
    let CallArg::Built(collection) = &pairs[position - 1].1 else {
        return Err(contract(sig, &arg_name, "preceding argument is not resolved"));
    };
    let Some(TypeRef::Collection { element }) = collection.return_type().as_type() else {
        return Err(contract(
            sig,
            &arg_name,
            "preceding argument is not a resolved collection-typed expression",
        ));
    };
    let CallArg::Lambda(lambda) = pairs[position].1.clone() else {
        return Err(contract(sig, &arg_name, "expected a predicate callback"));
    };

    let alias = session.next_alias();
    session.push_scope((**element).clone(), Some(alias.clone()));
    let replayed = lambda.replay(crate::trace::TraceBuilder::entity());
    let built = build_callback_result(session, sig, &arg_name, replayed);
    session.pop_scope();
    let predicate = built?;

    Ok(RewriteOutcome::Terminal(Expr::StringBuilder(
        StringBuilderExpr {
            parent: None,
            parts: vec![
                StringPart::Expr(Box::new(collection.clone())),
                StringPart::Literal(format!("/{}(", sig.name)),
                StringPart::Literal(format!("{}:", alias)),
                StringPart::Expr(Box::new(predicate)),
                StringPart::Literal(")".to_string()),
            ],
            return_type: ReturnType::Type(output),
        },
    )))
}

/// A callback may hand back a recorded chain, an already-built expression,
/// or a bare boolean literal
fn build_callback_result(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    arg_name: &str,
    result: TraceArg,
) -> CompileResult<Expr> {
    match result {
        TraceArg::Sub(trace) => builder::build(session, None, &trace),
        TraceArg::Expr(expr) => Ok(expr),
        TraceArg::Value(Value::Bool(b)) => {
            Ok(Expr::typed_constant(Value::Bool(b), edm::boolean()))
        }
        other => Err(contract(
            sig,
            arg_name,
            format!(
                "callback must produce an expression or boolean literal, got {:?}",
                other
            ),
        )),
    }
}

/// Flattens (expression, direction) pairs to suffixed text fragments, then
/// re-resolves against a simplified accepts-raw-text signature
fn apply_order_by(
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    output: TypeRef,
    receiver: &Option<Expr>,
) -> CompileResult<RewriteOutcome> {
    let mut args = Vec::new();
    let mut decl_args = Vec::new();
    for (decl, supplied) in pairs {
        if !matches!(&decl, Arg::Rewrite { kind: RewriteKind::OrderBy, .. }) {
            decl_args.push(decl);
            args.push(supplied);
            continue;
        }
        let flattened = match supplied {
            CallArg::Built(expr) => expr,
            CallArg::Pair(inner, direction) => {
                let CallArg::Built(expr) = *inner else {
                    return Err(contract(
                        sig,
                        decl.name(),
                        "an ordering pair must wrap a resolved expression",
                    ));
                };
                Expr::StringBuilder(StringBuilderExpr {
                    parent: None,
                    parts: vec![
                        StringPart::Expr(Box::new(expr)),
                        StringPart::Literal(format!(" {}", direction.keyword())),
                    ],
                    return_type: ReturnType::Type(edm::unknown()),
                })
            }
            other => {
                return Err(contract(
                    sig,
                    decl.name(),
                    format!("unsupported ordering term {}", other.describe()),
                ))
            }
        };
        decl_args.push(Arg::normal(decl.name(), edm::unknown()));
        args.push(CallArg::Built(flattened));
    }

    let simplified = sig.derive(decl_args, output);
    Ok(RewriteOutcome::Resolve {
        set: FunctionSignatureSet::new(&simplified.name.clone(), vec![simplified]),
        args,
        receiver: receiver.clone(),
    })
}

/// A whole filter fragment supplied as pre-rendered text
fn apply_raw_fragment(
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    let text = match &pairs[position].1 {
        CallArg::Built(Expr::Const(c)) => match &c.value {
            Value::String(s) | Value::Raw(s) => s.clone(),
            other => {
                return Err(contract(
                    sig,
                    &arg_name,
                    format!("expected a text fragment, got a {} literal", other.kind_name()),
                ))
            }
        },
        CallArg::Executor(_) => {
            return Err(contract(
                sig,
                &arg_name,
                "a raw executor requires a preceding property map",
            ))
        }
        other => {
            return Err(contract(
                sig,
                &arg_name,
                format!("expected a constant text fragment, got {}", other.describe()),
            ))
        }
    };
    Ok(RewriteOutcome::Terminal(Expr::StringBuilder(
        StringBuilderExpr {
            parent: None,
            parts: vec![StringPart::Literal(text)],
            return_type: ReturnType::Type(output),
        },
    )))
}

/// Renders each mapped property path to text and hands the name-to-text map
/// to the caller's executor; its combined output becomes the whole fragment
fn apply_raw_props(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    let CallArg::Map(entries) = &pairs[position].1 else {
        return Err(contract(sig, &arg_name, "expected a named property map"));
    };
    let executor = pairs[position + 1..]
        .iter()
        .find_map(|(d, a)| match (d, a) {
            (
                Arg::Rewrite {
                    kind: RewriteKind::FilterRawExecutor,
                    ..
                },
                CallArg::Executor(executor),
            ) => Some(executor.clone()),
            _ => None,
        })
        .ok_or_else(|| {
            contract(
                sig,
                &arg_name,
                "a property map requires a neighboring raw executor",
            )
        })?;

    let mut rendered = std::collections::BTreeMap::new();
    for (name, expr) in entries {
        let (text, params) = writer::render_standalone(session, expr)?;
        session.pending_params.extend(params);
        rendered.insert(name.clone(), text);
    }
    let combined = executor.apply(&rendered);

    // An explicit hint on the rewrite argument overrides the declared output.
    let return_type = match &pairs[position].0 {
        Arg::Rewrite {
            type_hint: Some(hint),
            ..
        } => hint.clone(),
        _ => output,
    };
    Ok(RewriteOutcome::Terminal(Expr::StringBuilder(
        StringBuilderExpr {
            parent: None,
            parts: vec![StringPart::Literal(combined)],
            return_type: ReturnType::Type(return_type),
        },
    )))
}

/// Retypes itself and its name sibling to raw text, then recurses into
/// ordinary resolution of the simplified `name=value` call
fn apply_custom_arg(
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
    receiver: &Option<Expr>,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    let mut args = Vec::new();
    let mut decl_args = Vec::new();
    for (i, (decl, supplied)) in pairs.into_iter().enumerate() {
        let raw = match supplied {
            CallArg::Built(Expr::Const(c)) => {
                let text = match &c.value {
                    Value::String(s) | Value::Raw(s) => s.clone(),
                    other if i == position => {
                        return Err(contract(
                            sig,
                            &arg_name,
                            format!("expected a text value, got a {} literal", other.kind_name()),
                        ))
                    }
                    other => render_plain_literal(other),
                };
                Expr::typed_constant(Value::Raw(text), edm::unknown())
            }
            CallArg::Built(other) => other,
            other => {
                return Err(contract(
                    sig,
                    &arg_name,
                    format!("expected a constant value, got {}", other.describe()),
                ))
            }
        };
        decl_args.push(Arg::normal(decl.name(), edm::unknown()));
        args.push(CallArg::Built(raw));
    }

    let simplified = sig.derive(decl_args, output);
    Ok(RewriteOutcome::Resolve {
        set: FunctionSignatureSet::new(&simplified.name.clone(), vec![simplified]),
        args,
        receiver: receiver.clone(),
    })
}

fn render_plain_literal(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        other => format!("{:?}", other),
    }
}

/// Re-contextualizes the receiver as a named query: the callback's predicate
/// nests inside `<navPath>($filter=...)`
fn apply_expand_and(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    if position == 0 {
        return Err(contract(
            sig,
            &arg_name,
            "a nested expansion requires a preceding navigation argument",
        ));
    }
    let CallArg::Built(nav) = &pairs[position - 1].1 else {
        return Err(contract(sig, &arg_name, "preceding argument is not resolved"));
    };
    let Some(TypeRef::Collection { element }) = nav.return_type().as_type() else {
        return Err(contract(
            sig,
            &arg_name,
            "preceding argument is not a resolved collection-typed expression",
        ));
    };
    let CallArg::Lambda(lambda) = pairs[position].1.clone() else {
        return Err(contract(sig, &arg_name, "expected a filter callback"));
    };

    // Inside an expansion the element's properties render bare, so the
    // nested scope carries no alias.
    session.push_scope((**element).clone(), None);
    let replayed = lambda.replay(crate::trace::TraceBuilder::entity());
    let built = build_callback_result(session, sig, &arg_name, replayed);
    session.pop_scope();
    let predicate = built?;

    let (root_ref, params) = writer::render_standalone(session, nav)?;
    session.pending_params.extend(params);

    // The nested predicate renders bare even when the expansion sits inside
    // an aliased scope, so it is re-contexted to the empty alias.
    let recontexted = Expr::ReContexted(crate::expr::tree::ReContextedExpr {
        inner: Box::new(predicate),
        alias: String::new(),
        return_type: ReturnType::Type(output.clone()),
    });
    Ok(RewriteOutcome::Terminal(Expr::NamedQuery(NamedQueryExpr {
        root_ref,
        inner: Box::new(recontexted),
        return_type: ReturnType::Type(output),
    })))
}

/// Inserts an implicit `$count` sub-property read on the supplied collection
/// and recurses into ordinary resolution
fn apply_expand_count(
    sig: &FunctionSignature,
    pairs: Vec<(Arg, CallArg)>,
    position: usize,
    output: TypeRef,
    receiver: &Option<Expr>,
) -> CompileResult<RewriteOutcome> {
    let arg_name = pairs[position].0.name().to_string();
    let mut args = Vec::new();
    let mut decl_args = Vec::new();
    for (i, (decl, supplied)) in pairs.into_iter().enumerate() {
        if i != position {
            decl_args.push(decl);
            args.push(supplied);
            continue;
        }
        let CallArg::Built(nav) = supplied else {
            return Err(contract(sig, &arg_name, "expected a resolved navigation"));
        };
        if !matches!(nav.return_type().as_type(), Some(t) if t.is_collection()) {
            return Err(contract(
                sig,
                &arg_name,
                "count requires a collection-typed expression",
            ));
        }
        let counted = Expr::Prop(PropExpr {
            parent: Box::new(nav),
            name: "$count".to_string(),
            return_type: ReturnType::Type(edm::int64()),
        });
        decl_args.push(Arg::normal(decl.name(), edm::int64()));
        args.push(CallArg::Built(counted));
    }

    let simplified = sig.derive(decl_args, output);
    Ok(RewriteOutcome::Resolve {
        set: FunctionSignatureSet::new(&simplified.name.clone(), vec![simplified]),
        args,
        receiver: receiver.clone(),
    })
}
