// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Overload resolution
//!
//! Candidates are tried independently: a rejected candidate records its
//! reason and the next one is attempted. Only exhaustion of every candidate
//! surfaces to the caller, carrying the full list of near-misses. Rewrite
//! rule violations and errors raised while replaying callbacks are fatal
//! immediately.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::error::{CompileError, CompileResult};
use crate::expr::tree::{CallExpr, Expr, ReturnType};
use crate::functions::rewrite::{self, RewriteOutcome};
use crate::functions::signature::{
    Arg, ArgModifier, ArgType, FunctionSignature, FunctionSignatureSet, RewriteKind,
};
use crate::schema::assignable::is_assignable_single;
use crate::schema::edm;
use crate::schema::types::TypeRef;
use crate::session::Session;
use crate::trace::{Lambda, Mapper, RawExecutor, SortDirection};

/// One supplied call argument, built where possible and kept raw where a
/// rewrite rule consumes it
#[derive(Debug, Clone)]
pub enum CallArg {
    Built(Expr),
    Lambda(Lambda),
    Pair(Box<CallArg>, SortDirection),
    Map(Vec<(String, Expr)>),
    Mapper(Mapper),
    Executor(RawExecutor),
}

impl CallArg {
    pub fn describe(&self) -> String {
        match self {
            CallArg::Built(e) => e.describe(),
            CallArg::Lambda(_) => "callback".to_string(),
            CallArg::Pair(inner, dir) => format!("({}, {})", inner.describe(), dir.keyword()),
            CallArg::Map(_) => "property map".to_string(),
            CallArg::Mapper(_) => "literal mapper".to_string(),
            CallArg::Executor(_) => "raw executor".to_string(),
        }
    }
}

/// Why one candidate was rejected; aggregated, never thrown on its own
#[derive(Debug, Clone)]
pub(crate) enum CandidateFailure {
    Arity(String),
    GenericMismatch(String),
    NotAssignable(String),
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateFailure::Arity(msg) => write!(f, "arity mismatch: {}", msg),
            CandidateFailure::GenericMismatch(msg) => write!(f, "generic mismatch: {}", msg),
            CandidateFailure::NotAssignable(msg) => write!(f, "not assignable: {}", msg),
        }
    }
}

/// Per-candidate control flow: rejection keeps trying siblings, fatal stops
/// the whole resolution
pub(crate) enum TryError {
    Rejected(CandidateFailure),
    Fatal(CompileError),
}

impl From<CompileError> for TryError {
    fn from(err: CompileError) -> Self {
        TryError::Fatal(err)
    }
}

/// Resolve a positional invocation against an overload set
pub fn resolve_call(
    session: &mut Session<'_>,
    set: &FunctionSignatureSet,
    receiver: Option<Expr>,
    args: Vec<CallArg>,
) -> CompileResult<Expr> {
    let candidates: Vec<FunctionSignature> =
        set.signatures.iter().flat_map(expand_sums).collect();
    debug!(
        "resolving '{}' against {} candidate(s)",
        set.name,
        candidates.len()
    );

    let mut failures: Vec<String> = Vec::new();
    for candidate in &candidates {
        match try_candidate(session, candidate, &receiver, &args, &[]) {
            Ok(expr) => return Ok(expr),
            Err(TryError::Fatal(err)) => return Err(err),
            Err(TryError::Rejected(failure)) => {
                failures.push(format!("  {}: {}", candidate, failure));
            }
        }
    }

    Err(CompileError::NoMatchingOverload {
        name: set.name.clone(),
        explanations: failures.join("\n"),
    })
}

/// Resolve an invocation supplying arguments as a set of named values
/// (sub-path function calls). The first overload whose parameter name set
/// exactly equals the supplied key set wins, independent of order.
pub fn resolve_named_call(
    session: &mut Session<'_>,
    set: &FunctionSignatureSet,
    receiver: Option<Expr>,
    named: Vec<(String, CallArg)>,
) -> CompileResult<Expr> {
    let supplied_names: BTreeSet<&str> = named.iter().map(|(n, _)| n.as_str()).collect();
    let mut failures: Vec<String> = Vec::new();

    for candidate in set.signatures.iter().flat_map(expand_sums) {
        let declared_names: BTreeSet<&str> =
            candidate.input_args.iter().map(|a| a.name()).collect();
        if declared_names != supplied_names {
            failures.push(format!(
                "  {}: parameter names do not match supplied set {{{}}}",
                candidate,
                supplied_names
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            continue;
        }

        let ordered: Vec<CallArg> = candidate
            .input_args
            .iter()
            .map(|decl| {
                named
                    .iter()
                    .find(|(n, _)| n == decl.name())
                    .map(|(_, a)| a.clone())
                    .expect("name sets were checked equal")
            })
            .collect();
        let arg_names: Vec<String> = candidate
            .input_args
            .iter()
            .map(|a| a.name().to_string())
            .collect();

        match try_candidate(session, &candidate, &receiver, &ordered, &arg_names) {
            Ok(expr) => return Ok(expr),
            Err(TryError::Fatal(err)) => return Err(err),
            Err(TryError::Rejected(failure)) => {
                failures.push(format!("  {}: {}", candidate, failure));
            }
        }
    }

    Err(CompileError::NoMatchingOverload {
        name: set.name.clone(),
        explanations: failures.join("\n"),
    })
}

/// Sum-typed normal arguments expand into sibling candidates, one per
/// alternative, via cross product
pub(crate) fn expand_sums(sig: &FunctionSignature) -> Vec<FunctionSignature> {
    let has_sum = sig.input_args.iter().any(
        |a| matches!(a, Arg::Normal { arg_type: ArgType::Sum(_), .. }),
    );
    if !has_sum {
        return vec![sig.clone()];
    }

    let mut variants: Vec<Vec<Arg>> = vec![Vec::new()];
    for arg in &sig.input_args {
        match arg {
            Arg::Normal {
                name,
                arg_type: ArgType::Sum(alternatives),
                modifier,
            } => {
                let mut next = Vec::new();
                for variant in &variants {
                    for alternative in alternatives {
                        let mut expanded = variant.clone();
                        expanded.push(Arg::Normal {
                            name: name.clone(),
                            arg_type: ArgType::Single(alternative.clone()),
                            modifier: *modifier,
                        });
                        next.push(expanded);
                    }
                }
                variants = next;
            }
            other => {
                for variant in &mut variants {
                    variant.push(other.clone());
                }
            }
        }
    }
    variants
        .into_iter()
        .map(|args| sig.derive(args, sig.output_type.clone()))
        .collect()
}

fn try_candidate(
    session: &mut Session<'_>,
    sig: &FunctionSignature,
    receiver: &Option<Expr>,
    args: &[CallArg],
    arg_names: &[String],
) -> Result<Expr, TryError> {
    let normalized = normalize_args(sig, args).map_err(TryError::Rejected)?;

    // Generic unification over the normal, already-built pairs.
    let mut bindings: BTreeMap<String, TypeRef> = BTreeMap::new();
    for (decl, supplied) in &normalized {
        if let (
            Arg::Normal {
                arg_type: ArgType::Single(target),
                ..
            },
            CallArg::Built(expr),
        ) = (decl, supplied)
        {
            if let ReturnType::Type(actual) = expr.return_type() {
                unify(session, target, actual, &mut bindings).map_err(TryError::Rejected)?;
            }
        }
    }

    // Substitution and re-validation.
    let mut final_pairs: Vec<(Arg, CallArg)> = Vec::with_capacity(normalized.len());
    for (decl, supplied) in normalized {
        match (&decl, &supplied) {
            (
                Arg::Normal {
                    name,
                    arg_type: ArgType::Single(target),
                    modifier,
                },
                CallArg::Built(expr),
            ) => {
                let target = substitute(target, &bindings);
                let validated =
                    validate_arg(session, name, &target, expr).map_err(TryError::Rejected)?;
                final_pairs.push((
                    Arg::Normal {
                        name: name.clone(),
                        arg_type: ArgType::Single(target),
                        modifier: *modifier,
                    },
                    CallArg::Built(validated),
                ));
            }
            _ => final_pairs.push((decl, supplied)),
        }
    }
    let output = substitute(&sig.output_type, &bindings);

    let has_rewrite = final_pairs
        .iter()
        .any(|(d, _)| matches!(d, Arg::Rewrite { .. }));
    if has_rewrite {
        match rewrite::apply(session, sig, final_pairs, output, receiver)? {
            RewriteOutcome::Terminal(expr) => Ok(expr),
            RewriteOutcome::Resolve {
                set,
                args,
                receiver,
            } => resolve_call(session, &set, receiver, args).map_err(TryError::Fatal),
        }
    } else {
        let (decl_args, exprs): (Vec<Arg>, Vec<Expr>) = final_pairs
            .into_iter()
            .map(|(d, a)| match a {
                CallArg::Built(e) => (d, e),
                _ => unreachable!("non-rewrite pairs are always built"),
            })
            .unzip();
        let resolved = sig.derive(decl_args, output.clone());
        Ok(Expr::Call(CallExpr {
            receiver: receiver.clone().map(Box::new),
            args: exprs,
            arg_names: arg_names.to_vec(),
            signature: resolved,
            return_type: ReturnType::Type(output),
        }))
    }
}

/// Match the declared argument shape to the supplied arity: spread args are
/// replicated once per extra positional argument (renamed `name[i]`),
/// optional args may be omitted from the tail, and a shape that cannot match
/// rejects the candidate.
fn normalize_args(
    sig: &FunctionSignature,
    supplied: &[CallArg],
) -> Result<Vec<(Arg, CallArg)>, CandidateFailure> {
    let mut out: Vec<(Arg, CallArg)> = Vec::new();
    let mut si = 0usize;

    for (di, decl) in sig.input_args.iter().enumerate() {
        let required_after: usize = sig.input_args[di + 1..]
            .iter()
            .filter(|a| a.modifier() == ArgModifier::None)
            .count();
        let available = supplied.len().saturating_sub(si);

        match decl.modifier() {
            ArgModifier::Spread => {
                if available < required_after {
                    return Err(CandidateFailure::Arity(format!(
                        "expected at least {} argument(s) after '{}'",
                        required_after,
                        decl.name()
                    )));
                }
                let take = available - required_after;
                for k in 0..take {
                    let clone = clone_as_positional(decl, &format!("{}[{}]", decl.name(), k));
                    check_shape(&clone, &supplied[si])?;
                    out.push((clone, supplied[si].clone()));
                    si += 1;
                }
            }
            ArgModifier::Optional => {
                if available > required_after {
                    let clone = clone_as_positional(decl, decl.name());
                    check_shape(&clone, &supplied[si])?;
                    out.push((clone, supplied[si].clone()));
                    si += 1;
                }
                // Otherwise omitted from the tail.
            }
            ArgModifier::None => {
                if si >= supplied.len() {
                    return Err(CandidateFailure::Arity(format!(
                        "missing argument '{}'",
                        decl.name()
                    )));
                }
                check_shape(decl, &supplied[si])?;
                out.push((decl.clone(), supplied[si].clone()));
                si += 1;
            }
        }
    }

    if si != supplied.len() {
        return Err(CandidateFailure::Arity(format!(
            "expected {} argument(s), got {}",
            si,
            supplied.len()
        )));
    }
    Ok(out)
}

/// A synthetic plain copy of a declared argument, used for spread clones and
/// consumed optionals
fn clone_as_positional(decl: &Arg, name: &str) -> Arg {
    match decl {
        Arg::Normal { arg_type, .. } => Arg::Normal {
            name: name.to_string(),
            arg_type: arg_type.clone(),
            modifier: ArgModifier::None,
        },
        Arg::Rewrite {
            kind, type_hint, ..
        } => Arg::Rewrite {
            name: name.to_string(),
            kind: *kind,
            modifier: ArgModifier::None,
            type_hint: type_hint.clone(),
        },
    }
}

/// A supplied argument's shape must fit the declared argument kind
fn check_shape(decl: &Arg, supplied: &CallArg) -> Result<(), CandidateFailure> {
    let ok = match decl {
        Arg::Normal { .. } => matches!(supplied, CallArg::Built(_)),
        Arg::Rewrite { kind, .. } => match kind {
            RewriteKind::Mapper => matches!(supplied, CallArg::Mapper(_)),
            RewriteKind::LogicalCollectionOp | RewriteKind::ExpandAnd => {
                matches!(supplied, CallArg::Lambda(_))
            }
            RewriteKind::OrderBy => {
                matches!(supplied, CallArg::Built(_) | CallArg::Pair(..))
            }
            RewriteKind::FilterRawProps => matches!(supplied, CallArg::Map(_)),
            RewriteKind::FilterRawExecutor => {
                matches!(supplied, CallArg::Built(_) | CallArg::Executor(_))
            }
            RewriteKind::CustomQueryArg | RewriteKind::ExpandCount => {
                matches!(supplied, CallArg::Built(_))
            }
        },
    };
    if ok {
        Ok(())
    } else {
        Err(CandidateFailure::Arity(format!(
            "argument '{}' does not accept {}",
            decl.name(),
            supplied.describe()
        )))
    }
}

/// Bind generic tokens found in a declared type (possibly nested inside one
/// level of collection) to the supplied expression's concrete type
fn unify(
    session: &Session<'_>,
    target: &TypeRef,
    actual: &TypeRef,
    bindings: &mut BTreeMap<String, TypeRef>,
) -> Result<(), CandidateFailure> {
    match target {
        TypeRef::Named { namespace, name } if namespace == edm::GENERIC_NAMESPACE => {
            bind_token(session, bindings, name, actual)
        }
        TypeRef::Collection { element } if edm::is_generic(element) => match actual {
            TypeRef::Collection {
                element: actual_element,
            } => {
                let TypeRef::Named { name: token, .. } = element.as_ref() else {
                    unreachable!("generic tokens are named types");
                };
                bind_token(session, bindings, token, actual_element)
            }
            _ => Err(CandidateFailure::GenericMismatch(format!(
                "{} supplied where a collection was declared",
                actual
            ))),
        },
        _ => Ok(()),
    }
}

fn bind_token(
    session: &Session<'_>,
    bindings: &mut BTreeMap<String, TypeRef>,
    token: &str,
    actual: &TypeRef,
) -> Result<(), CandidateFailure> {
    // Raw/unknown output never narrows a token; validation re-types it later.
    if edm::is_unknown(actual) {
        return Ok(());
    }
    match bindings.get(token) {
        None => {
            bindings.insert(token.to_string(), actual.clone());
            Ok(())
        }
        Some(bound) if bound == actual => Ok(()),
        Some(bound) => {
            let actual_to_bound = is_assignable_single(actual, bound, session.schema);
            let bound_to_actual = is_assignable_single(bound, actual, session.schema);
            if !actual_to_bound && !bound_to_actual {
                return Err(CandidateFailure::GenericMismatch(format!(
                    "token '{}' bound to {} cannot rebind to incompatible {}",
                    token, bound, actual
                )));
            }
            let narrowed = more_specific(bound, actual, actual_to_bound, bound_to_actual);
            bindings.insert(token.to_string(), narrowed);
            Ok(())
        }
    }
}

/// Compatible rebinds narrow to the more specific type: a concrete type
/// beats a pseudo-type group, a one-way-assignable type beats its wider
/// counterpart, and ties keep the earlier binding.
fn more_specific(
    bound: &TypeRef,
    actual: &TypeRef,
    actual_to_bound: bool,
    bound_to_actual: bool,
) -> TypeRef {
    let bound_pseudo = edm::is_pseudo(bound);
    let actual_pseudo = edm::is_pseudo(actual);
    if bound_pseudo && !actual_pseudo {
        return actual.clone();
    }
    if actual_pseudo && !bound_pseudo {
        return bound.clone();
    }
    if actual_to_bound && !bound_to_actual {
        return actual.clone();
    }
    bound.clone()
}

/// Replace every bound token through a declared type; tokens left unbound
/// fall back to the universal sink so the resolved signature never carries
/// a dangling placeholder
pub(crate) fn substitute(t: &TypeRef, bindings: &BTreeMap<String, TypeRef>) -> TypeRef {
    match t {
        TypeRef::Named { namespace, name } if namespace == edm::GENERIC_NAMESPACE => bindings
            .get(name)
            .cloned()
            .unwrap_or_else(edm::any),
        TypeRef::Collection { element } => TypeRef::collection(substitute(element, bindings)),
        other => other.clone(),
    }
}

/// Full assignability re-check for one argument, with two escape hatches:
/// untyped constants and raw/unknown output are accepted against any target
/// and re-typed to match
fn validate_arg(
    session: &Session<'_>,
    name: &str,
    target: &TypeRef,
    expr: &Expr,
) -> Result<Expr, CandidateFailure> {
    if edm::is_unknown(target) {
        return Ok(expr.clone());
    }
    match expr.return_type() {
        ReturnType::Unresolved => Ok(expr.with_return_type(ReturnType::Type(target.clone()))),
        ReturnType::Type(t) if edm::is_unknown(t) => {
            Ok(expr.with_return_type(ReturnType::Type(target.clone())))
        }
        ReturnType::Type(t) => {
            if is_assignable_single(t, target, session.schema) {
                Ok(expr.clone())
            } else {
                Err(CandidateFailure::NotAssignable(format!(
                    "argument '{}': {} is not assignable to {}",
                    name, t, target
                )))
            }
        }
        ReturnType::Signatures(_) => Err(CandidateFailure::NotAssignable(format!(
            "argument '{}' is an uninvoked function reference",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::signature::generic_t;
    use crate::schema::types::SchemaModel;
    use crate::serialize::value::Value;

    #[test]
    fn test_spread_normalization_produces_synthetic_normals() {
        let sig = FunctionSignature::infix(
            "and",
            " and ",
            vec![Arg::spread("conditions", edm::boolean())],
            edm::boolean(),
        );
        let supplied: Vec<CallArg> = (0..3)
            .map(|_| CallArg::Built(Expr::constant(Value::Bool(true))))
            .collect();

        let normalized = normalize_args(&sig, &supplied).unwrap();
        assert_eq!(normalized.len(), 3);
        for (i, (decl, _)) in normalized.iter().enumerate() {
            let Arg::Normal {
                name,
                arg_type,
                modifier,
            } = decl
            else {
                panic!("spread clones are normal args");
            };
            assert_eq!(name, &format!("conditions[{}]", i));
            assert_eq!(arg_type, &ArgType::Single(edm::boolean()));
            assert_eq!(*modifier, ArgModifier::None);
        }
    }

    #[test]
    fn test_optional_omitted_from_tail() {
        let sig = FunctionSignature::function(
            "substring",
            vec![
                Arg::normal("value", edm::string()),
                Arg::normal("start", edm::int32()),
                Arg::optional("length", edm::int32()),
            ],
            edm::string(),
        );
        let two: Vec<CallArg> = vec![
            CallArg::Built(Expr::constant(Value::String("x".into()))),
            CallArg::Built(Expr::constant(Value::Int(1))),
        ];
        assert_eq!(normalize_args(&sig, &two).unwrap().len(), 2);

        let four: Vec<CallArg> = (0..4)
            .map(|_| CallArg::Built(Expr::constant(Value::Int(1))))
            .collect();
        assert!(matches!(
            normalize_args(&sig, &four),
            Err(CandidateFailure::Arity(_))
        ));
    }

    #[test]
    fn test_sum_expansion_cross_product() {
        let sig = FunctionSignature::function(
            "year",
            vec![Arg::normal_sum(
                "value",
                vec![edm::date(), edm::date_time_offset()],
            )],
            edm::int32(),
        );
        let expanded = expand_sums(&sig);
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|s| s.derived_from.is_some()));
    }

    #[test]
    fn test_token_narrowing_prefers_concrete_type() {
        let schema = SchemaModel::new();
        let session = Session::new(&schema, edm::string());
        let mut bindings = BTreeMap::new();

        bind_token(&session, &mut bindings, "T", &edm::number()).unwrap();
        bind_token(&session, &mut bindings, "T", &edm::int32()).unwrap();
        assert_eq!(bindings.get("T"), Some(&edm::int32()));

        // Compatible widening rebind keeps the narrower binding.
        bind_token(&session, &mut bindings, "T", &edm::number()).unwrap();
        assert_eq!(bindings.get("T"), Some(&edm::int32()));
    }

    #[test]
    fn test_incompatible_rebind_rejects_candidate_only() {
        let schema = SchemaModel::new();
        let session = Session::new(&schema, edm::string());
        let mut bindings = BTreeMap::new();

        bind_token(&session, &mut bindings, "T", &edm::boolean()).unwrap();
        let err = bind_token(&session, &mut bindings, "T", &edm::int32()).unwrap_err();
        assert!(matches!(err, CandidateFailure::GenericMismatch(_)));
    }

    #[test]
    fn test_substitute_defaults_unbound_tokens_to_any() {
        let bindings = BTreeMap::new();
        assert_eq!(substitute(&generic_t(), &bindings), edm::any());
        assert_eq!(
            substitute(&TypeRef::collection(generic_t()), &bindings),
            TypeRef::collection(edm::any())
        );
    }
}
