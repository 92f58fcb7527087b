// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed expression tree
//!
//! Nodes are created bottom-up and never mutated in place: re-typing a node
//! produces a new node of the same variant.

use crate::functions::signature::{FunctionSignature, FunctionSignatureSet};
use crate::schema::types::TypeRef;
use crate::serialize::value::Value;

/// The type an expression resolves to. `Signatures` only ever appears on a
/// receiver awaiting invocation; an expression used as a value always carries
/// `Unresolved` or a concrete `Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Unresolved,
    Type(TypeRef),
    Signatures(FunctionSignatureSet),
}

impl ReturnType {
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            ReturnType::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_signatures(&self) -> Option<&FunctionSignatureSet> {
        match self {
            ReturnType::Signatures(s) => Some(s),
            _ => None,
        }
    }
}

/// A constant literal; untyped until unification or serialization supplies
/// context
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    pub value: Value,
    pub return_type: ReturnType,
}

/// Property navigation: `parent/name`
#[derive(Debug, Clone, PartialEq)]
pub struct PropExpr {
    pub parent: Box<Expr>,
    pub name: String,
    pub return_type: ReturnType,
}

/// The root of a navigation chain: the ambient entity, a collection
/// predicate's aliased element, or a query-utility namespace
#[derive(Debug, Clone, PartialEq)]
pub struct RootExpr {
    pub name: String,
    pub alias: Option<String>,
    pub return_type: ReturnType,
}

/// A resolved function or operator call
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Navigation path a schema-bound function is invoked on; absent for
    /// query-utility calls
    pub receiver: Option<Box<Expr>>,
    pub args: Vec<Expr>,
    /// Names rendered as `name=value` pairs for named-argument (sub-path)
    /// invocation; empty for positional calls
    pub arg_names: Vec<String>,
    pub signature: FunctionSignature,
    pub return_type: ReturnType,
}

/// Literal fragments and sub-expressions spliced in declared order. Used by
/// collection-predicate templates and order-by suffixes.
#[derive(Debug, Clone, PartialEq)]
pub struct StringBuilderExpr {
    pub parent: Option<Box<Expr>>,
    pub parts: Vec<StringPart>,
    pub return_type: ReturnType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    Expr(Box<Expr>),
}

/// Switches the active alias used by nested `Prop` rendering without
/// altering upstream text
#[derive(Debug, Clone, PartialEq)]
pub struct ReContextedExpr {
    pub inner: Box<Expr>,
    pub alias: String,
    pub return_type: ReturnType,
}

/// A nested query attached to a navigation path, e.g. an expansion with an
/// inline filter: `rootRef($filter=inner)`
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQueryExpr {
    pub root_ref: String,
    pub inner: Box<Expr>,
    pub return_type: ReturnType,
}

/// An out-of-band parameter: renders `@name` at its use site and contributes
/// a binding to the parameter accumulator
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExpr {
    pub name: String,
    pub inner: Box<Expr>,
    pub return_type: ReturnType,
}

/// Closed expression union, discriminated by an explicit kind and matched
/// exhaustively
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(ConstExpr),
    Prop(PropExpr),
    Root(RootExpr),
    Call(CallExpr),
    StringBuilder(StringBuilderExpr),
    ReContexted(ReContextedExpr),
    NamedQuery(NamedQueryExpr),
    Param(ParamExpr),
}

impl Expr {
    pub fn constant(value: Value) -> Self {
        Expr::Const(ConstExpr {
            value,
            return_type: ReturnType::Unresolved,
        })
    }

    pub fn typed_constant(value: Value, return_type: TypeRef) -> Self {
        Expr::Const(ConstExpr {
            value,
            return_type: ReturnType::Type(return_type),
        })
    }

    pub fn return_type(&self) -> &ReturnType {
        match self {
            Expr::Const(e) => &e.return_type,
            Expr::Prop(e) => &e.return_type,
            Expr::Root(e) => &e.return_type,
            Expr::Call(e) => &e.return_type,
            Expr::StringBuilder(e) => &e.return_type,
            Expr::ReContexted(e) => &e.return_type,
            Expr::NamedQuery(e) => &e.return_type,
            Expr::Param(e) => &e.return_type,
        }
    }

    /// A copy of this node carrying a different declared return type. Nodes
    /// are immutable; re-typing always builds a new node of the same variant.
    pub fn with_return_type(&self, return_type: ReturnType) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Expr::Const(e) => e.return_type = return_type,
            Expr::Prop(e) => e.return_type = return_type,
            Expr::Root(e) => e.return_type = return_type,
            Expr::Call(e) => e.return_type = return_type,
            Expr::StringBuilder(e) => e.return_type = return_type,
            Expr::ReContexted(e) => e.return_type = return_type,
            Expr::NamedQuery(e) => e.return_type = return_type,
            Expr::Param(e) => e.return_type = return_type,
        }
        copy
    }

    /// Short label for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Expr::Const(e) => format!("constant {}", e.value.kind_name()),
            Expr::Prop(e) => format!("property '{}'", e.name),
            Expr::Root(e) => format!("root '{}'", e.name),
            Expr::Call(e) => format!("call to '{}'", e.signature.name),
            Expr::StringBuilder(_) => "text fragment".to_string(),
            Expr::ReContexted(e) => e.inner.describe(),
            Expr::NamedQuery(e) => format!("named query on '{}'", e.root_ref),
            Expr::Param(e) => format!("parameter @{}", e.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::edm;

    #[test]
    fn test_retyping_builds_a_new_node() {
        let original = Expr::constant(Value::Int(1));
        let retyped = original.with_return_type(ReturnType::Type(edm::int32()));

        assert_eq!(original.return_type(), &ReturnType::Unresolved);
        assert_eq!(
            retyped.return_type(),
            &ReturnType::Type(edm::int32())
        );
        // Same variant, same payload.
        match (&original, &retyped) {
            (Expr::Const(a), Expr::Const(b)) => assert_eq!(a.value, b.value),
            _ => panic!("variant changed during re-typing"),
        }
    }
}
