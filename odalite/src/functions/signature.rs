// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Function signatures for overload resolution
//!
//! A signature describes one callable shape: declared arguments (normal or
//! rewrite), an output type, and how a successful call renders. Generic
//! placeholder tokens live in the reserved generic namespace and are bound
//! per call.

use std::fmt;

use crate::schema::edm;
use crate::schema::types::TypeRef;

/// How a resolved call renders to protocol text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStyle {
    /// Arguments joined by the operator text, e.g. ` eq ` or `,`
    Infix { operator: String },
    /// `name(arg1<separator>arg2...)`
    Function { name: String, separator: String },
}

/// Shape modifier on a declared argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgModifier {
    None,
    /// May be omitted from the tail of the supplied arguments
    Optional,
    /// Replicated once per extra positional argument, each clone typed as
    /// the spread's element type and renamed `name[i]`
    Spread,
}

/// Declared type of a normal argument: a single type ref or a sum of
/// alternatives (OR semantics)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Single(TypeRef),
    Sum(Vec<TypeRef>),
}

impl ArgType {
    pub fn alternatives(&self) -> &[TypeRef] {
        match self {
            ArgType::Single(t) => std::slice::from_ref(t),
            ArgType::Sum(ts) => ts,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Single(t) => write!(f, "{}", t),
            ArgType::Sum(ts) => {
                let rendered: Vec<String> = ts.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", rendered.join(" | "))
            }
        }
    }
}

/// The meta-behavior a rewrite argument triggers instead of ordinary value
/// binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteKind {
    /// Caller-supplied value-to-text function; widens literal siblings to
    /// raw/unknown output
    Mapper,
    /// Collection predicate (`any`/`all`): replays a callback against a
    /// freshly aliased element root
    LogicalCollectionOp,
    /// Bare expressions or (expression, direction) pairs flattened to
    /// suffixed text
    OrderBy,
    /// A named map of path expressions handed to a raw-text executor
    FilterRawProps,
    /// A raw-text constant accepted as a whole filter fragment
    FilterRawExecutor,
    /// A raw query-option value; retypes itself and its name sibling
    CustomQueryArg,
    /// Nested expansion: re-contextualizes the receiver as a named query
    ExpandAnd,
    /// Inserts an implicit `$count` sub-property read on the neighbor
    ExpandCount,
}

impl fmt::Display for RewriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewriteKind::Mapper => "mapper",
            RewriteKind::LogicalCollectionOp => "collection-predicate",
            RewriteKind::OrderBy => "order-by",
            RewriteKind::FilterRawProps => "raw-props",
            RewriteKind::FilterRawExecutor => "raw-executor",
            RewriteKind::CustomQueryArg => "custom-query-arg",
            RewriteKind::ExpandAnd => "expand-and",
            RewriteKind::ExpandCount => "expand-count",
        };
        write!(f, "{}", name)
    }
}

/// One declared argument of a signature
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Normal {
        name: String,
        arg_type: ArgType,
        modifier: ArgModifier,
    },
    Rewrite {
        name: String,
        kind: RewriteKind,
        modifier: ArgModifier,
        /// Concrete output type the rewrite's replacement should carry, when
        /// the rule cannot infer one
        type_hint: Option<TypeRef>,
    },
}

impl Arg {
    pub fn normal(name: &str, arg_type: TypeRef) -> Self {
        Arg::Normal {
            name: name.to_string(),
            arg_type: ArgType::Single(arg_type),
            modifier: ArgModifier::None,
        }
    }

    pub fn normal_sum(name: &str, alternatives: Vec<TypeRef>) -> Self {
        Arg::Normal {
            name: name.to_string(),
            arg_type: ArgType::Sum(alternatives),
            modifier: ArgModifier::None,
        }
    }

    pub fn optional(name: &str, arg_type: TypeRef) -> Self {
        Arg::Normal {
            name: name.to_string(),
            arg_type: ArgType::Single(arg_type),
            modifier: ArgModifier::Optional,
        }
    }

    pub fn spread(name: &str, element_type: TypeRef) -> Self {
        Arg::Normal {
            name: name.to_string(),
            arg_type: ArgType::Single(element_type),
            modifier: ArgModifier::Spread,
        }
    }

    pub fn rewrite(name: &str, kind: RewriteKind) -> Self {
        Arg::Rewrite {
            name: name.to_string(),
            kind,
            modifier: ArgModifier::None,
            type_hint: None,
        }
    }

    pub fn rewrite_optional(name: &str, kind: RewriteKind) -> Self {
        Arg::Rewrite {
            name: name.to_string(),
            kind,
            modifier: ArgModifier::Optional,
            type_hint: None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Arg::Normal { name, .. } | Arg::Rewrite { name, .. } => name,
        }
    }

    pub fn modifier(&self) -> ArgModifier {
        match self {
            Arg::Normal { modifier, .. } | Arg::Rewrite { modifier, .. } => *modifier,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Normal {
                name,
                arg_type,
                modifier,
            } => {
                let suffix = match modifier {
                    ArgModifier::None => "",
                    ArgModifier::Optional => "?",
                    ArgModifier::Spread => "...",
                };
                write!(f, "{}{}: {}", name, suffix, arg_type)
            }
            Arg::Rewrite {
                name,
                kind,
                modifier,
                ..
            } => {
                let suffix = match modifier {
                    ArgModifier::None => "",
                    ArgModifier::Optional => "?",
                    ArgModifier::Spread => "...",
                };
                write!(f, "{}{}: <{}>", name, suffix, kind)
            }
        }
    }
}

/// Whether a signature's calls may be serialized, or the per-argument
/// reasons they may not
#[derive(Debug, Clone, PartialEq)]
pub enum Executable {
    Yes,
    No(Vec<ExecutableBlock>),
}

/// One reason a signature cannot be serialized, tied to the offending
/// argument
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableBlock {
    pub reason: String,
    pub arg_name: String,
}

/// One concrete callable shape sharing a name with its overload siblings
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub input_args: Vec<Arg>,
    pub output_type: TypeRef,
    pub call_style: CallStyle,
    pub executable: Executable,
    /// The signature this one was derived from by sum expansion, rewrite
    /// simplification, or schema conversion
    pub derived_from: Option<Box<FunctionSignature>>,
}

impl FunctionSignature {
    pub fn infix(name: &str, operator: &str, input_args: Vec<Arg>, output_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            input_args,
            output_type,
            call_style: CallStyle::Infix {
                operator: operator.to_string(),
            },
            executable: Executable::Yes,
            derived_from: None,
        }
    }

    pub fn function(name: &str, input_args: Vec<Arg>, output_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            input_args,
            output_type,
            call_style: CallStyle::Function {
                name: name.to_string(),
                separator: ",".to_string(),
            },
            executable: Executable::Yes,
            derived_from: None,
        }
    }

    pub fn has_rewrite_args(&self) -> bool {
        self.input_args
            .iter()
            .any(|a| matches!(a, Arg::Rewrite { .. }))
    }

    /// The original signature at the root of a derivation chain
    pub fn root(&self) -> &FunctionSignature {
        match &self.derived_from {
            Some(parent) => parent.root(),
            None => self,
        }
    }

    /// A derived copy pointing back at `self`
    pub fn derive(&self, input_args: Vec<Arg>, output_type: TypeRef) -> Self {
        Self {
            name: self.name.clone(),
            input_args,
            output_type,
            call_style: self.call_style.clone(),
            executable: self.executable.clone(),
            derived_from: Some(Box::new(self.clone())),
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.input_args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({}) -> {}", self.name, args.join(", "), self.output_type)
    }
}

/// All candidate signatures sharing one name, attached to an expression that
/// awaits invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignatureSet {
    pub name: String,
    pub signatures: Vec<FunctionSignature>,
}

impl FunctionSignatureSet {
    pub fn new(name: &str, signatures: Vec<FunctionSignature>) -> Self {
        Self {
            name: name.to_string(),
            signatures,
        }
    }
}

/// Convenience constructor for the generic token most signatures use
pub fn generic_t() -> TypeRef {
    edm::generic("T")
}
