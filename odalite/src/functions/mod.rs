// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Function signature catalog, overload resolution, and the rewrite pipeline

pub mod catalog;
pub mod resolver;
pub mod rewrite;
pub mod signature;

pub use self::catalog::{Catalog, UtilityMember, UtilityNamespace};
pub use self::resolver::{resolve_call, resolve_named_call, CallArg};
pub use self::signature::{
    Arg, ArgModifier, ArgType, CallStyle, Executable, ExecutableBlock, FunctionSignature,
    FunctionSignatureSet, RewriteKind,
};
