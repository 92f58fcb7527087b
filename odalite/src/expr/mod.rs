// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression tree and the trace-replaying builder

pub mod builder;
pub mod tree;

pub use self::builder::build;
pub use self::tree::{
    CallExpr, ConstExpr, Expr, NamedQueryExpr, ParamExpr, PropExpr, ReContextedExpr, ReturnType,
    RootExpr, StringBuilderExpr, StringPart,
};
