// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Odalite - A lightweight OData v4 query expression compiler
//!
//! Odalite compiles fluently recorded predicate and path expressions against
//! a modeled remote entity schema into OData v4 query text, together with a
//! side list of named out-of-band parameters.
//!
//! # Features
//!
//! - **Recording traces**: fluent property/call chains accumulate as data
//!   and replay without evaluation
//! - **Schema-driven typing**: traces resolve against an immutable schema
//!   model into a typed expression tree
//! - **Overload resolution**: generic-type unification, sum-type expansion,
//!   spread/optional arguments, and aggregated multi-candidate diagnostics
//! - **Rewrite arguments**: collection predicates, ordering, raw escapes,
//!   literal mappers, and expansion helpers
//! - **Type-directed serialization**: OData literal forms for strings,
//!   temporals, binaries, enums, and collections
//!
//! # Usage
//!
//! ```rust,ignore
//! let schema = SchemaModel::from_json(&metadata_json)?;
//! let mut compiler = QueryCompiler::new(&schema, TypeRef::named("My", "Person"));
//!
//! let trace = TraceBuilder::utility("filter").get("eq").apply(vec![
//!     TraceArg::sub(TraceBuilder::entity().get("Name")),
//!     TraceArg::value("O'Brien"),
//! ]);
//! let fragment = compiler.compile(trace)?;
//! assert_eq!(fragment.text, "Name eq 'O''Brien'");
//! ```

pub mod error;
pub mod session;
pub mod expr;
pub mod functions;
pub mod schema;
pub mod serialize;
pub mod trace;

use crate::expr::tree::{Expr, ParamExpr, ReturnType};
use crate::session::Session;

pub use crate::error::{CompileError, CompileResult};
pub use crate::schema::{SchemaModel, TypeRef};
pub use crate::serialize::{ParamBinding, Value};
pub use crate::trace::{SortDirection, Trace, TraceArg, TraceBuilder};

/// A rendered protocol text fragment plus the ordered parameter bindings the
/// URI assembler attaches as additional query-string entries
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFragment {
    pub text: String,
    pub params: Vec<ParamBinding>,
}

/// One compiler session over an immutable schema model. Alias generation,
/// parameter accumulation, and warn-once bookkeeping are scoped to the
/// session, so independent sessions never interfere.
#[derive(Debug)]
pub struct QueryCompiler<'s> {
    session: Session<'s>,
}

impl<'s> QueryCompiler<'s> {
    /// Start a session compiling queries against one entity type
    pub fn new(schema: &'s SchemaModel, entity_type: TypeRef) -> Self {
        Self {
            session: Session::new(schema, entity_type),
        }
    }

    /// Build a trace into a typed expression without serializing it, e.g.
    /// for terminal injection into a later trace
    pub fn build_expr(&mut self, trace: impl Into<Trace>) -> CompileResult<Expr> {
        expr::builder::build(&mut self.session, None, &trace.into())
    }

    /// Compile a trace to protocol text and its out-of-band parameters
    pub fn compile(&mut self, trace: impl Into<Trace>) -> CompileResult<CompiledFragment> {
        let built = expr::builder::build(&mut self.session, None, &trace.into())?;
        self.compile_expr(&built)
    }

    /// Serialize an already-built expression
    pub fn compile_expr(&mut self, expr: &Expr) -> CompileResult<CompiledFragment> {
        let (text, params) = serialize::writer::render_query(&mut self.session, expr)?;
        Ok(CompiledFragment { text, params })
    }

    /// A named constant parameter: renders `@name` at its use site and binds
    /// the serialized value out of band
    pub fn param_const(&self, name: &str, value: impl Into<Value>) -> Expr {
        Expr::Param(ParamExpr {
            name: name.to_string(),
            inner: Box::new(Expr::constant(value.into())),
            return_type: ReturnType::Unresolved,
        })
    }

    /// A named raw-literal parameter: the bound value is emitted verbatim
    pub fn param_raw(&self, name: &str, text: &str) -> Expr {
        Expr::Param(ParamExpr {
            name: name.to_string(),
            inner: Box::new(Expr::typed_constant(
                Value::Raw(text.to_string()),
                schema::edm::unknown(),
            )),
            return_type: ReturnType::Type(schema::edm::unknown()),
        })
    }

    /// A named cross-reference parameter: the bound value is another
    /// expression's rendered path
    pub fn param_ref(&mut self, name: &str, trace: impl Into<Trace>) -> CompileResult<Expr> {
        let inner = expr::builder::build(&mut self.session, None, &trace.into())?;
        let return_type = inner.return_type().clone();
        Ok(Expr::Param(ParamExpr {
            name: name.to_string(),
            inner: Box::new(inner),
            return_type,
        }))
    }
}

/// Odalite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Odalite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
