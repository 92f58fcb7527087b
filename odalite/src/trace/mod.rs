// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Fluent-call recording
//!
//! Recording never evaluates semantics: property navigation and invocation
//! accumulate as a replayable list of steps, so the same callback can be
//! replayed against different aliases to build independent sub-predicates.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::expr::tree::Expr;
use crate::serialize::value::Value;

/// The semantic binding of a trace's first symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Root {
    /// The query's own entity type (or the aliased element type inside a
    /// collection predicate)
    Entity,
    /// A query-utility namespace, e.g. `filter` or `orderby`
    Utility(String),
}

/// One recorded fluent step
#[derive(Debug, Clone)]
pub enum Step {
    Get(String),
    Apply(Vec<TraceArg>),
    /// Invocation with named arguments (sub-path function calls); matched
    /// against overloads by name set, independent of order
    ApplyNamed(Vec<(String, TraceArg)>),
}

/// Sort direction for order-by pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// A callback replayed by rewrite rules against a freshly aliased root
#[derive(Clone)]
pub struct Lambda(Rc<dyn Fn(TraceBuilder) -> TraceArg>);

impl Lambda {
    pub fn new(f: impl Fn(TraceBuilder) -> TraceArg + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn replay(&self, scope: TraceBuilder) -> TraceArg {
        (self.0)(scope)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda(..)")
    }
}

/// A caller-supplied value-to-text function registered by the mapper rewrite
#[derive(Clone)]
pub struct Mapper(Rc<dyn Fn(&Value) -> String>);

impl Mapper {
    pub fn new(f: impl Fn(&Value) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn apply(&self, value: &Value) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mapper(..)")
    }
}

/// A caller-supplied function combining rendered property texts into one raw
/// filter fragment
#[derive(Clone)]
pub struct RawExecutor(Rc<dyn Fn(&BTreeMap<String, String>) -> String>);

impl RawExecutor {
    pub fn new(f: impl Fn(&BTreeMap<String, String>) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn apply(&self, rendered: &BTreeMap<String, String>) -> String {
        (self.0)(rendered)
    }
}

impl fmt::Debug for RawExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawExecutor(..)")
    }
}

/// One argument recorded into an `Apply` step
#[derive(Debug, Clone)]
pub enum TraceArg {
    /// A nested navigation/invocation chain
    Sub(Trace),
    /// Terminal injection: an already-built expression handed back instead
    /// of continuing traversal
    Expr(Expr),
    /// A plain literal value
    Value(Value),
    /// An (argument, direction) order-by pair
    Pair(Box<TraceArg>, SortDirection),
    /// A collection-predicate or expansion callback
    Lambda(Lambda),
    /// A named map of property paths for raw filter construction
    Map(Vec<(String, Trace)>),
    /// A literal-to-text mapper
    Mapper(Mapper),
    /// A rendered-texts-to-fragment executor
    Executor(RawExecutor),
}

/// A recorded fluent chain: a root context plus ordered steps
#[derive(Debug, Clone)]
pub struct Trace {
    pub root: Root,
    pub steps: Vec<Step>,
}

/// Fluent recording handle. Consuming-`self` methods keep chains terse:
/// `TraceBuilder::entity().get("Name")`.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    root: Root,
    steps: Vec<Step>,
}

impl TraceBuilder {
    /// Start a chain at the ambient entity type
    pub fn entity() -> Self {
        Self {
            root: Root::Entity,
            steps: Vec::new(),
        }
    }

    /// Start a chain at a query-utility namespace
    pub fn utility(namespace: &str) -> Self {
        Self {
            root: Root::Utility(namespace.to_string()),
            steps: Vec::new(),
        }
    }

    /// Record property navigation
    pub fn get(mut self, name: &str) -> Self {
        self.steps.push(Step::Get(name.to_string()));
        self
    }

    /// Record an invocation with positional arguments
    pub fn apply(mut self, args: Vec<TraceArg>) -> Self {
        self.steps.push(Step::Apply(args));
        self
    }

    /// Record an invocation with named arguments
    pub fn apply_named(mut self, args: Vec<(String, TraceArg)>) -> Self {
        self.steps.push(Step::ApplyNamed(args));
        self
    }

    pub fn finish(self) -> Trace {
        Trace {
            root: self.root,
            steps: self.steps,
        }
    }
}

impl From<TraceBuilder> for Trace {
    fn from(builder: TraceBuilder) -> Self {
        builder.finish()
    }
}

impl From<TraceBuilder> for TraceArg {
    fn from(builder: TraceBuilder) -> Self {
        TraceArg::Sub(builder.finish())
    }
}

impl TraceArg {
    /// Record a plain literal
    pub fn value(value: impl Into<Value>) -> Self {
        TraceArg::Value(value.into())
    }

    /// Record a nested chain
    pub fn sub(builder: TraceBuilder) -> Self {
        TraceArg::Sub(builder.finish())
    }

    /// Record an order-by (argument, direction) pair
    pub fn pair(arg: TraceArg, direction: SortDirection) -> Self {
        TraceArg::Pair(Box::new(arg), direction)
    }
}

/// Mints collision-free aliases for collection predicates within one
/// compilation pass: `a..z`, then `aa..az`, and so on
#[derive(Debug, Default)]
pub struct AliasGenerator {
    next: usize,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_alias(&mut self) -> String {
        let mut n = self.next;
        self.next += 1;
        let mut alias = String::new();
        loop {
            alias.insert(0, (b'a' + (n % 26) as u8) as char);
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        alias
    }
}
