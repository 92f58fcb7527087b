// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-compilation session state
//!
//! The alias counter, the parameter accumulator, and the warn-once set are
//! explicit session state rather than ambient module state, so independent
//! compilations never observe each other.

use std::collections::BTreeSet;

use log::warn;

use crate::schema::types::{SchemaModel, TypeRef};
use crate::serialize::writer::ParamBinding;
use crate::trace::AliasGenerator;

/// The entity type navigation currently resolves against, plus the alias its
/// root renders as (collection predicates push aliased scopes)
#[derive(Debug, Clone)]
pub struct Scope {
    pub entity_type: TypeRef,
    pub alias: Option<String>,
}

/// State threaded through one compiler session
#[derive(Debug)]
pub struct Session<'s> {
    pub schema: &'s SchemaModel,
    scopes: Vec<Scope>,
    aliases: AliasGenerator,
    /// Bindings produced by rewrite rules that serialize sub-expressions
    /// before the main emission walk reaches them
    pub pending_params: Vec<ParamBinding>,
    warned: BTreeSet<String>,
}

impl<'s> Session<'s> {
    pub fn new(schema: &'s SchemaModel, entity_type: TypeRef) -> Self {
        Self {
            schema,
            scopes: vec![Scope {
                entity_type,
                alias: None,
            }],
            aliases: AliasGenerator::new(),
            pending_params: Vec::new(),
            warned: BTreeSet::new(),
        }
    }

    /// The innermost navigation scope
    pub fn scope(&self) -> &Scope {
        self.scopes.last().expect("session always has a root scope")
    }

    pub fn push_scope(&mut self, entity_type: TypeRef, alias: Option<String>) {
        self.scopes.push(Scope { entity_type, alias });
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "root scope must not be popped");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// A collision-free alias for the current compilation pass
    pub fn next_alias(&mut self) -> String {
        self.aliases.next_alias()
    }

    /// Emit a warning at most once per key for the session, to avoid
    /// flooding logs when the same fallback fires per row of a query
    pub fn warn_once(&mut self, key: &str, message: impl FnOnce() -> String) {
        if self.warned.insert(key.to_string()) {
            warn!("{}", message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::edm;

    #[test]
    fn test_scope_stack() {
        let schema = SchemaModel::new();
        let mut session = Session::new(&schema, edm::string());
        assert!(session.scope().alias.is_none());

        session.push_scope(edm::int32(), Some("a".to_string()));
        assert_eq!(session.scope().alias.as_deref(), Some("a"));
        assert_eq!(session.scope().entity_type, edm::int32());

        session.pop_scope();
        assert_eq!(session.scope().entity_type, edm::string());
    }

    #[test]
    fn test_warn_once_deduplicates_by_key() {
        // warn! evaluates its message lazily, only when the log level admits
        // the record; without this the Off default skips the closure entirely.
        log::set_max_level(log::LevelFilter::Warn);
        let schema = SchemaModel::new();
        let mut session = Session::new(&schema, edm::string());
        let mut calls = 0;
        for _ in 0..3 {
            session.warn_once("k", || {
                calls += 1;
                "warned".to_string()
            });
        }
        assert_eq!(calls, 1);
    }
}
