// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Type assignability rules: exact match, subtype chain, and the implicit
//! conversion closure

use std::collections::HashSet;

use crate::schema::edm;
use crate::schema::types::{SchemaModel, TypeRef};

/// True iff every `from` member is assignable to at least one `to` member.
/// Sum types act as OR on both sides.
pub fn is_assignable(from: &[TypeRef], to: &[TypeRef], schema: &SchemaModel) -> bool {
    from.iter()
        .all(|f| to.iter().any(|t| is_assignable_single(f, t, schema)))
}

/// Assignability for a single pair of type refs
pub fn is_assignable_single(from: &TypeRef, to: &TypeRef, schema: &SchemaModel) -> bool {
    match (from, to) {
        // Collections only match same-depth collections of assignable elements.
        (TypeRef::Collection { element: fe }, TypeRef::Collection { element: te }) => {
            is_assignable_single(fe, te, schema)
        }
        (TypeRef::Collection { .. }, _) | (_, TypeRef::Collection { .. }) => false,
        _ => {
            if from == to {
                return true;
            }
            if schema.is_subtype_of(from, to) {
                return true;
            }
            conversion_closure_reaches(from, to)
        }
    }
}

/// Depth-first search through the implicit conversion table. Entries chain
/// (A -> B -> Any), and the table is small, so a visited set is enough to
/// keep the walk bounded and cycle-free.
fn conversion_closure_reaches(from: &TypeRef, to: &TypeRef) -> bool {
    let mut visited: HashSet<TypeRef> = HashSet::new();
    let mut stack: Vec<TypeRef> = vec![from.clone()];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for target in edm::conversion_targets(&current) {
            if target == to || (edm::is_any(to) && edm::is_any(target)) {
                return true;
            }
            if !visited.contains(target) {
                stack.push(target.clone());
            }
        }
    }
    false
}
