// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Edm primitive vocabulary, reserved pseudo-types, and the implicit
//! conversion table consulted by assignability resolution

use once_cell::sync::Lazy;

use crate::schema::types::TypeRef;

/// Namespace of the OData primitive types
pub const EDM_NAMESPACE: &str = "Edm";

/// Reserved namespace for the pseudo-type group sinks (`Number`, `Text`,
/// `Any`) and the raw/unknown-output tag
pub const SYS_NAMESPACE: &str = "Odalite.Sys";

/// Reserved namespace marking generic placeholder tokens in signatures
pub const GENERIC_NAMESPACE: &str = "Odalite.Generic";

/// Reserved namespace marking query-utility namespace members
pub const UTILITY_NAMESPACE: &str = "Odalite.Utility";

pub fn is_reserved_namespace(namespace: &str) -> bool {
    namespace == SYS_NAMESPACE || namespace == GENERIC_NAMESPACE || namespace == UTILITY_NAMESPACE
}

macro_rules! edm_type {
    ($fn_name:ident, $name:literal) => {
        pub fn $fn_name() -> TypeRef {
            TypeRef::named(EDM_NAMESPACE, $name)
        }
    };
}

edm_type!(string, "String");
edm_type!(boolean, "Boolean");
edm_type!(byte, "Byte");
edm_type!(sbyte, "SByte");
edm_type!(int16, "Int16");
edm_type!(int32, "Int32");
edm_type!(int64, "Int64");
edm_type!(single, "Single");
edm_type!(double, "Double");
edm_type!(decimal, "Decimal");
edm_type!(guid, "Guid");
edm_type!(binary, "Binary");
edm_type!(date, "Date");
edm_type!(time_of_day, "TimeOfDay");
edm_type!(date_time_offset, "DateTimeOffset");
edm_type!(duration, "Duration");

/// Pseudo-type accepted by any numeric primitive and vice versa
pub fn number() -> TypeRef {
    TypeRef::named(SYS_NAMESPACE, "Number")
}

/// Pseudo-type accepted by the string-convertible primitives and vice versa
pub fn text() -> TypeRef {
    TypeRef::named(SYS_NAMESPACE, "Text")
}

/// Universal one-way sink: every convertible source is assignable to it
pub fn any() -> TypeRef {
    TypeRef::named(SYS_NAMESPACE, "Any")
}

/// Tag for expressions with raw/unknown output. Accepted against any target
/// during overload validation and re-typed to match.
pub fn unknown() -> TypeRef {
    TypeRef::named(SYS_NAMESPACE, "Unknown")
}

pub fn is_unknown(type_ref: &TypeRef) -> bool {
    matches!(
        type_ref,
        TypeRef::Named { namespace, name }
            if namespace == SYS_NAMESPACE && name == "Unknown"
    )
}

/// True for the reserved group sinks (`Number`, `Text`, `Any`, `Unknown`);
/// generic narrowing prefers a concrete type over these
pub fn is_pseudo(type_ref: &TypeRef) -> bool {
    matches!(
        type_ref,
        TypeRef::Named { namespace, .. } if namespace == SYS_NAMESPACE
    )
}

pub fn is_any(type_ref: &TypeRef) -> bool {
    matches!(
        type_ref,
        TypeRef::Named { namespace, name }
            if namespace == SYS_NAMESPACE && name == "Any"
    )
}

/// A generic placeholder token, bound to a concrete type per call
pub fn generic(token: &str) -> TypeRef {
    TypeRef::named(GENERIC_NAMESPACE, token)
}

pub fn is_generic(type_ref: &TypeRef) -> bool {
    matches!(
        type_ref,
        TypeRef::Named { namespace, .. } if namespace == GENERIC_NAMESPACE
    )
}

/// Marker type of a query-utility namespace root or sub-namespace. The name
/// holds the slash-joined path into the catalog.
pub fn utility(path: &str) -> TypeRef {
    TypeRef::named(UTILITY_NAMESPACE, path)
}

pub fn utility_path(type_ref: &TypeRef) -> Option<&str> {
    match type_ref {
        TypeRef::Named { namespace, name } if namespace == UTILITY_NAMESPACE => Some(name),
        _ => None,
    }
}

const NUMERIC_NAMES: &[&str] = &[
    "Byte", "SByte", "Int16", "Int32", "Int64", "Single", "Double", "Decimal",
];

const TEXT_NAMES: &[&str] = &[
    "String",
    "Guid",
    "Binary",
    "Date",
    "TimeOfDay",
    "DateTimeOffset",
    "Duration",
];

/// One-way implicit conversion edges. Entries chain (A -> B -> Any), so
/// assignability runs a depth-first closure search over this table rather
/// than a single-step lookup.
pub static CONVERSION_TABLE: Lazy<Vec<(TypeRef, TypeRef)>> = Lazy::new(|| {
    let mut table = Vec::new();

    // Numeric primitives are mutually convertible through the Number group.
    for name in NUMERIC_NAMES {
        let t = TypeRef::named(EDM_NAMESPACE, name);
        table.push((t.clone(), number()));
        table.push((number(), t));
    }

    // String-like primitives are mutually convertible through the Text group.
    for name in TEXT_NAMES {
        let t = TypeRef::named(EDM_NAMESPACE, name);
        table.push((t.clone(), text()));
        table.push((text(), t));
    }

    // Every convertible source flows one-way into the Any sink.
    table.push((number(), any()));
    table.push((text(), any()));
    table.push((boolean(), any()));

    table
});

/// Direct conversion successors of a type in the table
pub fn conversion_targets(from: &TypeRef) -> impl Iterator<Item = &'static TypeRef> + '_ {
    CONVERSION_TABLE
        .iter()
        .filter(move |(src, _)| src == from)
        .map(|(_, dst)| dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_kinds_chain_through_number() {
        let targets: Vec<_> = conversion_targets(&int32()).collect();
        assert!(targets.contains(&&number()));

        let from_number: Vec<_> = conversion_targets(&number()).collect();
        assert!(from_number.contains(&&double()));
        assert!(from_number.contains(&&any()));
    }

    #[test]
    fn test_any_is_one_way() {
        assert_eq!(conversion_targets(&any()).count(), 0);
    }

    #[test]
    fn test_reserved_namespace_detection() {
        assert!(is_reserved_namespace(SYS_NAMESPACE));
        assert!(is_reserved_namespace(GENERIC_NAMESPACE));
        assert!(!is_reserved_namespace(EDM_NAMESPACE));
        assert!(is_generic(&generic("T")));
        assert!(!is_generic(&string()));
    }
}
