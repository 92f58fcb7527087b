// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema model and type-compatibility rules
//!
//! The model arrives fully populated (the metadata parser lives outside this
//! crate) and is read-only for the lifetime of a compiler session.

pub mod assignable;
pub mod edm;
pub mod types;

pub use self::assignable::{is_assignable, is_assignable_single};
pub use self::types::{
    ComplexType, EnumType, FunctionDef, FunctionParam, PropertyDef, ResolvedType, SchemaModel,
    SchemaType, TypeName, TypeRef,
};
