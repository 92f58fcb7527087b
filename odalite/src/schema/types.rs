// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
// Core schema model definitions for the remote entity schema

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::schema::edm;

/// A (possibly collection-wrapped) reference to a primitive, complex, or enum
/// type. Collections nest recursively for arrays of arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeRef {
    Named { namespace: String, name: String },
    Collection { element: Box<TypeRef> },
}

impl TypeRef {
    pub fn named(namespace: &str, name: &str) -> Self {
        TypeRef::Named {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn collection(element: TypeRef) -> Self {
        TypeRef::Collection {
            element: Box::new(element),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeRef::Collection { .. })
    }

    /// Element type of a collection, or the type itself for non-collections
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::Collection { element } => element,
            other => other,
        }
    }

    /// Fully qualified `Namespace.Name`; collections render as `Collection(...)`
    pub fn qualified_name(&self) -> String {
        match self {
            TypeRef::Named { namespace, name } => {
                if namespace.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", namespace, name)
                }
            }
            TypeRef::Collection { element } => {
                format!("Collection({})", element.qualified_name())
            }
        }
    }

    pub fn is_edm(&self) -> bool {
        matches!(self, TypeRef::Named { namespace, .. } if namespace == edm::EDM_NAMESPACE)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Bare `Namespace.Name` pair used where a collection wrapper is not legal,
/// e.g. a complex type's base-type reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn as_type_ref(&self) -> TypeRef {
        TypeRef::named(&self.namespace, &self.name)
    }
}

/// A property declared on a complex type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    #[serde(rename = "type")]
    pub property_type: TypeRef,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub navigation: bool,
}

/// One parameter of a schema-declared function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: TypeRef,
    #[serde(default)]
    pub is_binding_parameter: bool,
}

/// A function declared in the schema, bound to an entity type or unbound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: TypeRef,
}

impl FunctionDef {
    /// Parameters excluding the binding parameter
    pub fn non_binding_params(&self) -> impl Iterator<Item = &FunctionParam> {
        self.params.iter().filter(|p| !p.is_binding_parameter)
    }
}

/// A structured (entity or complex) type in the schema model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexType {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub base_type: Option<TypeName>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
    #[serde(default)]
    pub key_properties: Option<Vec<String>>,
    /// Functions bound to this type (first parameter is the binding parameter)
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

impl ComplexType {
    pub fn type_name(&self) -> TypeName {
        TypeName::new(&self.namespace, &self.name)
    }
}

/// An enumeration type in the schema model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub namespace: String,
    /// Member name to underlying numeric value. BTreeMap keeps reverse lookup
    /// deterministic (member-name order).
    pub members: BTreeMap<String, i64>,
}

/// A named type stored in the schema model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SchemaType {
    Complex(ComplexType),
    Enum(EnumType),
}

/// Result of resolving a TypeRef against the model
#[derive(Debug, Clone, Copy)]
pub enum ResolvedType<'a> {
    Complex(&'a ComplexType),
    Enum(&'a EnumType),
    /// An `Edm.*` primitive, or one of the reserved pseudo-types
    Primitive,
}

/// Immutable description of remote entity types, properties, enums, and
/// functions. Constructed once per session, never mutated by the compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    /// namespace -> type name -> definition
    pub namespaces: BTreeMap<String, BTreeMap<String, SchemaType>>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a schema model from the JSON document the metadata parser
    /// produces
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Insert a type definition, creating its namespace on demand. Intended
    /// for model construction before the compiler session starts.
    pub fn insert(&mut self, schema_type: SchemaType) {
        let (namespace, name) = match &schema_type {
            SchemaType::Complex(c) => (c.namespace.clone(), c.name.clone()),
            SchemaType::Enum(e) => (e.namespace.clone(), e.name.clone()),
        };
        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(name, schema_type);
    }

    fn get(&self, namespace: &str, name: &str) -> Option<&SchemaType> {
        self.namespaces.get(namespace)?.get(name)
    }

    /// Resolve a TypeRef to its schema definition. Collection wrappers are
    /// unwrapped to their innermost element type first. Edm and reserved
    /// namespaces resolve as primitives; any other absent namespace/name
    /// pair is fatal.
    pub fn lookup(&self, type_ref: &TypeRef) -> CompileResult<ResolvedType<'_>> {
        let mut element = type_ref;
        while let TypeRef::Collection { element: inner } = element {
            element = inner;
        }
        let TypeRef::Named { namespace, name } = element else {
            unreachable!("the unwrap loop ends on a named type");
        };
        if namespace == edm::EDM_NAMESPACE || edm::is_reserved_namespace(namespace) {
            return Ok(ResolvedType::Primitive);
        }
        match self.get(namespace, name) {
            Some(SchemaType::Complex(c)) => Ok(ResolvedType::Complex(c)),
            Some(SchemaType::Enum(e)) => Ok(ResolvedType::Enum(e)),
            None => Err(CompileError::NotFound(element.qualified_name())),
        }
    }

    pub fn lookup_complex(&self, type_ref: &TypeRef) -> Option<&ComplexType> {
        match self.lookup(type_ref) {
            Ok(ResolvedType::Complex(c)) => Some(c),
            _ => None,
        }
    }

    pub fn lookup_enum(&self, type_ref: &TypeRef) -> Option<&EnumType> {
        match self.lookup(type_ref) {
            Ok(ResolvedType::Enum(e)) => Some(e),
            _ => None,
        }
    }

    /// Base type of a complex type, if declared and present in the model
    pub fn find_base_type(&self, complex: &ComplexType) -> Option<&ComplexType> {
        let base = complex.base_type.as_ref()?;
        match self.get(&base.namespace, &base.name) {
            Some(SchemaType::Complex(c)) => Some(c),
            _ => None,
        }
    }

    /// Type of a property, walking the base-type chain. First match wins, so
    /// a namesake clash between parent and child resolves to the child.
    pub fn find_property_type(&self, complex: &ComplexType, name: &str) -> Option<TypeRef> {
        let mut current = Some(complex);
        while let Some(c) = current {
            if let Some(prop) = c.properties.get(name) {
                return Some(prop.property_type.clone());
            }
            current = self.find_base_type(c);
        }
        None
    }

    /// Functions bound to a complex type with a given name, walking the
    /// base-type chain
    pub fn find_bound_functions<'a>(
        &'a self,
        complex: &'a ComplexType,
        name: &str,
    ) -> Vec<&'a FunctionDef> {
        let mut found = Vec::new();
        let mut current = Some(complex);
        while let Some(c) = current {
            found.extend(c.functions.iter().filter(|f| f.name == name));
            current = self.find_base_type(c);
        }
        found
    }

    /// Walk the subtype chain from `from` upward; true if `to` is an ancestor
    pub fn is_subtype_of(&self, from: &TypeRef, to: &TypeRef) -> bool {
        let (Some(mut current), TypeRef::Named { namespace, name }) =
            (self.lookup_complex(from), to)
        else {
            return false;
        };
        while let Some(base) = self.find_base_type(current) {
            if base.namespace == *namespace && base.name == *name {
                return true;
            }
            current = base;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_model() -> SchemaModel {
        let mut model = SchemaModel::new();
        model.insert(SchemaType::Complex(ComplexType {
            name: "Entity".to_string(),
            namespace: "My".to_string(),
            base_type: None,
            properties: BTreeMap::from([
                (
                    "Id".to_string(),
                    PropertyDef {
                        property_type: TypeRef::named("Edm", "Guid"),
                        nullable: false,
                        navigation: false,
                    },
                ),
                (
                    "Tag".to_string(),
                    PropertyDef {
                        property_type: TypeRef::named("Edm", "Int32"),
                        nullable: true,
                        navigation: false,
                    },
                ),
            ]),
            key_properties: Some(vec!["Id".to_string()]),
            functions: Vec::new(),
        }));
        model.insert(SchemaType::Complex(ComplexType {
            name: "Person".to_string(),
            namespace: "My".to_string(),
            base_type: Some(TypeName::new("My", "Entity")),
            properties: BTreeMap::from([(
                "Tag".to_string(),
                PropertyDef {
                    property_type: TypeRef::named("Edm", "String"),
                    nullable: true,
                    navigation: false,
                },
            )]),
            key_properties: None,
            functions: Vec::new(),
        }));
        model
    }

    #[test]
    fn test_property_falls_back_to_base_type() {
        let model = person_model();
        let person = model
            .lookup_complex(&TypeRef::named("My", "Person"))
            .unwrap();

        let id = model.find_property_type(person, "Id").unwrap();
        assert_eq!(id, TypeRef::named("Edm", "Guid"));
    }

    #[test]
    fn test_namesake_property_resolves_to_child() {
        let model = person_model();
        let person = model
            .lookup_complex(&TypeRef::named("My", "Person"))
            .unwrap();

        // Both Entity and Person declare Tag; the child wins.
        let tag = model.find_property_type(person, "Tag").unwrap();
        assert_eq!(tag, TypeRef::named("Edm", "String"));
    }

    #[test]
    fn test_lookup_missing_type_is_fatal() {
        let model = person_model();
        let result = model.lookup(&TypeRef::named("My", "Nope"));
        assert!(matches!(result, Err(CompileError::NotFound(_))));
    }

    #[test]
    fn test_edm_types_resolve_as_primitives() {
        let model = person_model();
        let result = model.lookup(&TypeRef::named("Edm", "String")).unwrap();
        assert!(matches!(result, ResolvedType::Primitive));
    }

    #[test]
    fn test_subtype_chain_walk() {
        let model = person_model();
        assert!(model.is_subtype_of(
            &TypeRef::named("My", "Person"),
            &TypeRef::named("My", "Entity")
        ));
        assert!(!model.is_subtype_of(
            &TypeRef::named("My", "Entity"),
            &TypeRef::named("My", "Person")
        ));
    }

    #[test]
    fn test_schema_model_json_round_trip() {
        let model = person_model();
        let json = serde_json::to_string(&model).unwrap();
        let back = SchemaModel::from_json(&json).unwrap();
        assert!(back
            .lookup_complex(&TypeRef::named("My", "Person"))
            .is_some());
    }
}
