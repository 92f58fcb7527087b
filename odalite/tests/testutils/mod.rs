//! Shared schema fixture for integration tests
//!
//! Models a small People service: an abstract base entity, a Person with
//! scalar/temporal/collection properties, a Pet, an enum with an ambiguous
//! value pair, and two bound functions (one of them not URL-serializable).

use std::collections::BTreeMap;

use odalite::schema::types::{
    ComplexType, EnumType, FunctionDef, FunctionParam, PropertyDef, SchemaModel, SchemaType,
    TypeName, TypeRef,
};
use odalite::QueryCompiler;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn property(type_ref: TypeRef) -> PropertyDef {
    PropertyDef {
        property_type: type_ref,
        nullable: false,
        navigation: false,
    }
}

fn navigation(type_ref: TypeRef) -> PropertyDef {
    PropertyDef {
        property_type: type_ref,
        nullable: true,
        navigation: true,
    }
}

pub fn people_schema() -> SchemaModel {
    let mut model = SchemaModel::new();

    model.insert(SchemaType::Complex(ComplexType {
        name: "Entity".to_string(),
        namespace: "People".to_string(),
        base_type: None,
        properties: BTreeMap::from([("Id".to_string(), property(TypeRef::named("Edm", "Guid")))]),
        key_properties: Some(vec!["Id".to_string()]),
        functions: Vec::new(),
    }));

    model.insert(SchemaType::Complex(ComplexType {
        name: "Pet".to_string(),
        namespace: "People".to_string(),
        base_type: None,
        properties: BTreeMap::from([
            ("Name".to_string(), property(TypeRef::named("Edm", "String"))),
            ("Age".to_string(), property(TypeRef::named("Edm", "Int32"))),
        ]),
        key_properties: None,
        functions: Vec::new(),
    }));

    model.insert(SchemaType::Enum(EnumType {
        name: "Color".to_string(),
        namespace: "People".to_string(),
        members: BTreeMap::from([
            ("Blue".to_string(), 1),
            ("Green".to_string(), 2),
            // Gray and Grey share a value; reverse lookup warns and picks
            // the first in member order.
            ("Gray".to_string(), 4),
            ("Grey".to_string(), 4),
        ]),
    }));

    model.insert(SchemaType::Complex(ComplexType {
        name: "Person".to_string(),
        namespace: "People".to_string(),
        base_type: Some(TypeName::new("People", "Entity")),
        properties: BTreeMap::from([
            ("Name".to_string(), property(TypeRef::named("Edm", "String"))),
            ("Age".to_string(), property(TypeRef::named("Edm", "Int32"))),
            (
                "Height".to_string(),
                property(TypeRef::named("Edm", "Double")),
            ),
            (
                "DateOfBirth".to_string(),
                property(TypeRef::named("Edm", "Date")),
            ),
            (
                "LastSeen".to_string(),
                property(TypeRef::named("Edm", "DateTimeOffset")),
            ),
            (
                "WakeTime".to_string(),
                property(TypeRef::named("Edm", "TimeOfDay")),
            ),
            (
                "Tenure".to_string(),
                property(TypeRef::named("Edm", "Duration")),
            ),
            (
                "Photo".to_string(),
                property(TypeRef::named("Edm", "Binary")),
            ),
            (
                "Color".to_string(),
                property(TypeRef::named("People", "Color")),
            ),
            (
                "Tags".to_string(),
                property(TypeRef::collection(TypeRef::named("Edm", "String"))),
            ),
            (
                "Pets".to_string(),
                navigation(TypeRef::collection(TypeRef::named("People", "Pet"))),
            ),
            (
                "Friends".to_string(),
                navigation(TypeRef::collection(TypeRef::named("People", "Person"))),
            ),
            (
                "BestFriend".to_string(),
                navigation(TypeRef::named("People", "Person")),
            ),
        ]),
        key_properties: None,
        functions: vec![
            FunctionDef {
                name: "Score".to_string(),
                params: vec![
                    FunctionParam {
                        name: "it".to_string(),
                        param_type: TypeRef::named("People", "Person"),
                        is_binding_parameter: true,
                    },
                    FunctionParam {
                        name: "factor".to_string(),
                        param_type: TypeRef::named("Edm", "Int32"),
                        is_binding_parameter: false,
                    },
                ],
                return_type: TypeRef::named("Edm", "Double"),
            },
            FunctionDef {
                name: "Evaluate".to_string(),
                params: vec![
                    FunctionParam {
                        name: "it".to_string(),
                        param_type: TypeRef::named("People", "Person"),
                        is_binding_parameter: true,
                    },
                    FunctionParam {
                        name: "options".to_string(),
                        param_type: TypeRef::named("People", "Pet"),
                        is_binding_parameter: false,
                    },
                ],
                return_type: TypeRef::named("Edm", "Double"),
            },
        ],
    }));

    model
}

pub fn person_compiler(schema: &SchemaModel) -> QueryCompiler<'_> {
    QueryCompiler::new(schema, TypeRef::named("People", "Person"))
}
