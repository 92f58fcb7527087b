// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Compile error taxonomy and the crate-wide `CompileResult` alias

use thiserror::Error;

/// Every way compiling a trace into protocol text can fail
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Property '{property}' accessed on a value of unknown type")]
    PropertyOfUnknownType { property: String },

    #[error("Property '{property}' not found on type {on_type}")]
    PropertyNotFound { property: String, on_type: String },

    #[error("Value is not callable: {0}")]
    NotCallable(String),

    #[error("No matching overload for '{name}':\n{explanations}")]
    NoMatchingOverload { name: String, explanations: String },

    #[error("Rewrite argument contract violated for {signature} (argument '{argument}'): {message}")]
    RewriteContract {
        signature: String,
        argument: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid structured value: {0}")]
    InvalidStructuredValue(String),

    #[error("Function '{name}' is not executable: {reasons}")]
    NotExecutable { name: String, reasons: String },

    #[error("Duplicate parameter name: {0}")]
    DuplicateParameterName(String),
}

/// Result specialized to [`CompileError`]
pub type CompileResult<T> = Result<T, CompileError>;
