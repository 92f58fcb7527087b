// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression serialization
//!
//! Walks a fully resolved expression tree to protocol text, threading the
//! out-of-band parameter accumulator through each recursive step by
//! concatenation. Constant rendering is type-directed; values whose type
//! never resolved fall back to quote-if-text-else-pass-through with a
//! one-time warning per distinct value kind.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::expr::tree::{Expr, StringPart};
use crate::functions::signature::{CallStyle, Executable};
use crate::schema::edm;
use crate::schema::types::{EnumType, TypeRef};
use crate::serialize::value::{
    base64_encode, DateValue, DurationValue, EnumValue, TimeValue, Value,
};
use crate::serialize::value::DateTimeValue;
use crate::session::Session;

/// One out-of-band parameter: rendered `@name` at its use site, attached to
/// the request as a separate query-string entry by the URI assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBinding {
    pub name: String,
    pub serialized_value: String,
    pub declared_type: Option<TypeRef>,
}

/// Serialize a top-level query expression. Duplicate parameter names dedupe
/// silently when value and type agree and are a hard error otherwise.
pub fn render_query(
    session: &mut Session<'_>,
    expr: &Expr,
) -> CompileResult<(String, Vec<ParamBinding>)> {
    let mut params = std::mem::take(&mut session.pending_params);
    let text = render(session, expr, None, &mut params)?;
    let params = finalize_params(params)?;
    Ok((text, params))
}

/// Serialize a nested query independently. Its bindings merge into the
/// enclosing query later; duplicates across independently-serialized nested
/// queries are permitted.
pub(crate) fn render_standalone(
    session: &mut Session<'_>,
    expr: &Expr,
) -> CompileResult<(String, Vec<ParamBinding>)> {
    let mut params = Vec::new();
    let text = render(session, expr, None, &mut params)?;
    Ok((text, params))
}

fn finalize_params(params: Vec<ParamBinding>) -> CompileResult<Vec<ParamBinding>> {
    let mut out: Vec<ParamBinding> = Vec::new();
    for param in params {
        if let Some(existing) = out.iter().find(|e| e.name == param.name) {
            if existing.serialized_value == param.serialized_value
                && existing.declared_type == param.declared_type
            {
                continue;
            }
            return Err(CompileError::DuplicateParameterName(param.name));
        }
        out.push(param);
    }
    Ok(out)
}

fn render(
    session: &mut Session<'_>,
    expr: &Expr,
    alias_env: Option<&str>,
    params: &mut Vec<ParamBinding>,
) -> CompileResult<String> {
    match expr {
        Expr::Const(c) => render_const(session, &c.value, c.return_type.as_type()),
        Expr::Prop(p) => {
            let parent = render(session, &p.parent, alias_env, params)?;
            if parent.is_empty() {
                Ok(p.name.clone())
            } else {
                Ok(format!("{}/{}", parent, p.name))
            }
        }
        // A root with its own alias keeps it; otherwise the active alias
        // installed by the nearest ReContexted ancestor applies.
        Expr::Root(r) => Ok(r
            .alias
            .clone()
            .or_else(|| alias_env.map(str::to_string))
            .unwrap_or_default()),
        Expr::Call(call) => {
            if let Executable::No(blocks) = &call.signature.executable {
                let reasons: Vec<String> = blocks
                    .iter()
                    .map(|b| format!("{} (argument '{}')", b.reason, b.arg_name))
                    .collect();
                return Err(CompileError::NotExecutable {
                    name: call.signature.name.clone(),
                    reasons: reasons.join("; "),
                });
            }

            let prefix = match &call.receiver {
                Some(receiver) => {
                    let text = render(session, receiver, alias_env, params)?;
                    if text.is_empty() {
                        String::new()
                    } else {
                        format!("{}/", text)
                    }
                }
                None => String::new(),
            };

            let rendered: Vec<String> = call
                .args
                .iter()
                .map(|arg| render(session, arg, alias_env, params))
                .collect::<CompileResult<_>>()?;

            let body = match &call.signature.call_style {
                CallStyle::Infix { operator } => rendered.join(operator),
                CallStyle::Function { name, separator } => {
                    if !call.arg_names.is_empty() && call.arg_names.len() == rendered.len() {
                        let named: Vec<String> = call
                            .arg_names
                            .iter()
                            .zip(&rendered)
                            .map(|(n, v)| format!("{}={}", n, v))
                            .collect();
                        format!("{}({})", name, named.join(separator))
                    } else {
                        format!("{}({})", name, rendered.join(separator))
                    }
                }
            };
            Ok(format!("{}{}", prefix, body))
        }
        Expr::StringBuilder(sb) => {
            let mut out = match &sb.parent {
                Some(parent) => render(session, parent, alias_env, params)?,
                None => String::new(),
            };
            for part in &sb.parts {
                match part {
                    StringPart::Literal(text) => out.push_str(text),
                    StringPart::Expr(inner) => {
                        out.push_str(&render(session, inner, alias_env, params)?);
                    }
                }
            }
            Ok(out)
        }
        Expr::ReContexted(rc) => render(session, &rc.inner, Some(&rc.alias), params),
        Expr::NamedQuery(nq) => {
            let inner = render(session, &nq.inner, alias_env, params)?;
            Ok(format!("{}($filter={})", nq.root_ref, inner))
        }
        Expr::Param(p) => {
            let mut inner_params = Vec::new();
            // A constant that stayed untyped borrows the parameter's own
            // resolved type for rendering.
            let serialized_value = match (p.inner.as_ref(), p.return_type.as_type()) {
                (Expr::Const(c), Some(t)) if c.return_type.as_type().is_none() => {
                    render_const(session, &c.value, Some(t))?
                }
                _ => render(session, &p.inner, alias_env, &mut inner_params)?,
            };
            params.extend(inner_params);
            let declared_type = p
                .return_type
                .as_type()
                .or_else(|| p.inner.return_type().as_type())
                .cloned();
            params.push(ParamBinding {
                name: p.name.clone(),
                serialized_value,
                declared_type,
            });
            Ok(format!("@{}", p.name))
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn render_const(
    session: &mut Session<'_>,
    value: &Value,
    declared: Option<&TypeRef>,
) -> CompileResult<String> {
    // Raw text always bypasses schema-based rendering.
    if let Value::Raw(text) = value {
        return Ok(text.clone());
    }
    if matches!(value, Value::Null) {
        return Ok("null".to_string());
    }

    let Some(declared) = declared else {
        return Ok(render_fallback(session, value));
    };

    // Collection targets render element-wise, parenthesized.
    if let TypeRef::Collection { element } = declared {
        if let Value::List(items) = value {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| render_const(session, item, Some(element)))
                .collect::<CompileResult<_>>()?;
            return Ok(format!("({})", rendered.join(",")));
        }
    }

    if let Some(enum_type) = session.schema.lookup_enum(declared) {
        let enum_type = enum_type.clone();
        return render_enum(&enum_type, value);
    }

    let TypeRef::Named { namespace, name } = declared.element() else {
        return Ok(render_fallback(session, value));
    };
    if namespace != edm::EDM_NAMESPACE {
        return Ok(render_fallback(session, value));
    }

    let rendered = match (name.as_str(), value) {
        ("String", Value::String(s)) => Some(quote(s)),
        ("Boolean", Value::Bool(b)) => Some(b.to_string()),
        (
            "Byte" | "SByte" | "Int16" | "Int32" | "Int64" | "Single" | "Double" | "Decimal",
            Value::Int(i),
        ) => Some(i.to_string()),
        (
            "Single" | "Double" | "Decimal",
            Value::Float(f),
        ) => Some(f.to_string()),
        ("Guid", Value::Guid(g)) => Some(g.to_string()),
        ("Guid", Value::String(s)) => Some(s.clone()),
        ("Binary", Value::Binary(bytes)) => Some(format!("binary'{}'", base64_encode(bytes))),
        ("Binary", Value::String(s)) => Some(format!("binary'{}'", s)),
        ("Duration", Value::Duration(d)) => Some(format!("duration'{}'", d.render()?)),
        ("Duration", Value::Int(ms)) => {
            Some(format!("duration'{}'", DurationValue::Millis(*ms).render()?))
        }
        ("Duration", Value::String(s)) => Some(format!(
            "duration'{}'",
            DurationValue::Formatted(s.clone()).render()?
        )),
        ("Date", Value::Date(d)) => Some(d.render()?),
        ("Date", Value::String(s)) => Some(DateValue::Formatted(s.clone()).render()?),
        ("TimeOfDay", Value::TimeOfDay(t)) => Some(t.render()?),
        ("TimeOfDay", Value::String(s)) => Some(TimeValue::Formatted(s.clone()).render()?),
        ("DateTimeOffset", Value::DateTimeOffset(dt)) => Some(dt.render()?),
        ("DateTimeOffset", Value::String(s)) => {
            Some(DateTimeValue::Formatted(s.clone()).render()?)
        }
        _ => None,
    };
    Ok(rendered.unwrap_or_else(|| render_fallback(session, value)))
}

fn render_enum(enum_type: &EnumType, value: &Value) -> CompileResult<String> {
    let qualified = format!("{}.{}", enum_type.namespace, enum_type.name);
    let member = match value {
        Value::String(name) | Value::Enum(EnumValue::Member(name)) => {
            if !enum_type.members.contains_key(name) {
                return Err(CompileError::NotFound(format!(
                    "{} has no member '{}'",
                    qualified, name
                )));
            }
            name.clone()
        }
        Value::Int(numeric) | Value::Enum(EnumValue::Numeric(numeric)) => {
            let matches: Vec<&String> = enum_type
                .members
                .iter()
                .filter(|(_, v)| *v == numeric)
                .map(|(k, _)| k)
                .collect();
            match matches.as_slice() {
                [] => {
                    return Err(CompileError::NotFound(format!(
                        "{} has no member with value {}",
                        qualified, numeric
                    )))
                }
                [only] => (*only).clone(),
                [first, ..] => {
                    // Reverse lookup is ambiguous; the first member in name
                    // order wins. Implementation-defined, not an error.
                    warn!(
                        "enum {} value {} maps to {} members; using '{}'",
                        qualified,
                        numeric,
                        matches.len(),
                        first
                    );
                    (*first).clone()
                }
            }
        }
        other => {
            return Err(CompileError::InvalidStructuredValue(format!(
                "a {} literal cannot render as enum {}",
                other.kind_name(),
                qualified
            )))
        }
    };
    Ok(format!("{}'{}'", qualified, member))
}

/// Last-resort rendering for values whose type never resolved: quote if
/// text, else pass through. Warns once per distinct value kind so a query
/// with many such literals does not flood the log.
fn render_fallback(session: &mut Session<'_>, value: &Value) -> String {
    let key = format!("unmappable:{}", value.kind_name());
    let kind = value.kind_name();
    session.warn_once(&key, || {
        format!(
            "serializing {} literal without a resolved type; falling back to plain rendering",
            kind
        )
    });
    render_plain(value)
}

fn render_plain(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => quote(s),
        Value::Raw(s) => s.clone(),
        Value::Binary(bytes) => format!("binary'{}'", base64_encode(bytes)),
        Value::Guid(g) => g.to_string(),
        Value::Date(d) => d.render().unwrap_or_else(|_| "null".to_string()),
        Value::TimeOfDay(t) => t.render().unwrap_or_else(|_| "null".to_string()),
        Value::DateTimeOffset(dt) => dt.render().unwrap_or_else(|_| "null".to_string()),
        Value::Duration(d) => d
            .render()
            .map(|body| format!("duration'{}'", body))
            .unwrap_or_else(|_| "null".to_string()),
        Value::Enum(EnumValue::Member(name)) => quote(name),
        Value::Enum(EnumValue::Numeric(n)) => n.to_string(),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(render_plain).collect();
            format!("({})", rendered.join(","))
        }
    }
}
