//! Cheap shape signatures for runtime values.
//!
//! A fingerprint only looks at a value's own shape (length, key count,
//! constructor name), never at nested contents, so it stays cheap enough
//! to run on every prop of every commit. Two values with different
//! identities but equal fingerprints are the "unstable" candidates.

use crate::value::{ObjectData, Value, format_number};

/// Marker emitted when a recursive preview exceeds its depth budget.
pub const ELLIPSIS: &str = "…";

const MAX_PREVIEW_DEPTH: usize = 2;
const MAX_PREVIEW_ITEMS: usize = 8;

pub fn fingerprint(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_owned(),
        Value::Null => "null".to_owned(),
        Value::Bool(value) => value.to_string(),
        Value::Number(value) => format_number(*value),
        Value::BigInt(value) => value.to_string(),
        Value::String(value) => value.to_string(),
        Value::Symbol(symbol) => {
            format!("Symbol({})", symbol.description.as_deref().unwrap_or(""))
        }
        Value::Function(function) => function.source.clone(),
        Value::Object(object) => {
            let Some(data) = object.read() else {
                // Locked mid-mutation: an opaque tag is all we can say.
                return "Object{…}".to_owned();
            };
            match &*data {
                ObjectData::Array(items) if items.is_empty() => "[]".to_owned(),
                ObjectData::Array(items) => format!("[{}]", items.len()),
                ObjectData::Element(element) => format!(
                    "<{} {}>",
                    element.type_name.as_deref().unwrap_or(""),
                    element.props.len()
                ),
                ObjectData::Plain(entries) if entries.is_empty() => "{}".to_owned(),
                ObjectData::Plain(entries) => format!("{{{}}}", entries.len()),
                other => format!("{}{{…}}", constructor_name(other)),
            }
        }
    }
}

fn constructor_name(data: &ObjectData) -> &str {
    match data {
        ObjectData::Plain(_) => "Object",
        ObjectData::Array(_) => "Array",
        ObjectData::Element(_) => "Element",
        ObjectData::Date(_) => "Date",
        ObjectData::RegExp { .. } => "RegExp",
        ObjectData::Map(_) => "Map",
        ObjectData::Set(_) => "Set",
        ObjectData::ArrayBuffer(_) => "ArrayBuffer",
        ObjectData::DataView(_) => "DataView",
        ObjectData::TypedArray { kind, .. } => kind.constructor_name(),
        ObjectData::Instance { constructor, .. } => match constructor.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Object",
        },
        ObjectData::Opaque { tag } => tag,
    }
}

/// Human-readable preview of a value, recursing up to a fixed depth.
///
/// `depth` is the nesting level the preview starts at; past the budget the
/// preview collapses to [`ELLIPSIS`].
pub fn format_value(value: &Value, depth: usize) -> String {
    if depth > MAX_PREVIEW_DEPTH {
        return ELLIPSIS.to_owned();
    }
    match value {
        Value::String(value) => format!("{value:?}"),
        Value::Function(function) => match function.name.as_deref() {
            Some(name) if !name.is_empty() => format!("ƒ {name}()"),
            _ => "ƒ ()".to_owned(),
        },
        Value::Object(object) => {
            let Some(data) = object.read() else {
                return "Object{…}".to_owned();
            };
            match &*data {
                ObjectData::Array(items) => {
                    let mut parts: Vec<String> = items
                        .iter()
                        .take(MAX_PREVIEW_ITEMS)
                        .map(|item| format_value(item, depth + 1))
                        .collect();
                    if items.len() > MAX_PREVIEW_ITEMS {
                        parts.push(ELLIPSIS.to_owned());
                    }
                    format!("[{}]", parts.join(", "))
                }
                ObjectData::Plain(entries) | ObjectData::Instance { fields: entries, .. } => {
                    let prefix = match &*data {
                        ObjectData::Instance { .. } => constructor_name(&data),
                        _ => "",
                    };
                    let mut parts: Vec<String> = entries
                        .iter()
                        .take(MAX_PREVIEW_ITEMS)
                        .map(|(key, value)| format!("{key}: {}", format_value(value, depth + 1)))
                        .collect();
                    if entries.len() > MAX_PREVIEW_ITEMS {
                        parts.push(ELLIPSIS.to_owned());
                    }
                    if parts.is_empty() {
                        format!("{prefix}{{}}")
                    } else {
                        format!("{prefix}{{ {} }}", parts.join(", "))
                    }
                }
                ObjectData::Date(epoch_ms) => format!("Date({})", format_number(*epoch_ms)),
                ObjectData::RegExp { source, flags } => format!("/{source}/{flags}"),
                _ => fingerprint(value),
            }
        }
        other => fingerprint(other),
    }
}
