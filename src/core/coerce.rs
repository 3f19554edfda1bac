//! Purpose: Text-to-scalar coercion shared by every decode path.
//! Exports: `from_string_with_schema`; crate-internal quoted/unquoted token converters.
//! Role: Turns raw token text into schema-conformant scalar values.
//! Invariants: Union coercion here follows the fixed priority order
//! (int, float, decimal, null, boolean, json, string); the tree and
//! streaming paths apply their own union rules before reaching scalars.
//! Invariants: Parse failures map to `CannotConvertToExpectedType`,
//! width violations to `IncompatibleType`.

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{raw_type, IntWidth, Literal, Schema};
use crate::core::value::Value;

fn cannot_convert(text: &str, schema: &Schema) -> Error {
    Error::new(ErrorKind::CannotConvertToExpectedType).with_message(format!(
        "value '{text}' cannot be converted to '{}'",
        schema.describe()
    ))
}

fn incompatible(text: &str, schema: &Schema) -> Error {
    Error::new(ErrorKind::IncompatibleType).with_message(format!(
        "incompatible value '{text}' for type '{}'",
        schema.describe()
    ))
}

/// Coercion priority for union members. Lower tries first; string-like
/// members always come last so they never shadow a numeric match.
fn priority(schema: &Schema) -> usize {
    match schema {
        Schema::Int(_) => 0,
        Schema::Float => 1,
        Schema::Decimal => 2,
        Schema::Null => 3,
        Schema::Boolean => 4,
        Schema::Json | Schema::Any => 5,
        Schema::String | Schema::Char => 6,
        _ => usize::MAX,
    }
}

fn parse_int(text: &str, width: IntWidth) -> Result<Value, Error> {
    let value = text
        .parse::<i64>()
        .map_err(|_| cannot_convert(text, &Schema::Int(width)))?;
    if width.contains(value) {
        Ok(Value::Int(value))
    } else {
        Err(incompatible(text, &Schema::Int(width)))
    }
}

fn has_float_suffix(text: &str) -> bool {
    matches!(text.as_bytes().last(), Some(b'f' | b'F' | b'd' | b'D'))
}

fn parse_float(text: &str) -> Result<Value, Error> {
    if has_float_suffix(text) {
        return Err(cannot_convert(text, &Schema::Float));
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| cannot_convert(text, &Schema::Float))
}

fn parse_decimal(text: &str) -> Result<Value, Error> {
    if has_float_suffix(text) {
        return Err(cannot_convert(text, &Schema::Decimal));
    }
    BigDecimal::from_str(text)
        .map(Value::Decimal)
        .map_err(|_| cannot_convert(text, &Schema::Decimal))
}

fn parse_char(text: &str) -> Result<Value, Error> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(_), None) => Ok(Value::Str(text.to_string())),
        _ => Err(cannot_convert(text, &Schema::Char)),
    }
}

fn match_finite(text: &str, literals: &[Literal], strings_only: bool, scalars_only: bool) -> Option<Value> {
    for literal in literals {
        if strings_only && !literal.is_string() {
            continue;
        }
        if scalars_only && literal.is_string() {
            continue;
        }
        if literal.text() == text {
            return Some(match literal {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Decimal(d) => Value::Decimal(d.clone()),
                Literal::Str(s) => Value::Str(s.clone()),
            });
        }
    }
    None
}

/// Coerces free-form text into `schema`. Unions try members in the
/// fixed priority order; `Json`/`Any` recurse through the basic scalar
/// union with string as the final fallback.
pub fn from_string_with_schema(text: &str, schema: &Arc<Schema>) -> Result<Value, Error> {
    let schema = raw_type(schema);
    match schema.as_ref() {
        Schema::Null => match text {
            "null" | "()" => Ok(Value::Null),
            _ => Err(cannot_convert(text, schema)),
        },
        Schema::Boolean => {
            if text.eq_ignore_ascii_case("true") || text == "1" {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") || text == "0" {
                Ok(Value::Bool(false))
            } else {
                Err(cannot_convert(text, schema))
            }
        }
        Schema::Int(width) => parse_int(text, *width),
        Schema::Float => parse_float(text),
        Schema::Decimal => parse_decimal(text),
        Schema::Char => parse_char(text),
        Schema::String => Ok(Value::Str(text.to_string())),
        Schema::Finite(literals) => {
            match_finite(text, literals, false, false).ok_or_else(|| cannot_convert(text, schema))
        }
        Schema::Union(members) => {
            let mut ordered: Vec<&Arc<Schema>> = members.iter().collect();
            ordered.sort_by_key(|m| priority(raw_type(m).as_ref()));
            for member in ordered {
                if let Ok(value) = from_string_with_schema(text, member) {
                    return Ok(value);
                }
            }
            Err(cannot_convert(text, schema))
        }
        Schema::Json | Schema::Any => {
            if let Ok(value) = parse_int(text, IntWidth::Signed64) {
                return Ok(value);
            }
            if let Ok(value) = parse_float(text) {
                return Ok(value);
            }
            if text == "null" || text == "()" {
                return Ok(Value::Null);
            }
            if text.eq_ignore_ascii_case("true") {
                return Ok(Value::Bool(true));
            }
            if text.eq_ignore_ascii_case("false") {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Str(text.to_string()))
        }
        Schema::Record(_) | Schema::Map(_) | Schema::Array { .. } | Schema::Tuple { .. } => {
            Err(cannot_convert(text, schema))
        }
        Schema::Readonly(_) => unreachable!("raw_type strips readonly"),
    }
}

/// Converts a quoted token. Only string-like schemas accept it; unions
/// try members in declaration order.
pub(crate) fn convert_string_token(text: &str, schema: &Arc<Schema>) -> Result<Value, Error> {
    let schema = raw_type(schema);
    match schema.as_ref() {
        Schema::String | Schema::Json | Schema::Any => Ok(Value::Str(text.to_string())),
        Schema::Char => parse_char(text),
        Schema::Finite(literals) => {
            match_finite(text, literals, true, false).ok_or_else(|| incompatible(text, schema))
        }
        Schema::Union(members) => {
            for member in members {
                if let Ok(value) = convert_string_token(text, member) {
                    return Ok(value);
                }
            }
            Err(incompatible(text, schema))
        }
        _ => Err(incompatible(text, schema)),
    }
}

/// Converts an unquoted token (number, boolean, or null literal).
/// String-like schemas never accept it; unions try non-string members
/// in the fixed priority order.
pub(crate) fn convert_scalar_token(text: &str, schema: &Arc<Schema>) -> Result<Value, Error> {
    match text.chars().next() {
        Some('t' | 'f' | 'n' | '-' | '+' | '0'..='9') => {}
        _ => return Err(incompatible(text, schema)),
    }
    let schema = raw_type(schema);
    match schema.as_ref() {
        Schema::Null => match text {
            "null" => Ok(Value::Null),
            _ => Err(cannot_convert(text, schema)),
        },
        Schema::Boolean => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(cannot_convert(text, schema)),
        },
        Schema::Int(width) => parse_int(text, *width),
        Schema::Float => parse_float(text),
        Schema::Decimal => parse_decimal(text),
        Schema::Finite(literals) => {
            match_finite(text, literals, false, true).ok_or_else(|| incompatible(text, schema))
        }
        Schema::Json | Schema::Any => convert_basic_scalar(text, schema),
        Schema::Union(members) => {
            let mut ordered: Vec<&Arc<Schema>> = members
                .iter()
                .filter(|m| !matches!(raw_type(m).as_ref(), Schema::String | Schema::Char))
                .collect();
            ordered.sort_by_key(|m| priority(raw_type(m).as_ref()));
            for member in ordered {
                if let Ok(value) = convert_scalar_token(text, member) {
                    return Ok(value);
                }
            }
            Err(incompatible(text, schema))
        }
        _ => Err(incompatible(text, schema)),
    }
}

fn convert_basic_scalar(text: &str, schema: &Schema) -> Result<Value, Error> {
    match text {
        "null" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if !has_float_suffix(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }
    Err(incompatible(text, schema))
}
