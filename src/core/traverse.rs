//! Purpose: Reshape an already-parsed JSON tree into a target schema.
//! Exports: `convert`.
//! Role: Tree-walking counterpart of the streaming decoder.
//! Invariants: Union members are tried in declaration order here, never
//! by coercion priority; the first member that accepts the value wins.
//! Invariants: Failures below a record field surface with the dot-joined
//! field path of that field.

use std::sync::Arc;

use crate::core::coerce::{convert_scalar_token, convert_string_token};
use crate::core::error::{Error, ErrorKind};
use crate::core::options::DecodeOptions;
use crate::core::schema::{member_schema, raw_type, RecordShape, Schema};
use crate::core::value::{OrderedMap, Value};

/// Converts `input` into a value conforming to `schema`.
pub fn convert(
    input: &serde_json::Value,
    schema: &Arc<Schema>,
    options: &DecodeOptions,
) -> Result<Value, Error> {
    tracing::debug!(target_schema = schema.describe(), "tree convert start");
    let mut traverser = Traverser {
        options,
        path: Vec::new(),
    };
    traverser.traverse(input, schema)
}

struct Traverser<'a> {
    options: &'a DecodeOptions,
    path: Vec<String>,
}

impl Traverser<'_> {
    fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Rewraps scalar mismatches below a field as field-scoped errors.
    fn scoped(&self, err: Error, token: &str) -> Error {
        if self.path.is_empty() {
            return err;
        }
        match err.kind() {
            ErrorKind::IncompatibleType | ErrorKind::CannotConvertToExpectedType => {
                let path = self.current_path();
                Error::new(ErrorKind::IncompatibleValueForField)
                    .with_message(format!(
                        "value '{token}' cannot be converted to field '{path}'"
                    ))
                    .with_field_path(path)
            }
            _ => err,
        }
    }

    fn mismatch(&self, schema: &Schema, found: &str) -> Error {
        let err = Error::new(ErrorKind::IncompatibleType).with_message(format!(
            "incompatible type expected '{}' but found '{found}'",
            schema.describe()
        ));
        if self.path.is_empty() {
            err
        } else {
            let path = self.current_path();
            Error::new(ErrorKind::IncompatibleValueForField)
                .with_message(format!(
                    "'{found}' value cannot be converted to field '{path}' of type '{}'",
                    schema.describe()
                ))
                .with_field_path(path)
        }
    }

    fn traverse(&mut self, input: &serde_json::Value, schema: &Arc<Schema>) -> Result<Value, Error> {
        let schema = raw_type(schema);
        match schema.as_ref() {
            Schema::Union(members) => {
                for member in members {
                    if let Ok(value) = self.traverse(input, member) {
                        return Ok(value);
                    }
                }
                Err(self.mismatch(schema, json_kind(input)))
            }
            Schema::Record(shape) => match input {
                serde_json::Value::Object(entries) => self.traverse_record(entries, shape),
                other => Err(self.mismatch(schema, json_kind(other))),
            },
            Schema::Map(value_schema) => match input {
                serde_json::Value::Object(entries) => {
                    let mut out = OrderedMap::new();
                    for (key, member) in entries {
                        self.path.push(key.clone());
                        let converted = self.traverse(member, value_schema)?;
                        self.path.pop();
                        out.insert(key.clone(), converted);
                    }
                    Ok(Value::Map(out))
                }
                other => Err(self.mismatch(schema, json_kind(other))),
            },
            Schema::Array { .. } | Schema::Tuple { .. } => match input {
                serde_json::Value::Array(items) => self.traverse_list(items, schema),
                other => Err(self.mismatch(schema, json_kind(other))),
            },
            Schema::Json | Schema::Any => Ok(passthrough(input)),
            _ => self.traverse_scalar(input, schema),
        }
    }

    fn traverse_record(
        &mut self,
        entries: &serde_json::Map<String, serde_json::Value>,
        shape: &Arc<RecordShape>,
    ) -> Result<Value, Error> {
        let mut out = OrderedMap::with_shape(Arc::clone(shape));
        for (key, member) in entries {
            match shape.field_by_effective_name(key) {
                Some(field) => {
                    if self.options.nil_as_optional_field
                        && member.is_null()
                        && !field.is_required()
                        && !field.is_nilable()
                    {
                        continue;
                    }
                    let field = field.clone();
                    self.path.push(field.name().to_string());
                    let converted = self.traverse(member, field.schema())?;
                    self.path.pop();
                    out.insert(field.name().to_string(), converted);
                }
                None => match shape.rest() {
                    Some(rest) => {
                        let rest = Arc::clone(rest);
                        self.path.push(key.clone());
                        let converted = self.traverse(member, &rest)?;
                        self.path.pop();
                        out.insert(key.clone(), converted);
                    }
                    None if self.options.projection => {}
                    None => {
                        self.path.push(key.clone());
                        let path = self.current_path();
                        self.path.pop();
                        return Err(Error::new(ErrorKind::UndefinedField)
                            .with_message(format!("undefined field '{path}'"))
                            .with_field_path(path));
                    }
                },
            }
        }
        for field in shape.fields() {
            if field.is_required() && out.get(field.name()).is_none() {
                if field.is_nilable() && self.options.absent_as_nilable_type {
                    continue;
                }
                self.path.push(field.name().to_string());
                let path = self.current_path();
                self.path.pop();
                return Err(Error::new(ErrorKind::RequiredFieldNotPresent)
                    .with_message(format!("required field '{path}' not present in JSON"))
                    .with_field_path(path));
            }
        }
        Ok(Value::Map(out.finish()))
    }

    fn traverse_list(
        &mut self,
        items: &[serde_json::Value],
        schema: &Arc<Schema>,
    ) -> Result<Value, Error> {
        let mut out = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match member_schema(schema, index, self.options.projection)? {
                Some(member) => out.push(self.traverse(item, &member)?),
                None => {}
            }
        }
        let declared = match schema.as_ref() {
            Schema::Array {
                size: crate::core::schema::ArraySize::Closed(n),
                ..
            } => Some(*n),
            Schema::Tuple { members, .. } => Some(members.len()),
            _ => None,
        };
        if let Some(declared) = declared {
            if out.len() < declared && !self.options.projection {
                return Err(Error::new(ErrorKind::ArraySizeMismatch).with_message(format!(
                    "array size is not compatible with expected size {declared}"
                )));
            }
        }
        Ok(Value::List(out))
    }

    fn traverse_scalar(
        &mut self,
        input: &serde_json::Value,
        schema: &Arc<Schema>,
    ) -> Result<Value, Error> {
        match input {
            serde_json::Value::String(s) => {
                convert_string_token(s, schema).map_err(|err| self.scoped(err, s))
            }
            serde_json::Value::Null => {
                convert_scalar_token("null", schema).map_err(|err| self.scoped(err, "null"))
            }
            serde_json::Value::Bool(b) => {
                let token = if *b { "true" } else { "false" };
                convert_scalar_token(token, schema).map_err(|err| self.scoped(err, token))
            }
            serde_json::Value::Number(n) => {
                let token = n.to_string();
                convert_scalar_token(&token, schema).map_err(|err| self.scoped(err, &token))
            }
            other => Err(self.mismatch(schema, json_kind(other))),
        }
    }
}

fn json_kind(input: &serde_json::Value) -> &'static str {
    match input {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "map",
    }
}

/// Structural copy with no schema direction, used for `json`/`any` leaves.
fn passthrough(input: &serde_json::Value) -> Value {
    match input {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(passthrough).collect()),
        serde_json::Value::Object(entries) => {
            let mut map = OrderedMap::new();
            for (key, member) in entries {
                map.insert(key.clone(), passthrough(member));
            }
            Value::Map(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ArraySize, FieldDescriptor, IntWidth};
    use serde_json::json;

    fn arc(schema: Schema) -> Arc<Schema> {
        Arc::new(schema)
    }

    fn person_schema() -> Arc<Schema> {
        arc(Schema::Record(Arc::new(
            RecordShape::new(
                "Person",
                vec![
                    FieldDescriptor::new("name", arc(Schema::String)),
                    FieldDescriptor::new("age", arc(Schema::Int(IntWidth::Signed64))),
                ],
                None,
            )
            .unwrap(),
        )))
    }

    #[test]
    fn record_projection_drops_unknown_fields() {
        let input = json!({"name": "ada", "age": 36, "city": "london"});
        let options = DecodeOptions {
            projection: true,
            ..DecodeOptions::default()
        };
        let value = convert(&input, &person_schema(), &options).unwrap();
        let Value::Map(map) = value else { panic!("expected map") };
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("name"), Some(&Value::Str("ada".to_string())));
    }

    #[test]
    fn unknown_field_fails_by_default() {
        let input = json!({"name": "ada", "age": 36, "city": "london"});
        let err = convert(&input, &person_schema(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedField);
        assert_eq!(err.field_path(), Some("city"));
    }

    #[test]
    fn missing_required_field_is_reported_with_path() {
        let input = json!({"name": "ada"});
        let err = convert(&input, &person_schema(), &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequiredFieldNotPresent);
        assert_eq!(err.field_path(), Some("age"));
    }

    #[test]
    fn union_members_resolve_in_declaration_order() {
        // declaration order, not coercion priority: the string member is
        // declared first, so "123" stays a string
        let union = arc(Schema::Union(vec![
            arc(Schema::String),
            arc(Schema::Int(IntWidth::Signed64)),
        ]));
        let input = json!("123");
        assert_eq!(
            convert(&input, &union, &DecodeOptions::default()).unwrap(),
            Value::Str("123".to_string())
        );

        let input = json!(123);
        assert_eq!(
            convert(&input, &union, &DecodeOptions::default()).unwrap(),
            Value::Int(123)
        );
    }

    #[test]
    fn nested_scalar_mismatch_carries_field_path() {
        let inner = arc(Schema::Record(Arc::new(
            RecordShape::new(
                "Inner",
                vec![FieldDescriptor::new("n", arc(Schema::Int(IntWidth::Signed64)))],
                None,
            )
            .unwrap(),
        )));
        let outer = arc(Schema::Record(Arc::new(
            RecordShape::new("Outer", vec![FieldDescriptor::new("inner", inner)], None).unwrap(),
        )));
        let input = json!({"inner": {"n": "not a number"}});
        let err = convert(&input, &outer, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleValueForField);
        assert_eq!(err.field_path(), Some("inner.n"));
    }

    #[test]
    fn closed_array_sizes_are_enforced() {
        let closed = arc(Schema::Array {
            elem: arc(Schema::Int(IntWidth::Signed64)),
            size: ArraySize::Closed(2),
        });
        let big = json!([1, 2, 3]);
        let err = convert(&big, &closed, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArraySizeMismatch);

        let lenient = DecodeOptions {
            projection: true,
            ..DecodeOptions::default()
        };
        let value = convert(&big, &closed, &lenient).unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));

        let small = json!([1]);
        let err = convert(&small, &closed, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArraySizeMismatch);
        assert_eq!(
            convert(&small, &closed, &lenient).unwrap(),
            Value::List(vec![Value::Int(1)])
        );
    }

    #[test]
    fn rest_schema_collects_undeclared_fields() {
        let shape = Arc::new(
            RecordShape::new(
                "Open",
                vec![FieldDescriptor::new("id", arc(Schema::Int(IntWidth::Signed64)))],
                Some(arc(Schema::String)),
            )
            .unwrap(),
        );
        let schema = arc(Schema::Record(shape));
        let input = json!({"id": 7, "note": "keep me"});
        let Value::Map(map) = convert(&input, &schema, &DecodeOptions::default()).unwrap() else {
            panic!("expected map")
        };
        assert_eq!(map.get("note"), Some(&Value::Str("keep me".to_string())));
    }

    #[test]
    fn nil_as_optional_field_drops_explicit_null() {
        let shape = Arc::new(
            RecordShape::new(
                "Opt",
                vec![FieldDescriptor::new("tag", arc(Schema::String)).optional()],
                None,
            )
            .unwrap(),
        );
        let schema = arc(Schema::Record(shape));
        let input = json!({"tag": null});

        let err = convert(&input, &schema, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleValueForField);

        let options = DecodeOptions {
            nil_as_optional_field: true,
            ..DecodeOptions::default()
        };
        let Value::Map(map) = convert(&input, &schema, &options).unwrap() else {
            panic!("expected map")
        };
        assert!(map.is_empty());
    }

    #[test]
    fn absent_nilable_field_passes_when_enabled() {
        let shape = Arc::new(
            RecordShape::new(
                "Nil",
                vec![FieldDescriptor::new(
                    "maybe",
                    arc(Schema::Union(vec![arc(Schema::String), arc(Schema::Null)])),
                )
                .nilable()],
                None,
            )
            .unwrap(),
        );
        let schema = arc(Schema::Record(shape));
        let input = json!({});

        let err = convert(&input, &schema, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequiredFieldNotPresent);

        let options = DecodeOptions {
            absent_as_nilable_type: true,
            ..DecodeOptions::default()
        };
        assert!(convert(&input, &schema, &options).is_ok());
    }

    #[test]
    fn renamed_fields_match_input_keys_and_emit_declared_names() {
        let shape = Arc::new(
            RecordShape::new(
                "Wire",
                vec![FieldDescriptor::new("user_id", arc(Schema::Int(IntWidth::Signed64)))
                    .with_rename("userId")],
                None,
            )
            .unwrap(),
        );
        let schema = arc(Schema::Record(shape));
        let input = json!({"userId": 9});
        let Value::Map(map) = convert(&input, &schema, &DecodeOptions::default()).unwrap() else {
            panic!("expected map")
        };
        assert_eq!(map.get("user_id"), Some(&Value::Int(9)));
    }
}
