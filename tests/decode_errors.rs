//! Purpose: Regression coverage for decode-failure kind mapping.
//! Exports: Integration tests only.
//! Role: Verify stable error kinds, locations, and field paths for
//! representative failures.
//! Invariants: Kind mapping remains deterministic for each failure class.

use std::sync::Arc;

use jsoncast::api::{
    self, ArraySize, ConstraintValidator, DecodeOptions, Error, ErrorKind, FieldDescriptor,
    IntWidth, RecordShape, Schema, Value,
};

fn arc(schema: Schema) -> Arc<Schema> {
    Arc::new(schema)
}

fn point_schema() -> Arc<Schema> {
    arc(Schema::Record(Arc::new(
        RecordShape::new(
            "Point",
            vec![
                FieldDescriptor::new("x", arc(Schema::Int(IntWidth::Signed64))),
                FieldDescriptor::new("y", arc(Schema::Int(IntWidth::Signed64))),
            ],
            None,
        )
        .expect("valid shape"),
    )))
}

#[test]
fn syntax_failures_report_line_and_column() {
    let err = api::from_str("{\n \"x\" 1}", &point_schema(), DecodeOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    let (line, _) = err.location().expect("location");
    assert_eq!(line, 2);
}

#[test]
fn field_value_failures_carry_the_field_path() {
    let err = api::from_str(
        r#"{"x":1,"y":"nope"}"#,
        &point_schema(),
        DecodeOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleValueForField);
    assert_eq!(err.field_path(), Some("y"));
}

#[test]
fn required_undefined_and_duplicate_fields_map_to_distinct_kinds() {
    let schema = point_schema();

    let err = api::from_str(r#"{"x":1}"#, &schema, DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredFieldNotPresent);

    let err = api::from_str(r#"{"x":1,"y":2,"z":3}"#, &schema, DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedField);

    let err = api::from_str(r#"{"x":1,"x":2,"y":3}"#, &schema, DecodeOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateField);
}

#[test]
fn array_size_violations_map_to_array_size_mismatch() {
    let closed = arc(Schema::Array {
        elem: arc(Schema::Int(IntWidth::Signed64)),
        size: ArraySize::Closed(3),
    });
    let err = api::from_str("[1,2]", &closed, DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArraySizeMismatch);
}

#[test]
fn unstreamable_unions_fail_before_any_input_is_read() {
    let union = arc(Schema::Union(vec![
        arc(Schema::Record(Arc::new(
            RecordShape::new("A", vec![], None).expect("valid shape"),
        ))),
        arc(Schema::Map(arc(Schema::Json))),
    ]));
    let err = api::from_str("{}", &union, DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSchema);
}

#[test]
fn top_level_mismatch_is_incompatible_type() {
    let err = api::from_str("[1]", &point_schema(), DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);

    let err = api::from_str("\"x\"", &arc(Schema::Int(IntWidth::Signed64)), DecodeOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);
}

#[test]
fn unparsable_scalars_map_to_cannot_convert() {
    let err = api::from_str("flase", &arc(Schema::Boolean), DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotConvertToExpectedType);
}

struct EvenOnly;

impl ConstraintValidator for EvenOnly {
    fn validate(&self, value: &Value, _schema: &Schema) -> Result<(), Error> {
        match value {
            Value::Int(n) if n % 2 == 0 => Ok(()),
            _ => Err(Error::new(ErrorKind::IncompatibleType).with_message("odd value")),
        }
    }
}

#[test]
fn constraint_failures_are_wrapped_as_validation_errors() {
    let schema = arc(Schema::Int(IntWidth::Signed64));
    let options = DecodeOptions {
        validate_constraints: true,
        ..DecodeOptions::default()
    };

    let value = api::from_str_validated("4", &schema, options, &EvenOnly).expect("even passes");
    assert_eq!(value, Value::Int(4));

    let err = api::from_str_validated("5", &schema, options, &EvenOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // the hook is skipped entirely when the option is off
    let relaxed = DecodeOptions::default();
    assert!(api::from_str_validated("5", &schema, relaxed, &EvenOnly).is_ok());
}
