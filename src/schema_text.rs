//! Purpose: Parse the JSON schema-descriptor dialect used by the CLI.
//! Exports: `parse_schema`.
//! Role: Binary-side helper; the library core never sees descriptor text.
//! Invariants: Descriptor errors surface as `UnsupportedSchema`, never panics.

use std::sync::Arc;

use serde::Deserialize;

use jsoncast::api::{
    ArraySize, Error, ErrorKind, FieldDescriptor, IntWidth, Literal, RecordShape, Schema,
};

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum WidthDoc {
    #[default]
    Signed64,
    Signed32,
    Signed16,
    Signed8,
    Unsigned32,
    Unsigned16,
    Unsigned8,
    Byte,
}

impl WidthDoc {
    fn to_width(self) -> IntWidth {
        match self {
            WidthDoc::Signed64 => IntWidth::Signed64,
            WidthDoc::Signed32 => IntWidth::Signed32,
            WidthDoc::Signed16 => IntWidth::Signed16,
            WidthDoc::Signed8 => IntWidth::Signed8,
            WidthDoc::Unsigned32 => IntWidth::Unsigned32,
            WidthDoc::Unsigned16 => IntWidth::Unsigned16,
            WidthDoc::Unsigned8 => IntWidth::Unsigned8,
            WidthDoc::Byte => IntWidth::Byte,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FieldDoc {
    name: String,
    #[serde(default)]
    rename: Option<String>,
    schema: SchemaDoc,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    nilable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum SchemaDoc {
    Null,
    Boolean,
    Int {
        #[serde(default)]
        width: WidthDoc,
    },
    Float,
    Decimal,
    Char,
    String,
    Finite {
        values: Vec<serde_json::Value>,
    },
    Record {
        #[serde(default)]
        name: Option<String>,
        fields: Vec<FieldDoc>,
        #[serde(default)]
        rest: Option<Box<SchemaDoc>>,
    },
    Map {
        value: Box<SchemaDoc>,
    },
    Array {
        elem: Box<SchemaDoc>,
        #[serde(default)]
        size: Option<usize>,
    },
    Tuple {
        members: Vec<SchemaDoc>,
        #[serde(default)]
        rest: Option<Box<SchemaDoc>>,
    },
    Union {
        members: Vec<SchemaDoc>,
    },
    Json,
    Any,
    Readonly {
        inner: Box<SchemaDoc>,
    },
}

impl SchemaDoc {
    fn to_schema(&self) -> Result<Arc<Schema>, Error> {
        let schema = match self {
            SchemaDoc::Null => Schema::Null,
            SchemaDoc::Boolean => Schema::Boolean,
            SchemaDoc::Int { width } => Schema::Int(width.to_width()),
            SchemaDoc::Float => Schema::Float,
            SchemaDoc::Decimal => Schema::Decimal,
            SchemaDoc::Char => Schema::Char,
            SchemaDoc::String => Schema::String,
            SchemaDoc::Finite { values } => {
                let literals = values
                    .iter()
                    .map(to_literal)
                    .collect::<Result<Vec<_>, Error>>()?;
                Schema::Finite(literals)
            }
            SchemaDoc::Record { name, fields, rest } => {
                let mut descriptors = Vec::with_capacity(fields.len());
                for field in fields {
                    let mut descriptor =
                        FieldDescriptor::new(field.name.clone(), field.schema.to_schema()?);
                    if let Some(rename) = &field.rename {
                        descriptor = descriptor.with_rename(rename.clone());
                    }
                    if !field.required {
                        descriptor = descriptor.optional();
                    }
                    if field.nilable {
                        descriptor = descriptor.nilable();
                    }
                    descriptors.push(descriptor);
                }
                let rest = rest.as_ref().map(|r| r.to_schema()).transpose()?;
                let shape = RecordShape::new(
                    name.clone().unwrap_or_else(|| "record".to_string()),
                    descriptors,
                    rest,
                )?;
                Schema::Record(Arc::new(shape))
            }
            SchemaDoc::Map { value } => Schema::Map(value.to_schema()?),
            SchemaDoc::Array { elem, size } => Schema::Array {
                elem: elem.to_schema()?,
                size: match size {
                    Some(n) => ArraySize::Closed(*n),
                    None => ArraySize::Open,
                },
            },
            SchemaDoc::Tuple { members, rest } => Schema::Tuple {
                members: members
                    .iter()
                    .map(|m| m.to_schema())
                    .collect::<Result<Vec<_>, Error>>()?,
                rest: rest.as_ref().map(|r| r.to_schema()).transpose()?,
            },
            SchemaDoc::Union { members } => Schema::Union(
                members
                    .iter()
                    .map(|m| m.to_schema())
                    .collect::<Result<Vec<_>, Error>>()?,
            ),
            SchemaDoc::Json => Schema::Json,
            SchemaDoc::Any => Schema::Any,
            SchemaDoc::Readonly { inner } => Schema::Readonly(inner.to_schema()?),
        };
        Ok(Arc::new(schema))
    }
}

fn to_literal(value: &serde_json::Value) -> Result<Literal, Error> {
    match value {
        serde_json::Value::Null => Ok(Literal::Null),
        serde_json::Value::Bool(b) => Ok(Literal::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Literal::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Literal::Float(f))
            } else {
                Err(Error::new(ErrorKind::UnsupportedSchema)
                    .with_message(format!("unsupported finite value '{n}'")))
            }
        }
        serde_json::Value::String(s) => Ok(Literal::Str(s.clone())),
        _ => Err(Error::new(ErrorKind::UnsupportedSchema)
            .with_message("finite values must be scalars")),
    }
}

/// Parses a schema descriptor document into a schema.
pub fn parse_schema(text: &str) -> Result<Arc<Schema>, Error> {
    let doc: SchemaDoc = serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::UnsupportedSchema)
            .with_message("invalid schema descriptor")
            .with_source(err)
    })?;
    doc.to_schema()
}
