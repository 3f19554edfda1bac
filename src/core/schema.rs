//! Purpose: Schema vocabulary driving every decode path.
//! Exports: `Schema`, `IntWidth`, `ArraySize`, `Literal`, `RecordShape`, `FieldDescriptor`.
//! Role: Closed shape model; decoding logic matches on it exhaustively.
//! Invariants: `RecordShape` never holds two fields with the same effective name.
//! Invariants: `Readonly` is transparent; `raw_type` strips it before any dispatch.
//! Notes: Schemas are shared via `Arc` so decode contexts stay cheap to stack.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::core::error::{Error, ErrorKind};

/// Integer width variants with their inclusive value ranges.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntWidth {
    Signed64,
    Signed32,
    Signed16,
    Signed8,
    Unsigned32,
    Unsigned16,
    Unsigned8,
    Byte,
}

impl IntWidth {
    pub fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::Signed64 => (i64::MIN, i64::MAX),
            IntWidth::Signed32 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::Signed16 => (-32768, 32767),
            IntWidth::Signed8 => (-128, 127),
            IntWidth::Unsigned32 => (0, 4294967295),
            IntWidth::Unsigned16 => (0, 65535),
            IntWidth::Unsigned8 => (0, 255),
            IntWidth::Byte => (0, 255),
        }
    }

    pub fn contains(self, value: i64) -> bool {
        let (lo, hi) = self.bounds();
        lo <= value && value <= hi
    }
}

/// Declared size of an array schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArraySize {
    Open,
    Closed(usize),
}

/// A single-value schema member of a finite set.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Str(String),
}

impl Literal {
    /// Canonical text form used for matching against input tokens.
    pub fn text(&self) -> String {
        match self {
            Literal::Null => "null".to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Decimal(d) => d.to_string(),
            Literal::Str(s) => s.clone(),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Literal::Str(_))
    }
}

/// One declared field of a record shape.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    rename: Option<String>,
    schema: Arc<Schema>,
    required: bool,
    nilable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            rename: None,
            schema,
            required: true,
            nilable: false,
        }
    }

    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nilable(mut self) -> Self {
        self.nilable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The input-side key this field matches: the rename when present,
    /// the declared name otherwise.
    pub fn effective_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nilable(&self) -> bool {
        self.nilable
    }
}

/// Fields of a record in declaration order plus an optional rest schema.
#[derive(Debug)]
pub struct RecordShape {
    name: String,
    fields: Vec<FieldDescriptor>,
    rest: Option<Arc<Schema>>,
}

impl RecordShape {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        rest: Option<Arc<Schema>>,
    ) -> Result<Self, Error> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for field in &fields {
            if let Some(prior) = seen.insert(field.effective_name(), field.name()) {
                return Err(Error::new(ErrorKind::DuplicateField).with_message(format!(
                    "fields '{}' and '{}' both map to name '{}'",
                    prior,
                    field.name(),
                    field.effective_name()
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            fields,
            rest,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn rest(&self) -> Option<&Arc<Schema>> {
        self.rest.as_ref()
    }

    pub fn field_by_effective_name(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.effective_name() == key)
    }
}

/// The closed set of target shapes a decode can be directed at.
#[derive(Debug)]
pub enum Schema {
    Null,
    Boolean,
    Int(IntWidth),
    Float,
    Decimal,
    Char,
    String,
    Finite(Vec<Literal>),
    Record(Arc<RecordShape>),
    Map(Arc<Schema>),
    Array {
        elem: Arc<Schema>,
        size: ArraySize,
    },
    Tuple {
        members: Vec<Arc<Schema>>,
        rest: Option<Arc<Schema>>,
    },
    Union(Vec<Arc<Schema>>),
    Json,
    Any,
    Readonly(Arc<Schema>),
}

impl Schema {
    /// Short human name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int(_) => "int",
            Schema::Float => "float",
            Schema::Decimal => "decimal",
            Schema::Char => "char",
            Schema::String => "string",
            Schema::Finite(_) => "finite set",
            Schema::Record(_) => "record",
            Schema::Map(_) => "map",
            Schema::Array { .. } => "array",
            Schema::Tuple { .. } => "tuple",
            Schema::Union(_) => "union",
            Schema::Json => "json",
            Schema::Any => "any",
            Schema::Readonly(_) => "readonly",
        }
    }

    /// True when decoding this shape requires a container context
    /// (or, for unions, when any member does).
    pub fn is_non_scalar(&self) -> bool {
        match self {
            Schema::Record(_)
            | Schema::Map(_)
            | Schema::Array { .. }
            | Schema::Tuple { .. }
            | Schema::Json
            | Schema::Any => true,
            Schema::Union(members) => members.iter().any(|m| raw_type(m).is_non_scalar()),
            _ => false,
        }
    }
}

/// Strips `Readonly` wrappers down to the underlying shape.
pub fn raw_type(schema: &Arc<Schema>) -> &Arc<Schema> {
    let mut current = schema;
    while let Schema::Readonly(inner) = current.as_ref() {
        current = inner;
    }
    current
}

/// Resolves the schema expected for the member at `index` of a list
/// container. `Ok(None)` means the member is beyond the declared shape
/// and should be dropped (projection); an error means the same position
/// is a hard size violation.
pub fn member_schema(
    container: &Arc<Schema>,
    index: usize,
    projection: bool,
) -> Result<Option<Arc<Schema>>, Error> {
    match raw_type(container).as_ref() {
        Schema::Array { elem, size } => match size {
            ArraySize::Open => Ok(Some(Arc::clone(elem))),
            ArraySize::Closed(n) => {
                if index < *n {
                    Ok(Some(Arc::clone(elem)))
                } else if projection {
                    Ok(None)
                } else {
                    Err(Error::new(ErrorKind::ArraySizeMismatch)
                        .with_message(format!("array size is not compatible with expected size {n}")))
                }
            }
        },
        Schema::Tuple { members, rest } => {
            if index < members.len() {
                Ok(Some(Arc::clone(&members[index])))
            } else if let Some(rest) = rest {
                Ok(Some(Arc::clone(rest)))
            } else if projection {
                Ok(None)
            } else {
                Err(Error::new(ErrorKind::ArraySizeMismatch).with_message(format!(
                    "array size is not compatible with expected size {}",
                    members.len()
                )))
            }
        }
        _ => Ok(Some(Arc::clone(container))),
    }
}

/// Picks the single non-scalar member a streaming container open may
/// commit to. Fails `UnsupportedSchema` when more than one member would
/// need the container, and returns `None` when none does.
pub fn sole_non_scalar_member(members: &[Arc<Schema>]) -> Result<Option<Arc<Schema>>, Error> {
    let mut found: Option<&Arc<Schema>> = None;
    for member in members {
        let member = raw_type(member);
        if member.is_non_scalar() {
            if found.is_some() {
                return Err(Error::new(ErrorKind::UnsupportedSchema).with_message(
                    "union with multiple non-scalar members cannot be decoded from a stream",
                ));
            }
            found = Some(member);
        }
    }
    Ok(found.map(Arc::clone))
}
