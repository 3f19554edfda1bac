//! Purpose: Decoded value model produced by every decode path.
//! Exports: `Value`, `OrderedMap`.
//! Role: Schema-conformant output tree; printable as JSON for the CLI.
//! Invariants: `OrderedMap::finish` orders declared fields first, rest keys after.
//! Notes: `Decimal` keeps arbitrary precision; `to_json` renders it as a raw number.

use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::core::schema::RecordShape;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Str(String),
    List(Vec<Value>),
    Map(OrderedMap),
}

impl Value {
    /// Renders the value as a `serde_json::Value` for printing.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal(d) => d
                .to_string()
                .parse::<serde_json::Number>()
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(d.to_string())),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.entries()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Insertion-ordered key/value pairs, optionally tied to a record shape
/// so finalization can restore declaration order.
#[derive(Clone, Debug, Default)]
pub struct OrderedMap {
    entries: Vec<(String, Value)>,
    shape: Option<Arc<RecordShape>>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(shape: Arc<RecordShape>) -> Self {
        Self {
            entries: Vec::new(),
            shape: Some(shape),
        }
    }

    /// Inserts a pair, replacing an existing entry with the same key in
    /// place. Repeated rest/map keys decode last-wins.
    pub fn insert(&mut self, key: String, value: Value) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Reorders entries so declared fields appear in declaration order,
    /// followed by rest entries in input order.
    pub fn finish(mut self) -> Self {
        let Some(shape) = self.shape.take() else {
            return self;
        };
        let mut ordered = Vec::with_capacity(self.entries.len());
        for field in shape.fields() {
            if let Some(pos) = self.entries.iter().position(|(k, _)| k == field.name()) {
                ordered.push(self.entries.remove(pos));
            }
        }
        ordered.append(&mut self.entries);
        self.entries = ordered;
        self
    }
}

impl PartialEq for OrderedMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
