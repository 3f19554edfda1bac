//! Purpose: Incremental schema-directed JSON decoder.
//! Exports: `Decoder`.
//! Role: Single-pass char-level state machine; the parser cursor and the
//! schema cursor advance in lockstep, so values are shaped as they are read.
//! Invariants: A union is only streamable when at most one member needs a
//! container; anything else fails `UnsupportedSchema` up front.
//! Invariants: Dropped input (projection, closed-array overflow) is parsed
//! for syntax but never buffered.
//! Invariants: A duplicate occurrence of a declared field fails at the
//! second occurrence, before its value is read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::coerce::{convert_scalar_token, convert_string_token};
use crate::core::error::{Error, ErrorKind};
use crate::core::options::DecodeOptions;
use crate::core::schema::{
    member_schema, raw_type, sole_non_scalar_member, ArraySize, FieldDescriptor, RecordShape,
    Schema,
};
use crate::core::value::{OrderedMap, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StringContext {
    FieldName,
    FieldValue,
    ArrayElement,
    TopLevel,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    DocStart,
    DocEnd,
    FirstFieldReady,
    NonFirstFieldReady,
    FieldName,
    EndFieldName,
    FieldValueReady,
    StringFieldValue,
    NonStringFieldValue,
    StringValue,
    NonStringValue,
    FieldEnd,
    FirstArrayElementReady,
    NonFirstArrayElementReady,
    StringArrayElement,
    NonStringArrayElement,
    ArrayElementEnd,
    Escape(StringContext),
    UnicodeHex(StringContext),
}

/// Where the next parsed value goes: shaped by a schema, or dropped.
#[derive(Clone)]
enum Target {
    Typed(Arc<Schema>),
    Drop,
}

/// Schema bookkeeping for an open mapping that is actually decoded.
struct MapShape {
    shape: Option<Arc<RecordShape>>,
    fields_remaining: HashMap<String, FieldDescriptor>,
    visited: HashSet<String>,
    rest: Option<Arc<Schema>>,
}

enum Frame {
    Map {
        value: OrderedMap,
        // None marks a projection-skip region: parsed, never built
        shape: Option<MapShape>,
        pending_name: Option<String>,
    },
    Array {
        items: Vec<Value>,
        schema: Option<Arc<Schema>>,
        index: usize,
    },
}

/// Push-based decoder: feed text or bytes in any chunking, then `finish`.
pub struct Decoder {
    root: Arc<Schema>,
    options: DecodeOptions,
    state: State,
    line: u32,
    column: u32,
    buf: String,
    hex: String,
    pending_surrogate: Option<u16>,
    utf8_carry: Vec<u8>,
    frames: Vec<Frame>,
    next: Option<Target>,
    current_field: Option<FieldDescriptor>,
    result: Option<Value>,
}

fn is_ws(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

impl Decoder {
    pub fn new(schema: &Arc<Schema>, options: DecodeOptions) -> Result<Self, Error> {
        if let Schema::Union(members) = raw_type(schema).as_ref() {
            sole_non_scalar_member(members)?;
        }
        tracing::debug!(root = schema.describe(), "stream decode start");
        Ok(Self {
            root: Arc::clone(schema),
            options,
            state: State::DocStart,
            line: 1,
            column: 0,
            buf: String::new(),
            hex: String::new(),
            pending_surrogate: None,
            utf8_carry: Vec::new(),
            frames: Vec::new(),
            next: None,
            current_field: None,
            result: None,
        })
    }

    /// Feeds a chunk of UTF-8 text.
    pub fn feed_str(&mut self, text: &str) -> Result<(), Error> {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            self.step(ch)?;
        }
        Ok(())
    }

    /// Feeds raw bytes. A multi-byte sequence split across chunks is
    /// carried over; an invalid sequence fails with a syntax error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), Error> {
        let owned;
        let bytes: &[u8] = if self.utf8_carry.is_empty() {
            chunk
        } else {
            let mut joined = std::mem::take(&mut self.utf8_carry);
            joined.extend_from_slice(chunk);
            owned = joined;
            &owned
        };
        match std::str::from_utf8(bytes) {
            Ok(text) => self.feed_str(text),
            Err(err) if err.error_len().is_none() => {
                let (head, tail) = bytes.split_at(err.valid_up_to());
                let text = std::str::from_utf8(head)
                    .map_err(|_| self.syntax("invalid UTF-8 byte sequence"))?;
                self.utf8_carry = tail.to_vec();
                self.feed_str(text)
            }
            Err(_) => Err(self.syntax("invalid UTF-8 byte sequence")),
        }
    }

    /// Completes the document and returns the decoded value.
    pub fn finish(mut self) -> Result<Value, Error> {
        if !self.utf8_carry.is_empty() {
            return Err(self.syntax("truncated UTF-8 byte sequence"));
        }
        match self.state {
            State::DocEnd => {}
            State::NonStringValue => self.attach_scalar(false)?,
            State::DocStart => return Err(self.syntax("empty JSON document")),
            _ => return Err(self.syntax("unexpected end of JSON document")),
        }
        self.result
            .take()
            .ok_or_else(|| Error::new(ErrorKind::Syntax).with_message("empty JSON document"))
    }

    fn syntax(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Syntax)
            .with_message(message)
            .with_location(self.line, self.column)
    }

    /// Dot-joined names of fields currently being decoded.
    fn field_path(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for frame in &self.frames {
            if let Frame::Map {
                pending_name: Some(name),
                ..
            } = frame
            {
                parts.push(name);
            }
        }
        parts.join(".")
    }

    fn scope_error(&self, err: Error, token: &str) -> Error {
        let path = self.field_path();
        if path.is_empty() {
            return err;
        }
        match err.kind() {
            ErrorKind::IncompatibleType | ErrorKind::CannotConvertToExpectedType => {
                Error::new(ErrorKind::IncompatibleValueForField)
                    .with_message(format!(
                        "value '{token}' cannot be converted to field '{path}'"
                    ))
                    .with_field_path(path)
            }
            _ => err,
        }
    }

    fn container_mismatch(&self, schema: &Schema, found: &str) -> Error {
        let path = self.field_path();
        if path.is_empty() {
            Error::new(ErrorKind::IncompatibleType).with_message(format!(
                "incompatible type expected '{}' but found '{found}'",
                schema.describe()
            ))
        } else {
            Error::new(ErrorKind::IncompatibleValueForField)
                .with_message(format!(
                    "'{found}' value cannot be converted to field '{path}' of type '{}'",
                    schema.describe()
                ))
                .with_field_path(path)
        }
    }

    fn state_after_value(&self) -> State {
        match self.frames.last() {
            Some(Frame::Map { .. }) => State::FieldEnd,
            Some(Frame::Array { .. }) => State::ArrayElementEnd,
            None => State::DocEnd,
        }
    }

    /// Attaches a finished value (or records a dropped one) on the
    /// innermost open container.
    fn attach(&mut self, value: Option<Value>) {
        match self.frames.last_mut() {
            Some(Frame::Map {
                value: map,
                pending_name,
                ..
            }) => {
                let name = pending_name.take();
                if let (Some(value), Some(name)) = (value, name) {
                    map.insert(name, value);
                }
            }
            Some(Frame::Array { items, index, .. }) => {
                *index += 1;
                if let Some(value) = value {
                    items.push(value);
                }
            }
            None => {
                if let Some(value) = value {
                    self.result = Some(value);
                }
            }
        }
    }

    fn attach_scalar(&mut self, quoted: bool) -> Result<(), Error> {
        let token = std::mem::take(&mut self.buf);
        let target = self.next.take().unwrap_or(Target::Drop);
        let field = self.current_field.take();
        match target {
            Target::Drop => {
                self.attach(None);
                Ok(())
            }
            Target::Typed(schema) => {
                if !quoted
                    && token == "null"
                    && self.options.nil_as_optional_field
                    && field
                        .as_ref()
                        .is_some_and(|f| !f.is_required() && !f.is_nilable())
                {
                    self.attach(None);
                    return Ok(());
                }
                let converted = if quoted {
                    convert_string_token(&token, &schema)
                } else {
                    convert_scalar_token(&token, &schema)
                };
                match converted {
                    Ok(value) => {
                        self.attach(Some(value));
                        Ok(())
                    }
                    Err(err) => Err(self.scope_error(err, &token)),
                }
            }
        }
    }

    /// Resolves the schema target for the element about to be read.
    fn prepare_element(&mut self) -> Result<(), Error> {
        let target = match self.frames.last() {
            Some(Frame::Array { schema, index, .. }) => match schema {
                None => Target::Drop,
                Some(schema) => match member_schema(schema, *index, self.options.projection)? {
                    Some(member) => Target::Typed(member),
                    None => Target::Drop,
                },
            },
            _ => return Err(self.syntax("array element outside of a list")),
        };
        self.next = Some(target);
        Ok(())
    }

    fn open_map(&mut self) -> Result<(), Error> {
        let target = self.next.take().unwrap_or(Target::Drop);
        self.current_field = None;
        let shape = match target {
            Target::Drop => None,
            Target::Typed(schema) => Some(self.resolve_map_shape(&schema)?),
        };
        let value = match &shape {
            Some(MapShape {
                shape: Some(record),
                ..
            }) => OrderedMap::with_shape(Arc::clone(record)),
            _ => OrderedMap::new(),
        };
        self.frames.push(Frame::Map {
            value,
            shape,
            pending_name: None,
        });
        Ok(())
    }

    fn resolve_map_shape(&self, schema: &Arc<Schema>) -> Result<MapShape, Error> {
        match raw_type(schema).as_ref() {
            Schema::Record(record) => Ok(MapShape {
                shape: Some(Arc::clone(record)),
                fields_remaining: record
                    .fields()
                    .iter()
                    .map(|f| (f.effective_name().to_string(), f.clone()))
                    .collect(),
                visited: HashSet::new(),
                rest: record.rest().cloned(),
            }),
            Schema::Map(value_schema) => Ok(MapShape {
                shape: None,
                fields_remaining: HashMap::new(),
                visited: HashSet::new(),
                rest: Some(Arc::clone(value_schema)),
            }),
            Schema::Json | Schema::Any => Ok(MapShape {
                shape: None,
                fields_remaining: HashMap::new(),
                visited: HashSet::new(),
                rest: Some(Arc::new(Schema::Json)),
            }),
            Schema::Union(members) => match sole_non_scalar_member(members)? {
                Some(member) => self.resolve_map_shape(&member),
                None => Err(self.container_mismatch(raw_type(schema), "map")),
            },
            other => Err(self.container_mismatch(other, "map")),
        }
    }

    fn open_array(&mut self) -> Result<(), Error> {
        let target = self.next.take().unwrap_or(Target::Drop);
        self.current_field = None;
        let schema = match target {
            Target::Drop => None,
            Target::Typed(schema) => Some(self.resolve_list_schema(&schema)?),
        };
        self.frames.push(Frame::Array {
            items: Vec::new(),
            schema,
            index: 0,
        });
        Ok(())
    }

    fn resolve_list_schema(&self, schema: &Arc<Schema>) -> Result<Arc<Schema>, Error> {
        let stripped = raw_type(schema);
        match stripped.as_ref() {
            Schema::Array { .. } | Schema::Tuple { .. } | Schema::Json | Schema::Any => {
                Ok(Arc::clone(stripped))
            }
            Schema::Union(members) => match sole_non_scalar_member(members)? {
                Some(member) => self.resolve_list_schema(&member),
                None => Err(self.container_mismatch(stripped, "list")),
            },
            other => Err(self.container_mismatch(other, "list")),
        }
    }

    fn handle_field_name(&mut self) -> Result<(), Error> {
        let raw = std::mem::take(&mut self.buf);
        enum Blocked {
            Duplicate,
            Undefined,
        }
        let projection = self.options.projection;
        let blocked = {
            let Some(Frame::Map {
                shape,
                pending_name,
                ..
            }) = self.frames.last_mut()
            else {
                return Err(self.syntax("field name outside of a mapping"));
            };
            match shape {
                None => {
                    *pending_name = None;
                    self.next = Some(Target::Drop);
                    self.current_field = None;
                    None
                }
                Some(map_shape) => {
                    if map_shape.visited.contains(&raw) {
                        Some(Blocked::Duplicate)
                    } else if let Some(field) = map_shape.fields_remaining.remove(&raw) {
                        map_shape.visited.insert(raw.clone());
                        *pending_name = Some(field.name().to_string());
                        self.next = Some(Target::Typed(Arc::clone(field.schema())));
                        self.current_field = Some(field);
                        None
                    } else if let Some(rest) = &map_shape.rest {
                        // rest/map/json keys are not fields; a repeat
                        // overwrites the earlier entry instead of failing
                        self.next = Some(Target::Typed(Arc::clone(rest)));
                        self.current_field = None;
                        *pending_name = Some(raw.clone());
                        None
                    } else if projection {
                        *pending_name = None;
                        self.next = Some(Target::Drop);
                        self.current_field = None;
                        None
                    } else {
                        Some(Blocked::Undefined)
                    }
                }
            }
        };
        match blocked {
            None => Ok(()),
            Some(Blocked::Duplicate) => Err(Error::new(ErrorKind::DuplicateField)
                .with_message(format!("duplicate field '{raw}'"))),
            Some(Blocked::Undefined) => {
                let mut path = self.field_path();
                if path.is_empty() {
                    path = raw;
                } else {
                    path.push('.');
                    path.push_str(&raw);
                }
                Err(Error::new(ErrorKind::UndefinedField)
                    .with_message(format!("undefined field '{path}'"))
                    .with_field_path(path))
            }
        }
    }

    fn close_map(&mut self) -> Result<(), Error> {
        let Some(frame) = self.frames.pop() else {
            return Err(self.syntax("unexpected '}'"));
        };
        let Frame::Map { value, shape, .. } = frame else {
            return Err(self.syntax("unexpected '}' inside a list"));
        };
        let attached = match shape {
            None => None,
            Some(map_shape) => {
                if let Some(record) = &map_shape.shape {
                    for field in record.fields() {
                        if !map_shape
                            .fields_remaining
                            .contains_key(field.effective_name())
                        {
                            continue;
                        }
                        if !field.is_required() {
                            continue;
                        }
                        if field.is_nilable() && self.options.absent_as_nilable_type {
                            continue;
                        }
                        let prefix = self.field_path();
                        let path = if prefix.is_empty() {
                            field.name().to_string()
                        } else {
                            format!("{prefix}.{}", field.name())
                        };
                        return Err(Error::new(ErrorKind::RequiredFieldNotPresent)
                            .with_message(format!("required field '{path}' not present in JSON"))
                            .with_field_path(path));
                    }
                }
                Some(Value::Map(value.finish()))
            }
        };
        self.attach(attached);
        self.state = self.state_after_value();
        Ok(())
    }

    fn close_array(&mut self) -> Result<(), Error> {
        let Some(frame) = self.frames.pop() else {
            return Err(self.syntax("unexpected ']'"));
        };
        let Frame::Array { items, schema, .. } = frame else {
            return Err(self.syntax("unexpected ']' inside a mapping"));
        };
        let attached = match schema {
            None => None,
            Some(schema) => {
                let declared = match schema.as_ref() {
                    Schema::Array {
                        size: ArraySize::Closed(n),
                        ..
                    } => Some(*n),
                    Schema::Tuple { members, .. } => Some(members.len()),
                    _ => None,
                };
                if let Some(declared) = declared {
                    if items.len() < declared && !self.options.projection {
                        return Err(Error::new(ErrorKind::ArraySizeMismatch).with_message(
                            format!("array size is not compatible with expected size {declared}"),
                        ));
                    }
                }
                Some(Value::List(items))
            }
        };
        self.attach(attached);
        self.state = self.state_after_value();
        Ok(())
    }

    /// Appends a character to the current string token, resolving any
    /// dangling high surrogate first.
    fn push_str_char(&mut self, ch: char) {
        if self.pending_surrogate.take().is_some() {
            self.buf.push(char::REPLACEMENT_CHARACTER);
        }
        self.buf.push(ch);
    }

    fn flush_surrogate(&mut self) {
        if self.pending_surrogate.take().is_some() {
            self.buf.push(char::REPLACEMENT_CHARACTER);
        }
    }

    fn string_state(ctx: StringContext) -> State {
        match ctx {
            StringContext::FieldName => State::FieldName,
            StringContext::FieldValue => State::StringFieldValue,
            StringContext::ArrayElement => State::StringArrayElement,
            StringContext::TopLevel => State::StringValue,
        }
    }

    fn complete_unicode_escape(&mut self, ctx: StringContext) -> Result<(), Error> {
        let code = u16::from_str_radix(&self.hex, 16)
            .map_err(|_| self.syntax("invalid unicode escape"))?;
        self.hex.clear();
        match code {
            0xD800..=0xDBFF => {
                self.flush_surrogate();
                self.pending_surrogate = Some(code);
            }
            0xDC00..=0xDFFF => match self.pending_surrogate.take() {
                Some(high) => {
                    let combined = 0x10000
                        + ((u32::from(high) - 0xD800) << 10)
                        + (u32::from(code) - 0xDC00);
                    self.buf
                        .push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => self.buf.push(char::REPLACEMENT_CHARACTER),
            },
            _ => {
                self.flush_surrogate();
                self.buf
                    .push(char::from_u32(u32::from(code)).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
        self.state = Self::string_state(ctx);
        Ok(())
    }

    fn step(&mut self, ch: char) -> Result<(), Error> {
        match self.state {
            State::DocStart => match ch {
                c if is_ws(c) => Ok(()),
                '{' => {
                    self.next = Some(Target::Typed(Arc::clone(&self.root)));
                    self.open_map()?;
                    self.state = State::FirstFieldReady;
                    Ok(())
                }
                '[' => {
                    self.next = Some(Target::Typed(Arc::clone(&self.root)));
                    self.open_array()?;
                    self.state = State::FirstArrayElementReady;
                    Ok(())
                }
                '"' => {
                    self.next = Some(Target::Typed(Arc::clone(&self.root)));
                    self.state = State::StringValue;
                    Ok(())
                }
                '}' | ']' | ',' | ':' => Err(self.syntax("expected a JSON value")),
                _ => {
                    self.next = Some(Target::Typed(Arc::clone(&self.root)));
                    self.state = State::NonStringValue;
                    self.step(ch)
                }
            },
            State::DocEnd => {
                if is_ws(ch) {
                    Ok(())
                } else {
                    Err(self.syntax("JSON document has already ended"))
                }
            }
            State::FirstFieldReady => match ch {
                c if is_ws(c) => Ok(()),
                '"' => {
                    self.state = State::FieldName;
                    Ok(())
                }
                '}' => self.close_map(),
                _ => Err(self.syntax("expected '\"' or '}'")),
            },
            State::NonFirstFieldReady => match ch {
                c if is_ws(c) => Ok(()),
                '"' => {
                    self.state = State::FieldName;
                    Ok(())
                }
                _ => Err(self.syntax("expected '\"'")),
            },
            State::FieldName => match ch {
                '"' => {
                    self.flush_surrogate();
                    self.handle_field_name()?;
                    self.state = State::EndFieldName;
                    Ok(())
                }
                '\\' => {
                    self.state = State::Escape(StringContext::FieldName);
                    Ok(())
                }
                _ => {
                    self.push_str_char(ch);
                    Ok(())
                }
            },
            State::EndFieldName => match ch {
                c if is_ws(c) => Ok(()),
                ':' => {
                    self.state = State::FieldValueReady;
                    Ok(())
                }
                _ => Err(self.syntax("expected ':'")),
            },
            State::FieldValueReady => match ch {
                c if is_ws(c) => Ok(()),
                '"' => {
                    self.state = State::StringFieldValue;
                    Ok(())
                }
                '{' => {
                    self.open_map()?;
                    self.state = State::FirstFieldReady;
                    Ok(())
                }
                '[' => {
                    self.open_array()?;
                    self.state = State::FirstArrayElementReady;
                    Ok(())
                }
                '}' | ']' | ',' | ':' => Err(self.syntax("expected a field value")),
                _ => {
                    self.state = State::NonStringFieldValue;
                    self.step(ch)
                }
            },
            State::StringFieldValue => match ch {
                '"' => {
                    self.flush_surrogate();
                    self.attach_scalar(true)?;
                    self.state = State::FieldEnd;
                    Ok(())
                }
                '\\' => {
                    self.state = State::Escape(StringContext::FieldValue);
                    Ok(())
                }
                _ => {
                    self.push_str_char(ch);
                    Ok(())
                }
            },
            State::NonStringFieldValue => match ch {
                ',' => {
                    self.attach_scalar(false)?;
                    self.state = State::NonFirstFieldReady;
                    Ok(())
                }
                '}' => {
                    self.attach_scalar(false)?;
                    self.close_map()
                }
                c if is_ws(c) => {
                    self.attach_scalar(false)?;
                    self.state = State::FieldEnd;
                    Ok(())
                }
                '"' | ']' | '[' | '{' => Err(self.syntax("unexpected character in field value")),
                _ => {
                    self.buf.push(ch);
                    Ok(())
                }
            },
            State::FieldEnd => match ch {
                c if is_ws(c) => Ok(()),
                ',' => {
                    self.state = State::NonFirstFieldReady;
                    Ok(())
                }
                '}' => self.close_map(),
                _ => Err(self.syntax("expected ',' or '}'")),
            },
            State::FirstArrayElementReady => match ch {
                c if is_ws(c) => Ok(()),
                ']' => self.close_array(),
                '"' => {
                    self.prepare_element()?;
                    self.state = State::StringArrayElement;
                    Ok(())
                }
                '{' => {
                    self.prepare_element()?;
                    self.open_map()?;
                    self.state = State::FirstFieldReady;
                    Ok(())
                }
                '[' => {
                    self.prepare_element()?;
                    self.open_array()?;
                    self.state = State::FirstArrayElementReady;
                    Ok(())
                }
                '}' | ',' | ':' => Err(self.syntax("expected an array element or ']'")),
                _ => {
                    self.prepare_element()?;
                    self.state = State::NonStringArrayElement;
                    self.step(ch)
                }
            },
            State::NonFirstArrayElementReady => match ch {
                c if is_ws(c) => Ok(()),
                '"' => {
                    self.prepare_element()?;
                    self.state = State::StringArrayElement;
                    Ok(())
                }
                '{' => {
                    self.prepare_element()?;
                    self.open_map()?;
                    self.state = State::FirstFieldReady;
                    Ok(())
                }
                '[' => {
                    self.prepare_element()?;
                    self.open_array()?;
                    self.state = State::FirstArrayElementReady;
                    Ok(())
                }
                '}' | ']' | ',' | ':' => Err(self.syntax("expected an array element")),
                _ => {
                    self.prepare_element()?;
                    self.state = State::NonStringArrayElement;
                    self.step(ch)
                }
            },
            State::StringArrayElement => match ch {
                '"' => {
                    self.flush_surrogate();
                    self.attach_scalar(true)?;
                    self.state = State::ArrayElementEnd;
                    Ok(())
                }
                '\\' => {
                    self.state = State::Escape(StringContext::ArrayElement);
                    Ok(())
                }
                _ => {
                    self.push_str_char(ch);
                    Ok(())
                }
            },
            State::NonStringArrayElement => match ch {
                ',' => {
                    self.attach_scalar(false)?;
                    self.state = State::NonFirstArrayElementReady;
                    Ok(())
                }
                ']' => {
                    self.attach_scalar(false)?;
                    self.close_array()
                }
                c if is_ws(c) => {
                    self.attach_scalar(false)?;
                    self.state = State::ArrayElementEnd;
                    Ok(())
                }
                '"' | '}' | '[' | '{' => {
                    Err(self.syntax("unexpected character in array element"))
                }
                _ => {
                    self.buf.push(ch);
                    Ok(())
                }
            },
            State::ArrayElementEnd => match ch {
                c if is_ws(c) => Ok(()),
                ',' => {
                    self.state = State::NonFirstArrayElementReady;
                    Ok(())
                }
                ']' => self.close_array(),
                _ => Err(self.syntax("expected ',' or ']'")),
            },
            State::StringValue => match ch {
                '"' => {
                    self.flush_surrogate();
                    self.attach_scalar(true)?;
                    self.state = State::DocEnd;
                    Ok(())
                }
                '\\' => {
                    self.state = State::Escape(StringContext::TopLevel);
                    Ok(())
                }
                _ => {
                    self.push_str_char(ch);
                    Ok(())
                }
            },
            State::NonStringValue => match ch {
                c if is_ws(c) => {
                    self.attach_scalar(false)?;
                    self.state = State::DocEnd;
                    Ok(())
                }
                _ => {
                    self.buf.push(ch);
                    Ok(())
                }
            },
            State::Escape(ctx) => {
                let resolved = match ch {
                    '"' => Some('"'),
                    '\\' => Some('\\'),
                    '/' => Some('/'),
                    'b' => Some('\u{0008}'),
                    'f' => Some('\u{000C}'),
                    'n' => Some('\n'),
                    'r' => Some('\r'),
                    't' => Some('\t'),
                    'u' => None,
                    _ => return Err(self.syntax(format!("invalid escape character '{ch}'"))),
                };
                match resolved {
                    Some(resolved) => {
                        self.push_str_char(resolved);
                        self.state = Self::string_state(ctx);
                    }
                    None => {
                        self.hex.clear();
                        self.state = State::UnicodeHex(ctx);
                    }
                }
                Ok(())
            }
            State::UnicodeHex(ctx) => {
                if !ch.is_ascii_hexdigit() {
                    return Err(self.syntax("invalid unicode escape"));
                }
                self.hex.push(ch);
                if self.hex.len() == 4 {
                    self.complete_unicode_escape(ctx)?;
                }
                Ok(())
            }
        }
    }
}
