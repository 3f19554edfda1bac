use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    UnsupportedSchema,
    Syntax,
    IncompatibleType,
    IncompatibleValueForField,
    ArraySizeMismatch,
    RequiredFieldNotPresent,
    UndefinedField,
    DuplicateField,
    CannotConvertToExpectedType,
    SourceRead,
    Validation,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    field_path: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            line: None,
            column: None,
            field_path: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn location(&self) -> Option<(u32, u32)> {
        match (self.line, self.column) {
            (Some(line), Some(column)) => Some((line, column)),
            _ => None,
        }
    }

    pub fn field_path(&self) -> Option<&str> {
        self.field_path.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_field_path(mut self, field_path: impl Into<String>) -> Self {
        self.field_path = Some(field_path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line: {line}, column: {column})")?;
        }
        if let Some(field_path) = &self.field_path {
            write!(f, " (field: {field_path})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::UnsupportedSchema => 2,
        ErrorKind::Syntax => 3,
        ErrorKind::IncompatibleType => 4,
        ErrorKind::IncompatibleValueForField => 5,
        ErrorKind::ArraySizeMismatch => 6,
        ErrorKind::RequiredFieldNotPresent => 7,
        ErrorKind::UndefinedField => 8,
        ErrorKind::DuplicateField => 9,
        ErrorKind::CannotConvertToExpectedType => 10,
        ErrorKind::SourceRead => 11,
        ErrorKind::Validation => 12,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::UnsupportedSchema, 2),
            (ErrorKind::Syntax, 3),
            (ErrorKind::IncompatibleType, 4),
            (ErrorKind::IncompatibleValueForField, 5),
            (ErrorKind::ArraySizeMismatch, 6),
            (ErrorKind::RequiredFieldNotPresent, 7),
            (ErrorKind::UndefinedField, 8),
            (ErrorKind::DuplicateField, 9),
            (ErrorKind::CannotConvertToExpectedType, 10),
            (ErrorKind::SourceRead, 11),
            (ErrorKind::Validation, 12),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_location_and_field_path() {
        let err = Error::new(ErrorKind::Syntax)
            .with_message("expected ':'")
            .with_location(3, 14);
        assert_eq!(
            format!("{err}"),
            "Syntax: expected ':' (line: 3, column: 14)"
        );

        let err = Error::new(ErrorKind::IncompatibleValueForField)
            .with_message("value '1' cannot be converted to 'string'")
            .with_field_path("user.name");
        assert!(format!("{err}").ends_with("(field: user.name)"));
    }
}
