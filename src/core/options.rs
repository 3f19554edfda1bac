use crate::core::error::Error;
use crate::core::schema::Schema;
use crate::core::value::Value;

/// Knobs shared by the tree and streaming decode paths.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    /// Drop input the schema does not describe instead of failing.
    pub projection: bool,
    /// Treat an explicit `null` for a non-nilable optional field as absence.
    pub nil_as_optional_field: bool,
    /// Let a nilable field satisfy its required flag by being absent.
    pub absent_as_nilable_type: bool,
    /// Run the constraint hook over the finished value.
    pub validate_constraints: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            projection: false,
            nil_as_optional_field: false,
            absent_as_nilable_type: false,
            validate_constraints: false,
        }
    }
}

/// Post-decode constraint hook. Failures are wrapped as
/// `ErrorKind::Validation` by the callers in `api`.
pub trait ConstraintValidator {
    fn validate(&self, value: &Value, schema: &Schema) -> Result<(), Error>;
}
