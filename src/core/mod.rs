// Core modules implementing the schema model, coercion, and both decode paths.
pub mod coerce;
pub mod error;
pub mod options;
pub mod parse;
pub mod schema;
pub mod source;
pub mod traverse;
pub mod value;
