pub mod registration;
pub mod templates;
pub mod tree;

pub use registration::{RegistrationForm, Slice, SubmitError};
pub use tree::{EntryKey, FieldPath, FormTree, Segment};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Unknown field `{field}` in {slice}")]
    UnknownField { slice: &'static str, field: String },

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field `{0}` is missing")]
    MissingField(String),

    #[error("`{0}` is not an object")]
    NotAnObject(String),

    #[error("Path does not point at a repeatable group")]
    NotAGroup,

    #[error("No entry with key {0}")]
    UnknownEntry(EntryKey),

    #[error("Entries of a repeatable group must be objects")]
    EntryNotObject,

    #[error("Jurisdiction selection `{0}` is not a valid id")]
    InvalidJurisdiction(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
