//! Error types for table parsing

use thiserror::Error;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Column type specification is not `TYPE:BYTELEN` with a known type
    #[error("invalid field type: {spec:?}")]
    InvalidFieldType { spec: String },

    /// Header line is structurally broken
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    /// Two columns share a name
    #[error("duplicate column name: {field:?}")]
    DuplicateField { field: String },

    /// The document has no header line
    #[error("missing header line")]
    MissingHeader,

    /// The document is empty
    #[error("document is empty")]
    EmptyDocument,

    /// A record has the wrong number of fields
    #[error("record on line {line} has {actual} fields, header declares {expected}")]
    RowMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    /// A value does not match its column's declared type
    #[error("invalid {field_type} value for column {field:?}: {value:?}")]
    InvalidValue {
        field: String,
        field_type: String,
        value: String,
    },
}
