//! Parser for the pipe-separated typed tables served by the discovery
//! endpoints.
//!
//! The format is a header line declaring typed columns, followed by one
//! record per line:
//!
//! ```text
//! Name!STRING:0|BuildConfig!HEX:16|BuildId!DEC:4
//! us|abcd1234abcd1234abcd1234abcd1234|52008
//! eu|1234abcd1234abcd1234abcd1234abcd|52008
//! ```
//!
//! Column types are `STRING`, `HEX` and `DEC` (case-insensitive), each
//! with a declared byte length. Parsing validates every row against the
//! header schema; typed extraction by column name is left to the caller.
//!
//! ```rust
//! use sleet_psv::Document;
//!
//! let doc = Document::parse("Region!STRING:0|BuildId!DEC:4\nus|1234\neu|5678")?;
//! assert_eq!(doc.rows().len(), 2);
//! let row = &doc.rows()[0];
//! assert_eq!(row.get_raw_by_name("Region", doc.schema()), Some("us"));
//! # Ok::<(), sleet_psv::Error>(())
//! ```

pub mod document;
pub mod error;
pub mod field_type;
pub mod schema;

pub use document::{Document, Row};
pub use error::{Error, Result};
pub use field_type::FieldType;
pub use schema::{Field, Schema};
