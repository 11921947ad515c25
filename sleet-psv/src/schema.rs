//! Table schema parsed from the header line.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::field_type::FieldType;

/// A single column of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name, case-sensitive as written in the header.
    pub name: String,
    pub field_type: FieldType,
    /// Zero-based column index.
    pub index: usize,
}

/// The full column set of a table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Parse the header line, e.g.
    /// `Name!STRING:0|Path!STRING:0|Hosts!STRING:0|ConfigPath!STRING:0`.
    pub fn parse_header(line: &str) -> Result<Self> {
        let mut fields = Vec::new();
        let mut by_name = HashMap::new();

        for cell in line.split('|') {
            let (name, type_spec) = cell.split_once('!').ok_or_else(|| Error::InvalidHeader {
                reason: format!("column {cell:?} is missing a type"),
            })?;

            if by_name.contains_key(name) {
                return Err(Error::DuplicateField {
                    field: name.to_string(),
                });
            }

            let index = fields.len();
            fields.push(Field {
                name: name.to_string(),
                field_type: FieldType::parse(type_spec)?,
                index,
            });
            by_name.insert(name.to_string(), index);
        }

        if fields.is_empty() {
            return Err(Error::InvalidHeader {
                reason: "no columns declared".to_string(),
            });
        }

        Ok(Self { fields, by_name })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validate one record's values against the column types.
    pub fn validate_row(&self, line: usize, values: &[String]) -> Result<()> {
        if values.len() != self.fields.len() {
            return Err(Error::RowMismatch {
                line,
                expected: self.fields.len(),
                actual: values.len(),
            });
        }

        for (field, value) in self.fields.iter().zip(values) {
            field.field_type.validate_value(value).map_err(|mut err| {
                if let Error::InvalidValue { field: name, .. } = &mut err {
                    *name = field.name.clone();
                }
                err
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let schema =
            Schema::parse_header("Region!STRING:0|BuildConfig!HEX:16|BuildId!DEC:4").unwrap();

        assert_eq!(schema.field_count(), 3);
        assert!(schema.has_field("Region"));

        let build = schema.field("BuildConfig").unwrap();
        assert_eq!(build.field_type, FieldType::Hex(16));
        assert_eq!(build.index, 1);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Schema::parse_header("Region!STRING:0|Region!HEX:16");
        assert!(matches!(result, Err(Error::DuplicateField { .. })));
    }

    #[test]
    fn test_missing_type_rejected() {
        let result = Schema::parse_header("Region|BuildId!DEC:4");
        assert!(matches!(result, Err(Error::InvalidHeader { .. })));
    }

    #[test]
    fn test_validate_row() {
        let schema = Schema::parse_header("Region!STRING:0|BuildId!DEC:4").unwrap();

        assert!(
            schema
                .validate_row(2, &["us".to_string(), "52008".to_string()])
                .is_ok()
        );

        let short = schema.validate_row(2, &["us".to_string()]);
        assert!(matches!(short, Err(Error::RowMismatch { line: 2, .. })));

        let bad = schema.validate_row(3, &["us".to_string(), "abc".to_string()]);
        assert!(matches!(bad, Err(Error::InvalidValue { .. })));
    }
}
