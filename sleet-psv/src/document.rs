//! Parsed table documents.

use crate::error::{Error, Result};
use crate::schema::Schema;

/// One record of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    /// Raw value by column index.
    pub fn get_raw(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Raw value by column name. `None` when the schema has no such
    /// column, which callers treat as the column being absent from this
    /// table revision.
    pub fn get_raw_by_name<'a>(&'a self, name: &str, schema: &Schema) -> Option<&'a str> {
        schema.field(name).and_then(|f| self.get_raw(f.index))
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// A fully parsed, schema-validated table.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Schema,
    rows: Vec<Row>,
}

impl Document {
    /// Parse a complete table body.
    ///
    /// The first line must be the typed header. Blank lines and `##`
    /// comment lines anywhere in the body are skipped; every other line
    /// is a record and must match the header's column count and types.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break line,
                None => return Err(Error::EmptyDocument),
            }
        };
        if !header.contains('!') {
            return Err(Error::MissingHeader);
        }
        let schema = Schema::parse_header(header)?;

        let mut rows = Vec::new();
        for (index, line) in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("##") {
                continue;
            }

            let values: Vec<String> = line.split('|').map(str::to_string).collect();
            schema.validate_row(index + 1, &values)?;
            rows.push(Row { values });
        }

        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}
