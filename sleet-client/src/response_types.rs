//! Typed rows for the discovery endpoints.
//!
//! The endpoints serve pipe-separated typed tables; binding to the
//! record types is by column name, so unknown columns are ignored and
//! column order never matters.

use std::str::FromStr;

use sleet_psv::{Document, FieldType, Row, Schema};
use sleet_types::{CdnHash, CdnInfo, Region, VersionInfo};

use crate::error::{Error, Result};

/// Access to one row's cells by column name, with the type checks the
/// table format requires.
struct FieldAccessor<'a> {
    row: &'a Row,
    schema: &'a Schema,
}

impl<'a> FieldAccessor<'a> {
    fn new(row: &'a Row, schema: &'a Schema) -> Self {
        Self { row, schema }
    }

    fn raw(&self, field: &str) -> Result<&'a str> {
        self.row
            .get_raw_by_name(field, self.schema)
            .ok_or_else(|| Error::invalid_row(field, "missing column"))
    }

    /// Any column type converts to a string verbatim.
    fn get_string(&self, field: &str) -> Result<String> {
        self.raw(field).map(str::to_string)
    }

    /// A `STRING` column split on whitespace.
    fn get_string_list(&self, field: &str) -> Result<Vec<String>> {
        match self.schema.field(field).map(|f| f.field_type) {
            Some(FieldType::String(_)) => {}
            Some(other) => {
                return Err(Error::invalid_row(
                    field,
                    format!("cannot split {other} column into a list"),
                ));
            }
            None => return Err(Error::invalid_row(field, "missing column")),
        }
        Ok(self
            .raw(field)?
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    /// A `DEC` column whose declared byte length fits the target width.
    fn get_u32(&self, field: &str) -> Result<u32> {
        match self.schema.field(field).map(|f| f.field_type) {
            Some(FieldType::Decimal(len)) if len <= 4 => {}
            Some(other) => {
                return Err(Error::invalid_row(
                    field,
                    format!("cannot decode {other} column into a 4-byte integer"),
                ));
            }
            None => return Err(Error::invalid_row(field, "missing column")),
        }
        let value = self.raw(field)?;
        value
            .parse()
            .map_err(|_| Error::invalid_row(field, format!("not an integer: {value:?}")))
    }

    /// A `HEX:16` column decoded into a hash, shorter values
    /// right-aligned.
    fn get_hash(&self, field: &str) -> Result<CdnHash> {
        match self.schema.field(field).map(|f| f.field_type) {
            Some(FieldType::Hex(16)) => {}
            Some(other) => {
                return Err(Error::invalid_row(
                    field,
                    format!("cannot decode {other} column into a 16-byte hash"),
                ));
            }
            None => return Err(Error::invalid_row(field, "missing column")),
        }
        let value = self.raw(field)?;
        CdnHash::from_str(value)
            .map_err(|_| Error::invalid_row(field, format!("bad hash: {value:?}")))
    }

    /// Like [`get_hash`](Self::get_hash), but an absent column or empty
    /// cell is `None`.
    fn get_hash_optional(&self, field: &str) -> Result<Option<CdnHash>> {
        match self.row.get_raw_by_name(field, self.schema) {
            None | Some("") => Ok(None),
            Some(_) => self.get_hash(field).map(Some),
        }
    }
}

/// Parse a `cdns` table body into mirror records.
///
/// Rows with an empty host list are rejected: every consumer assumes at
/// least one mirror.
pub fn parse_cdns(content: &str) -> Result<Vec<CdnInfo>> {
    let doc = Document::parse(content)?;
    let mut entries = Vec::new();

    for row in doc.rows() {
        let accessor = FieldAccessor::new(row, doc.schema());

        let name = accessor.get_string("Name")?;
        let hosts = accessor.get_string_list("Hosts")?;
        if hosts.is_empty() {
            return Err(Error::EmptyHostList { name });
        }

        entries.push(CdnInfo {
            name: Region::new(name),
            path: accessor.get_string("Path")?,
            hosts,
            config_path: accessor.get_string("ConfigPath")?,
        });
    }

    Ok(entries)
}

/// Parse a `versions` table body into deployed-build records.
pub fn parse_versions(content: &str) -> Result<Vec<VersionInfo>> {
    let doc = Document::parse(content)?;
    let mut entries = Vec::new();

    for row in doc.rows() {
        let accessor = FieldAccessor::new(row, doc.schema());

        entries.push(VersionInfo {
            region: Region::new(accessor.get_string("Region")?),
            build_config: accessor.get_hash("BuildConfig")?,
            cdn_config: accessor.get_hash("CDNConfig")?,
            key_ring: accessor.get_hash_optional("KeyRing")?,
            build_id: accessor.get_u32("BuildId")?,
            versions_name: accessor.get_string("VersionsName")?,
            product_config: accessor.get_hash("ProductConfig")?,
        });
    }

    Ok(entries)
}
