//! Column type specifications.

use std::fmt;

use crate::error::{Error, Result};

/// A column type with its declared byte length, parsed from the
/// `TYPE:BYTELEN` half of a header cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free-form text; the length is advisory (0 means unbounded).
    String(usize),
    /// Hex-encoded bytes; the length bounds the decoded byte count.
    Hex(usize),
    /// Base-10 integer that fits in the given number of bytes.
    Decimal(usize),
}

impl FieldType {
    /// Parse a `TYPE:BYTELEN` specification. Type names are
    /// case-insensitive; the byte length is mandatory.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || Error::InvalidFieldType {
            spec: spec.to_string(),
        };

        let (name, len) = spec.split_once(':').ok_or_else(invalid)?;
        let len: usize = len.trim().parse().map_err(|_| invalid())?;

        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(FieldType::String(len)),
            "hex" => Ok(FieldType::Hex(len)),
            "dec" => Ok(FieldType::Decimal(len)),
            _ => Err(invalid()),
        }
    }

    /// The declared byte length.
    pub fn byte_len(&self) -> usize {
        match *self {
            FieldType::String(len) | FieldType::Hex(len) | FieldType::Decimal(len) => len,
        }
    }

    /// Check that `value` is shaped correctly for this type.
    ///
    /// `HEX` values must be even-length hex no longer than the declared
    /// byte count (empty is allowed: optional columns are served as empty
    /// cells). `DEC` values must be base-10 integers.
    pub fn validate_value(&self, value: &str) -> Result<()> {
        let invalid = |kind: &FieldType| Error::InvalidValue {
            field: String::new(),
            field_type: kind.to_string(),
            value: value.to_string(),
        };

        match self {
            FieldType::String(_) => Ok(()),
            FieldType::Hex(len) => {
                let raw = hex::decode(value).map_err(|_| invalid(self))?;
                if *len > 0 && raw.len() > *len {
                    return Err(invalid(self));
                }
                Ok(())
            }
            FieldType::Decimal(_) => {
                value.parse::<i128>().map_err(|_| invalid(self))?;
                Ok(())
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldType::String(len) => write!(f, "STRING:{len}"),
            FieldType::Hex(len) => write!(f, "HEX:{len}"),
            FieldType::Decimal(len) => write!(f, "DEC:{len}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(FieldType::parse("STRING:0").unwrap(), FieldType::String(0));
        assert_eq!(FieldType::parse("HEX:16").unwrap(), FieldType::Hex(16));
        assert_eq!(FieldType::parse("DEC:4").unwrap(), FieldType::Decimal(4));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(FieldType::parse("hex:16").unwrap(), FieldType::Hex(16));
        assert_eq!(FieldType::parse("Dec:4").unwrap(), FieldType::Decimal(4));
    }

    #[test]
    fn test_parse_rejects_bad_specs() {
        assert!(FieldType::parse("STRING").is_err()); // missing byte length
        assert!(FieldType::parse("STRING:x").is_err()); // non-integer length
        assert!(FieldType::parse("BLOB:4").is_err()); // unknown type
    }

    #[test]
    fn test_validate_hex() {
        let ty = FieldType::Hex(16);
        assert!(ty.validate_value("abcd1234abcd1234abcd1234abcd1234").is_ok());
        assert!(ty.validate_value("").is_ok()); // optional column
        assert!(ty.validate_value("abc").is_err()); // odd length
        assert!(ty.validate_value("zz").is_err());
        assert!(
            ty.validate_value("abcd1234abcd1234abcd1234abcd1234ff")
                .is_err()
        ); // 17 bytes
    }

    #[test]
    fn test_validate_dec() {
        let ty = FieldType::Decimal(4);
        assert!(ty.validate_value("52008").is_ok());
        assert!(ty.validate_value("-1").is_ok());
        assert!(ty.validate_value("24.3").is_err());
        assert!(ty.validate_value("").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["STRING:0", "HEX:16", "DEC:4"] {
            assert_eq!(FieldType::parse(spec).unwrap().to_string(), spec);
        }
    }
}
