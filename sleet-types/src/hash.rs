//! Nominal 16-byte hash types.
//!
//! `ContentHash` and `CdnHash` have identical layouts but deliberately
//! distinct types: a content hash must be looked up in the encoding table
//! before it can be used to form a CDN URL. Conversion is only possible
//! through the raw byte representation.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

macro_rules! hash_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 16]);

        impl $name {
            /// Wrap a raw 16-byte value.
            pub const fn new(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Copy a hash out of a byte slice.
            ///
            /// The slice must be exactly 16 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let raw: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| Error::InvalidHashLength { len: bytes.len() })?;
                Ok(Self(raw))
            }

            /// Raw bytes of the hash.
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Parse from hex text of up to 32 digits.
            ///
            /// Values shorter than 32 digits are right-aligned and
            /// left-padded with zero bytes, matching the textual config
            /// formats that omit leading zeroes.
            fn from_str(s: &str) -> Result<Self> {
                let raw = hex::decode(s).map_err(|_| Error::InvalidHash {
                    value: s.to_string(),
                })?;
                if raw.len() > 16 {
                    return Err(Error::InvalidHash {
                        value: s.to_string(),
                    });
                }
                let mut bytes = [0u8; 16];
                bytes[16 - raw.len()..].copy_from_slice(&raw);
                Ok(Self(bytes))
            }
        }
    };
}

hash_type! {
    /// MD5 of an original, decoded file's bytes.
    ///
    /// Used as an opaque identifier throughout the system; never appears
    /// in a URL directly.
    ContentHash
}

hash_type! {
    /// MD5 of a container-framed blob as stored on a mirror.
    ///
    /// The first four hex digits form the fan-out directories of the CDN
    /// object path.
    CdnHash
}
