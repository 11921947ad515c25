//! Decoders for the textual `key = value` configuration format.
//!
//! Build and CDN configs are plain UTF-8 text: blank lines and `#`
//! comments are ignored, every other line is `key = value` with
//! whitespace trimmed on both sides. Unknown keys are skipped so newer
//! server-side fields never break older clients.
//!
//! ```rust
//! let build = sleet_config::parse_build_config(
//!     "# Build Configuration\n\
//!      root = 5a2aa0bb187beff1a846cf89dcda6a41\n\
//!      encoding = e0e1f0f1000000000000000000008d8f 15352535000000000000000000006317\n\
//!      encoding-size = 44979819 44930354\n",
//! )?;
//! assert_eq!(build.encoding_size.uncompressed, 44_979_819);
//! # Ok::<(), sleet_config::Error>(())
//! ```

pub mod error;
pub mod text;
pub mod typed;

pub use error::{Error, Result};
pub use text::ConfigText;
pub use typed::{parse_build_config, parse_cdn_config};
