//! Line-level scanning of `key = value` text.

use std::collections::HashMap;

use tracing::trace;

/// A scanned config body: a bag of string keys and values.
///
/// Scanning never fails; lines that are not `key = value` shaped are
/// skipped, and a repeated key keeps its last value.
#[derive(Debug, Clone, Default)]
pub struct ConfigText {
    values: HashMap<String, String>,
}

impl ConfigText {
    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            trace!("config entry {key:?} = {value:?}");
            values.insert(key.to_string(), value.to_string());
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basics() {
        let cfg = ConfigText::parse(
            "# Build Configuration\n\
             \n\
             root = 5a2aa0bb187beff1a846cf89dcda6a41\n\
             build-name=B52008\n\
             not a config line\n",
        );

        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.get("root"), Some("5a2aa0bb187beff1a846cf89dcda6a41"));
        assert_eq!(cfg.get("build-name"), Some("B52008"));
        assert_eq!(cfg.get("missing"), None);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let cfg = ConfigText::parse("  key   =   value with spaces  \n");
        assert_eq!(cfg.get("key"), Some("value with spaces"));
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let cfg = ConfigText::parse("key = first\nkey = second\n");
        assert_eq!(cfg.get("key"), Some("second"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cfg = ConfigText::parse("key = a=b\n");
        assert_eq!(cfg.get("key"), Some("a=b"));
    }
}
