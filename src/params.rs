//! Per-call request parameters.

use crate::error::{RedcapError, Result};
use crate::validate::{ApiToken, Format};

/// Ordered form parameters for a single API call.
///
/// Built fresh for every call and never shared across calls. Pairs keep
/// insertion order, which is also the order they are form-encoded on the
/// wire. The constructor sets the keys every call needs: `token`,
/// `content`, and `returnFormat=json` so error envelopes always come
/// back as JSON.
#[derive(Debug, Clone)]
pub struct RequestParameters {
    pairs: Vec<(String, String)>,
}

impl RequestParameters {
    pub fn new(token: &ApiToken, content: &str) -> Self {
        let mut params = Self { pairs: Vec::new() };
        params.set("token", token.as_str());
        params.set("content", content);
        params.set("returnFormat", "json");
        params
    }

    /// Append a key/value pair.
    pub fn set(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Append the wire name of a format as the `format` key.
    pub fn set_format(&mut self, format: Format) {
        self.set("format", format.wire_name());
    }

    /// Append a pair only when a value is present.
    pub fn set_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Append a boolean as the literal `true`/`false` the API expects.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, if value { "true" } else { "false" });
    }

    /// Append a list as indexed array keys (`records[0]`, `records[1]`,
    /// ...). Empty lists append nothing.
    pub fn set_indexed(&mut self, key: &str, values: &[String]) {
        for (index, value) in values.iter().enumerate() {
            self.set(&format!("{key}[{index}]"), value);
        }
    }

    /// Append caller-supplied extra parameters.
    ///
    /// A key the operation has already set (or a reserved key like
    /// `token` or `content`) cannot be re-supplied; that is more
    /// arguments than the operation accepts.
    pub fn extend_extra(&mut self, extras: &[(String, String)]) -> Result<()> {
        for (key, value) in extras {
            let base = key.split('[').next().unwrap_or(key);
            if self.contains_key(base) {
                return Err(RedcapError::TooManyArguments(format!(
                    "parameter '{base}' is already set by this operation"
                )));
            }
            self.set(key, value);
        }
        Ok(())
    }

    /// Whether any pair uses `key` (indexed variants like `key[0]`
    /// count).
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs
            .iter()
            .any(|(k, _)| k == key || k.split('[').next() == Some(key))
    }

    /// The ordered pairs, as they will be encoded.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub(crate) fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}
