//! Argument validation.
//!
//! Every public operation validates its arguments here before any
//! network access, so an invalid call never produces side effects or a
//! partial request. Validators return typed values; downstream code
//! never re-checks them.

use crate::error::{RedcapError, Result};

/// Formats a record-export operation accepts.
pub(crate) const RECORD_FORMATS: &[Format] =
    &[Format::Php, Format::Json, Format::Csv, Format::Xml, Format::Odm];

/// Formats accepted by metadata, project-info, and similar content
/// exports (everything except ODM).
pub(crate) const CONTENT_FORMATS: &[Format] =
    &[Format::Php, Format::Json, Format::Csv, Format::Xml];

/// The scope of a validated API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// 32-character token scoped to one project.
    Project,
    /// 64-character super token, valid only for project creation.
    Super,
}

/// A validated REDCap API token: exactly 32 or 64 hexadecimal
/// characters, immutable once validated.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken {
    value: String,
    kind: TokenKind,
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.debug_struct("ApiToken")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ApiToken {
    /// Validate a project-scoped API token (32 hex characters).
    pub fn project(raw: &str) -> Result<Self> {
        let token = Self::parse(raw)?;
        match token.kind {
            TokenKind::Project => Ok(token),
            TokenKind::Super => Err(RedcapError::InvalidArgument(
                "a 64-character super token cannot be used for project operations; \
                 use the project's 32-character API token"
                    .to_string(),
            )),
        }
    }

    /// Validate a super token (64 hex characters).
    pub fn super_token(raw: &str) -> Result<Self> {
        let token = Self::parse(raw)?;
        match token.kind {
            TokenKind::Super => Ok(token),
            TokenKind::Project => Err(RedcapError::InvalidArgument(
                "project creation requires a 64-character super token".to_string(),
            )),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let kind = match raw.len() {
            32 => TokenKind::Project,
            64 => TokenKind::Super,
            len => {
                return Err(RedcapError::InvalidArgument(format!(
                    "API token must be 32 or 64 characters long, got {len}"
                )))
            }
        };
        if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RedcapError::InvalidArgument(
                "API token must contain only hexadecimal characters".to_string(),
            ));
        }
        Ok(Self {
            value: raw.to_string(),
            kind,
        })
    }

    /// The validated token string.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether this is a project token or a super token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

/// Data format for exchanging content with the API.
///
/// `Php` is a convenience meaning "JSON on the wire, decoded to native
/// structures for the caller": it is sent as `json` and operations using
/// it return [`serde_json::Value`] rather than raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Php,
    Json,
    Csv,
    Xml,
    Odm,
}

impl Format {
    /// Parse a format name, case-insensitively and tolerating
    /// surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "php" => Ok(Self::Php),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "odm" => Ok(Self::Odm),
            other => Err(RedcapError::InvalidArgument(format!(
                "invalid format '{other}': expected one of php, json, csv, xml, odm"
            ))),
        }
    }

    /// The name sent on the wire. `Php` normalizes to `json`; the caller
    /// still receives decoded data.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Php | Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Odm => "odm",
        }
    }

    /// The format's own name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Php => "php",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Odm => "odm",
        }
    }

    /// True for row/column formats whose batch exports are stitched by
    /// stripping repeated header lines.
    pub fn is_tabular(self) -> bool {
        matches!(self, Self::Csv)
    }

    pub(crate) fn check_allowed(self, allowed: &[Format], operation: &str) -> Result<Self> {
        if allowed.contains(&self) {
            Ok(self)
        } else {
            Err(RedcapError::InvalidArgument(format!(
                "format '{}' is not valid for {operation}",
                self.name()
            )))
        }
    }
}

impl std::str::FromStr for Format {
    type Err = RedcapError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

/// Validate a record-id batch size. Zero is rejected; the type system
/// already excludes null, negative, and non-integer values.
pub fn batch_size(size: usize) -> Result<usize> {
    if size == 0 {
        return Err(RedcapError::InvalidArgument(
            "batch size must be a positive integer, not zero".to_string(),
        ));
    }
    Ok(size)
}

/// Validate a list of record ids: every id must be non-empty after
/// trimming.
pub fn record_ids(ids: &[String]) -> Result<()> {
    for (index, id) in ids.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(RedcapError::InvalidArgument(format!(
                "record id at index {index} is empty"
            )));
        }
    }
    Ok(())
}

/// Validate a required string argument such as a record id or field name.
pub(crate) fn required(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RedcapError::InvalidArgument(format!(
            "{name} must be a non-empty string"
        )));
    }
    Ok(())
}

/// Validate an optional repeat-instance number; instances are 1-based.
pub(crate) fn repeat_instance(instance: Option<u32>) -> Result<()> {
    if instance == Some(0) {
        return Err(RedcapError::InvalidArgument(
            "repeat instance must be a positive integer, not zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_TOKEN: &str = "12345678901234567890123456789012";

    #[test]
    fn test_valid_project_token() {
        let token = ApiToken::project("ABCDEF0123456789abcdef0123456789").unwrap();
        assert_eq!(token.kind(), TokenKind::Project);
        assert_eq!(token.as_str(), "ABCDEF0123456789abcdef0123456789");
    }

    #[test]
    fn test_token_of_31_characters_rejected() {
        let raw = &PROJECT_TOKEN[..31];
        assert!(matches!(
            ApiToken::project(raw),
            Err(RedcapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_token_with_non_hex_character_rejected() {
        let raw = "G2345678901234567890123456789012";
        assert_eq!(raw.len(), 32);
        assert!(matches!(
            ApiToken::project(raw),
            Err(RedcapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_super_token_rejected_for_project_scope() {
        let raw = PROJECT_TOKEN.repeat(2);
        assert!(ApiToken::super_token(&raw).is_ok());
        assert!(ApiToken::project(&raw).is_err());
    }

    #[test]
    fn test_project_token_rejected_for_super_scope() {
        assert!(ApiToken::super_token(PROJECT_TOKEN).is_err());
    }

    #[test]
    fn test_token_debug_redacts_value() {
        let token = ApiToken::project(PROJECT_TOKEN).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains(PROJECT_TOKEN));
    }

    #[test]
    fn test_format_parse_is_case_insensitive_and_trims() {
        assert_eq!(Format::parse(" JSON ").unwrap(), Format::Json);
        assert_eq!(Format::parse("Csv").unwrap(), Format::Csv);
        assert_eq!(Format::parse("php").unwrap(), Format::Php);
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(matches!(
            Format::parse("invalid"),
            Err(RedcapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_php_normalizes_to_json_on_the_wire() {
        assert_eq!(Format::Php.wire_name(), "json");
        assert_eq!(Format::Csv.wire_name(), "csv");
    }

    #[test]
    fn test_format_allowed_sets() {
        assert!(Format::Odm.check_allowed(RECORD_FORMATS, "record export").is_ok());
        assert!(Format::Odm
            .check_allowed(CONTENT_FORMATS, "metadata export")
            .is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            batch_size(0),
            Err(RedcapError::InvalidArgument(_))
        ));
        assert_eq!(batch_size(10).unwrap(), 10);
    }

    #[test]
    fn test_empty_record_id_rejected() {
        let ids = vec!["1001".to_string(), "  ".to_string()];
        assert!(record_ids(&ids).is_err());
        assert!(record_ids(&ids[..1]).is_ok());
    }

    #[test]
    fn test_zero_repeat_instance_rejected() {
        assert!(repeat_instance(Some(0)).is_err());
        assert!(repeat_instance(Some(1)).is_ok());
        assert!(repeat_instance(None).is_ok());
    }
}
