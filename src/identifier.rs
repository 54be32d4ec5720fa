//! `package:icon` identifiers.
//!
//! The package segment may itself carry a namespace hint
//! (`namespace::package:icon`) when the identifier's first `:` opens a `::`;
//! the icon separator is then the next `:` after it.

use crate::error::{IconifyError, Result};
use crate::finder::HINT_DELIMITER;
use std::fmt;

/// Separator between the package and icon segments.
pub const ICON_SEPARATOR: char = ':';

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IconIdentifier {
    package: String,
    icon: String,
}

impl IconIdentifier {
    pub fn new(package: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            icon: icon.into(),
        }
    }

    /// Split an identifier into its segments.
    ///
    /// Returns `None` when the separator is missing or either segment is
    /// empty. Batch callers drop such identifiers silently.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (package, icon) = split_segments(raw)?;
        if package.is_empty() || icon.is_empty() {
            return None;
        }
        Some(Self::new(package, icon))
    }

    /// Like [`IconIdentifier::parse`] but reports why the identifier was rejected.
    pub fn try_parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let Some((package, icon)) = split_segments(trimmed) else {
            return Err(IconifyError::invalid_identifier(
                raw,
                format!("expected package{ICON_SEPARATOR}icon"),
            ));
        };
        if package.is_empty() {
            return Err(IconifyError::invalid_identifier(raw, "empty package segment"));
        }
        if icon.is_empty() {
            return Err(IconifyError::invalid_identifier(raw, "empty icon segment"));
        }
        Ok(Self::new(package, icon))
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }
}

impl fmt::Display for IconIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.package, ICON_SEPARATOR, self.icon)
    }
}

// A `::` only marks a namespace hint where the first `:` appears; any later
// `::` belongs to the icon segment.
fn split_segments(raw: &str) -> Option<(&str, &str)> {
    let first = raw.find(ICON_SEPARATOR)?;
    let split = if raw[first..].starts_with(HINT_DELIMITER) {
        let search_from = first + HINT_DELIMITER.len();
        search_from + raw[search_from..].find(ICON_SEPARATOR)?
    } else {
        first
    };
    Some((&raw[..split], &raw[split + ICON_SEPARATOR.len_utf8()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_identifier() {
        let id = IconIdentifier::parse("mdi:home").expect("valid");
        assert_eq!(id.package(), "mdi");
        assert_eq!(id.icon(), "home");
        assert_eq!(id.to_string(), "mdi:home");
    }

    #[test]
    fn rejects_missing_separator_and_empty_segments() {
        for raw in ["mdi", "", ":home", "mdi:", ":", "  "] {
            assert!(IconIdentifier::parse(raw).is_none(), "{raw:?} should be invalid");
            assert!(IconIdentifier::try_parse(raw).is_err(), "{raw:?} should error");
        }
    }

    #[test]
    fn icon_keeps_everything_after_first_separator() {
        let id = IconIdentifier::parse("mdi:arrow:left").expect("valid");
        assert_eq!(id.package(), "mdi");
        assert_eq!(id.icon(), "arrow:left");
    }

    #[test]
    fn namespaced_package_keeps_hint() {
        let id = IconIdentifier::parse("brand::si:github").expect("valid");
        assert_eq!(id.package(), "brand::si");
        assert_eq!(id.icon(), "github");

        assert!(IconIdentifier::parse("brand::si").is_none());
        assert!(IconIdentifier::parse("brand::si:").is_none());
    }

    #[test]
    fn double_colon_after_separator_belongs_to_icon() {
        let id = IconIdentifier::parse("mdi:home::x").expect("valid");
        assert_eq!(id.package(), "mdi");
        assert_eq!(id.icon(), "home::x");

        let id = IconIdentifier::parse("brand::si:github::dark").expect("valid");
        assert_eq!(id.package(), "brand::si");
        assert_eq!(id.icon(), "github::dark");
    }

    #[test]
    fn try_parse_reports_reason() {
        let err = IconIdentifier::try_parse("mdi:").unwrap_err();
        assert!(err.to_string().contains("empty icon segment"));
        let err = IconIdentifier::try_parse("home").unwrap_err();
        assert!(err.to_string().contains("expected package:icon"));
    }
}
