//! Qualified type names.
//!
//! Every unit and quantity is identified by a dot-separated qualified name
//! such as `Physics.Length`. Names are the keys of every population index, so
//! they hash, compare and order by their segments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A globally unique, dot-separated type identity.
///
/// # Examples
///
/// ```
/// # use measura_ast::foundation::TypeName;
/// let name = TypeName::parse("Physics.Length").unwrap();
/// assert_eq!(name.segments(), &["Physics", "Length"]);
/// assert_eq!(name.short_name(), "Length");
/// assert_eq!(name.to_string(), "Physics.Length");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName {
    segments: Vec<String>,
}

/// Reason a string could not be parsed as a [`TypeName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The string was empty or whitespace only
    Empty,
    /// A segment between two dots was empty, e.g. `Physics..Length`
    EmptySegment(String),
    /// A segment contained whitespace or a character outside `[A-Za-z0-9_]`
    InvalidSegment(String),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "type name is empty"),
            NameError::EmptySegment(s) => write!(f, "type name '{}' has an empty segment", s),
            NameError::InvalidSegment(s) => {
                write!(f, "type name segment '{}' is not a valid identifier", s)
            }
        }
    }
}

impl std::error::Error for NameError {}

impl TypeName {
    /// Parse a dot-separated qualified name.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] when the name is empty, has an empty segment,
    /// or a segment that is not an identifier.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(NameError::EmptySegment(trimmed.to_string()));
            }
            let valid = segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(NameError::InvalidSegment(segment.to_string()));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Get the name segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, i.e. the unqualified type name.
    pub fn short_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The enclosing namespace, if the name is qualified.
    pub fn namespace(&self) -> Option<TypeName> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl TryFrom<String> for TypeName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for TypeName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified() {
        let name = TypeName::parse("Physics.Motion.Speed").unwrap();
        assert_eq!(name.segments().len(), 3);
        assert_eq!(name.short_name(), "Speed");
        assert_eq!(name.namespace().unwrap().to_string(), "Physics.Motion");
    }

    #[test]
    fn test_parse_unqualified_has_no_namespace() {
        let name = TypeName::parse("Length").unwrap();
        assert!(name.namespace().is_none());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(TypeName::parse("  Length ").unwrap().to_string(), "Length");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(TypeName::parse(""), Err(NameError::Empty));
        assert_eq!(TypeName::parse("   "), Err(NameError::Empty));
        assert!(matches!(
            TypeName::parse("Physics..Length"),
            Err(NameError::EmptySegment(_))
        ));
        assert!(matches!(
            TypeName::parse("Physics.Len gth"),
            Err(NameError::InvalidSegment(_))
        ));
    }

    #[test]
    fn test_serde_uses_dotted_string() {
        let name = TypeName::parse("Physics.Length").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Physics.Length\"");
        let back: TypeName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_str::<TypeName>("\"a..b\"").is_err());
    }
}
