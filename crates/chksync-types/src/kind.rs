use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TypeError;

/// Discriminator between independently cached representations of one key.
///
/// A document, for example, carries both a `DOCUMENT_STATE` object and a
/// `SOURCE_TEXT` asset under the same key. The kind is also mixed into every
/// checksum, so two representations with identical bytes never share an
/// identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Kind(Cow<'static, str>);

impl Kind {
    pub const SOLUTION_STATE: Self = Self::from_static("SolutionState");
    pub const PROJECTS: Self = Self::from_static("Projects");
    pub const PROJECT_STATE: Self = Self::from_static("ProjectState");
    pub const DOCUMENTS: Self = Self::from_static("Documents");
    pub const DOCUMENT_STATE: Self = Self::from_static("DocumentState");
    pub const SOURCE_TEXT: Self = Self::from_static("SourceText");
    pub const COMPILATION_OPTIONS: Self = Self::from_static("CompilationOptions");
    pub const PARSE_OPTIONS: Self = Self::from_static("ParseOptions");
    pub const METADATA_REFERENCE: Self = Self::from_static("MetadataReference");
    pub const OPTION_SET: Self = Self::from_static("OptionSet");

    /// Build a kind from a static name.
    ///
    /// # Panics
    ///
    /// If `name` is empty. In a `const` this is a compile error.
    pub const fn from_static(name: &'static str) -> Self {
        assert!(!name.is_empty(), "kind name must not be empty");
        Self(Cow::Borrowed(name))
    }

    /// Build a kind from a runtime name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::EmptyKind);
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::new(name).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Kind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_owned_compare_by_name() {
        assert_eq!(Kind::new("SourceText").unwrap(), Kind::SOURCE_TEXT);
        assert_ne!(Kind::SOURCE_TEXT, Kind::DOCUMENT_STATE);
    }

    #[test]
    fn empty_kind_is_rejected() {
        assert_eq!(Kind::new(""), Err(TypeError::EmptyKind));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Kind::PROJECTS).unwrap();
        assert_eq!(json, "\"Projects\"");
        let parsed: Kind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Kind::PROJECTS);
    }

    #[test]
    fn empty_kind_does_not_deserialize() {
        let err = serde_json::from_str::<Kind>("\"\"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    #[should_panic(expected = "kind name must not be empty")]
    fn empty_static_kind_panics() {
        let name: &'static str = "";
        let _ = Kind::from_static(name);
    }

    #[test]
    fn display_is_the_name() {
        assert_eq!(Kind::OPTION_SET.to_string(), "OptionSet");
    }
}
