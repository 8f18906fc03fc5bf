//! Enumerations and small value types used across WFS documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ogc_common::OgcError;

pub const WFS_SERVICE: &str = "WFS";
pub const WFS_VERSION: &str = "2.0.0";

/// Output and input format assumed when a document leaves it unset.
pub const DEFAULT_FORMAT: &str = "application/gml+xml; version=3.2";

/// Seconds a lock is held when `expiry` is unset.
pub const DEFAULT_LOCK_EXPIRY: u64 = 300;

/// Seconds to wait for remote resolution when `resolveTimeout` is unset.
pub const DEFAULT_RESOLVE_TIMEOUT: u64 = 300;

/// Resolution depth when `resolveDepth` is unset.
pub const DEFAULT_RESOLVE_DEPTH: &str = "*";

/// Keyword enumerations with a fixed wire spelling.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($param:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = OgcError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(OgcError::invalid_parameter($param, format!("unknown value '{}'", s)))
            }
        }
    };
}

keyword_enum! {
    /// Whether a GetFeature returns features or only their count.
    ResultType ("resultType") {
        #[default]
        Results => "results",
        Hits => "hits",
    }
}

keyword_enum! {
    /// Which resource references the server resolves.
    ResolveValue ("resolve") {
        Local => "local",
        Remote => "remote",
        All => "all",
        #[default]
        None => "none",
    }
}

keyword_enum! {
    /// `lockAction` / `releaseAction`: act on all features or only those
    /// that could be acted on.
    AllSome ("action") {
        #[default]
        All => "ALL",
        Some => "SOME",
    }
}

keyword_enum! {
    SortOrder ("SortOrder") {
        #[default]
        Asc => "ASC",
        Desc => "DESC",
    }
}

keyword_enum! {
    /// How an Update applies a property value.
    UpdateAction ("action") {
        #[default]
        Replace => "replace",
        InsertBefore => "insertBefore",
        InsertAfter => "insertAfter",
        Remove => "remove",
    }
}

/// Content of an element: plain text, or serialized nested markup such as a
/// GML geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Xml(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn xml(value: impl Into<String>) -> Self {
        Value::Xml(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Xml(_) => None,
        }
    }

    pub fn as_xml(&self) -> Option<&str> {
        match self {
            Value::Xml(xml) => Some(xml),
            Value::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) | Value::Xml(s) => s.is_empty(),
        }
    }
}

/// A title or abstract with its optional `xml:lang`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageString {
    pub value: String,
    pub lang: Option<String>,
}

impl LanguageString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: None,
        }
    }

    pub fn with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: Some(lang.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_parse_case_insensitively() {
        assert_eq!("HITS".parse::<ResultType>().unwrap(), ResultType::Hits);
        assert_eq!("some".parse::<AllSome>().unwrap(), AllSome::Some);
        assert_eq!(
            "insertBefore".parse::<UpdateAction>().unwrap(),
            UpdateAction::InsertBefore
        );
        assert!("sometimes".parse::<ResolveValue>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ResultType::default(), ResultType::Results);
        assert_eq!(ResolveValue::default(), ResolveValue::None);
        assert_eq!(AllSome::default(), AllSome::All);
        assert_eq!(SortOrder::default(), SortOrder::Asc);
        assert_eq!(UpdateAction::default(), UpdateAction::Replace);
    }

    #[test]
    fn test_display_uses_wire_spelling() {
        assert_eq!(ResultType::Results.to_string(), "results");
        assert_eq!(AllSome::All.to_string(), "ALL");
        assert_eq!(SortOrder::Desc.to_string(), "DESC");
    }

    #[test]
    fn test_value_accessors() {
        let value = Value::text("Illinois");
        assert_eq!(value.as_text(), Some("Illinois"));
        assert_eq!(value.as_xml(), None);
        assert!(Value::xml("").is_empty());
    }
}
