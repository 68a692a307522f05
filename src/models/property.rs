//! Raw property values

use serde::{Deserialize, Serialize};

use super::identity::NodeId;

/// A named property value as stored, before coercion
///
/// `context_type_alias` and `context_id` identify the node the value was
/// actually read from, which differs from the asking node when the value was
/// found by a recursive (inherited) lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    pub alias: String,
    pub raw_value: Option<String>,
    pub context_type_alias: String,
    pub context_id: NodeId,
}

impl PropertyValue {
    pub fn new(
        alias: impl Into<String>,
        raw_value: Option<String>,
        context_type_alias: impl Into<String>,
        context_id: NodeId,
    ) -> Self {
        Self {
            alias: alias.into(),
            raw_value,
            context_type_alias: context_type_alias.into(),
            context_id,
        }
    }

    /// True when no raw value exists at all
    pub fn is_null(&self) -> bool {
        self.raw_value.is_none()
    }

    /// True when the raw value is non-blank after trimming
    pub fn has_value(&self) -> bool {
        self.raw_value
            .as_deref()
            .is_some_and(|raw| !raw.trim().is_empty())
    }

    /// Raw text, empty when null
    pub fn value(&self) -> &str {
        self.raw_value.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_and_has_value() {
        let null = PropertyValue::new("title", None, "page", NodeId(1));
        assert!(null.is_null());
        assert!(!null.has_value());

        let blank = PropertyValue::new("title", Some("   ".into()), "page", NodeId(1));
        assert!(!blank.is_null());
        assert!(!blank.has_value());

        let set = PropertyValue::new("title", Some(" Hi ".into()), "page", NodeId(1));
        assert!(set.has_value());
        assert_eq!(set.value(), " Hi ");
    }
}
