//! Configuration for the query engine

use serde::{Deserialize, Serialize};

/// Configuration shared by coercion, property lookup and expression binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryConfig {
    /// Decimal separator of the active locale; text containing it is tried as a decimal
    pub decimal_separator: char,

    /// XML root element names that stay plain strings instead of becoming Xml values
    /// (keeps valid XHTML from a rich text editor as markup)
    pub not_dynamic_xml_elements: Vec<String>,

    /// Property alias that hides a node from navigation when set to "1"
    pub navi_hide_alias: String,

    /// Synthetic property alias carrying the relevance score of search results
    pub search_score_alias: String,

    /// chrono patterns tried, in order, when parsing date editor values
    pub date_formats: Vec<String>,

    /// Use the process-wide (node id, alias) property cache
    pub use_property_cache: bool,

    /// Reject identifiers that are neither built-in members nor known aliases
    pub strict_identifiers: bool,

    /// Default wildcard behaviour for node searches
    pub use_wildcards: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            not_dynamic_xml_elements: ["p", "div", "ul", "span"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            navi_hide_alias: "umbracoNaviHide".to_string(),
            search_score_alias: "searchScore".to_string(),
            date_formats: vec![
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
                "%d/%m/%Y %H:%M:%S".to_string(),
            ],
            use_property_cache: false,
            strict_identifiers: false,
            use_wildcards: true,
        }
    }
}

impl QueryConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    /// Load configuration from YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load configuration from TOML; missing keys keep their defaults
    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// True when `element` is listed in `not_dynamic_xml_elements`
    pub fn is_disallowed_xml_root(&self, element: &str) -> bool {
        self.not_dynamic_xml_elements
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(element))
    }
}

/// Builder for QueryConfig
#[derive(Debug, Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn decimal_separator(mut self, separator: char) -> Self {
        self.config.decimal_separator = separator;
        self
    }

    pub fn not_dynamic_xml_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.not_dynamic_xml_elements = elements.into_iter().map(Into::into).collect();
        self
    }

    pub fn navi_hide_alias(mut self, alias: impl Into<String>) -> Self {
        self.config.navi_hide_alias = alias.into();
        self
    }

    pub fn search_score_alias(mut self, alias: impl Into<String>) -> Self {
        self.config.search_score_alias = alias.into();
        self
    }

    /// Add a date pattern ahead of the defaults
    pub fn date_format(mut self, pattern: impl Into<String>) -> Self {
        self.config.date_formats.insert(0, pattern.into());
        self
    }

    pub fn use_property_cache(mut self, enabled: bool) -> Self {
        self.config.use_property_cache = enabled;
        self
    }

    pub fn strict_identifiers(mut self, strict: bool) -> Self {
        self.config.strict_identifiers = strict;
        self
    }

    pub fn use_wildcards(mut self, enabled: bool) -> Self {
        self.config.use_wildcards = enabled;
        self
    }

    pub fn build(self) -> QueryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert_eq!(config.decimal_separator, '.');
        assert!(config.is_disallowed_xml_root("P"));
        assert!(!config.is_disallowed_xml_root("links"));
        assert_eq!(config.navi_hide_alias, "umbracoNaviHide");
    }

    #[test]
    fn test_builder() {
        let config = QueryConfig::builder()
            .decimal_separator(',')
            .not_dynamic_xml_elements(["table"])
            .strict_identifiers(true)
            .date_format("%d.%m.%Y")
            .build();
        assert_eq!(config.decimal_separator, ',');
        assert!(config.is_disallowed_xml_root("table"));
        assert!(!config.is_disallowed_xml_root("p"));
        assert!(config.strict_identifiers);
        assert_eq!(config.date_formats[0], "%d.%m.%Y");
    }

    #[test]
    fn test_from_yaml_keeps_defaults() {
        let config = QueryConfig::from_yaml_str("decimalSeparator: ','\nusePropertyCache: true\n")
            .unwrap();
        assert_eq!(config.decimal_separator, ',');
        assert!(config.use_property_cache);
        assert_eq!(config.search_score_alias, "searchScore");
    }
}
