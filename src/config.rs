//! Runtime settings for the template and repositories.
//!
//! ```
//! use solr_osm::SolrConfig;
//!
//! let config = SolrConfig::default();
//! assert_eq!(config.default_page_size, 10);
//! assert!(config.commit_on_write);
//! ```

use std::{env, path::PathBuf};

use serde::Deserialize;

use crate::error::Error;

pub const ENV_DEFAULT_PAGE_SIZE: &str = "SOLR_OSM_DEFAULT_PAGE_SIZE";
pub const ENV_COMMIT_ON_WRITE: &str = "SOLR_OSM_COMMIT_ON_WRITE";
pub const ENV_NAMED_QUERIES: &str = "SOLR_OSM_NAMED_QUERIES";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolrConfig {
    /// Page size used when a paged method is invoked without a page.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Issue a commit after every repository write.
    #[serde(default = "default_commit_on_write")]
    pub commit_on_write: bool,

    /// `.properties` file holding named queries.
    #[serde(default)]
    pub named_queries_location: Option<PathBuf>,
}

fn default_page_size() -> u32 {
    10
}

fn default_commit_on_write() -> bool {
    true
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            commit_on_write: default_commit_on_write(),
            named_queries_location: None,
        }
    }
}

impl SolrConfig {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let config: SolrConfig =
            serde_json::from_str(raw).map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()
    }

    /// Reads `SOLR_OSM_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = SolrConfig::default();

        if let Ok(raw) = env::var(ENV_DEFAULT_PAGE_SIZE) {
            config.default_page_size = raw.trim().parse().map_err(|_| {
                Error::configuration(format!(
                    "{ENV_DEFAULT_PAGE_SIZE} must be a number, got '{raw}'"
                ))
            })?;
        }

        if let Ok(raw) = env::var(ENV_COMMIT_ON_WRITE) {
            config.commit_on_write = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(Error::configuration(format!(
                        "{ENV_COMMIT_ON_WRITE} must be a boolean, got '{raw}'"
                    )));
                }
            };
        }

        if let Ok(raw) = env::var(ENV_NAMED_QUERIES) {
            if !raw.trim().is_empty() {
                config.named_queries_location = Some(PathBuf::from(raw));
            }
        }

        config.validate()
    }

    fn validate(self) -> Result<Self, Error> {
        if self.default_page_size == 0 {
            return Err(Error::configuration("default_page_size must be positive"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_defaults_for_missing_keys() {
        let config = SolrConfig::from_json(r#"{ "commit_on_write": false }"#).unwrap();
        assert_eq!(config.default_page_size, 10);
        assert!(!config.commit_on_write);
        assert!(config.named_queries_location.is_none());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = SolrConfig::from_json(r#"{ "default_page_size": 0 }"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn json_with_location() {
        let config = SolrConfig::from_json(
            r#"{ "default_page_size": 25, "named_queries_location": "queries.properties" }"#,
        )
        .unwrap();
        assert_eq!(config.default_page_size, 25);
        assert_eq!(
            config.named_queries_location,
            Some(PathBuf::from("queries.properties"))
        );
    }
}
