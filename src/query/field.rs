use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Name of the field that matches every field; never rendered with a qualifier.
pub const WILDCARD: &str = "*";

/// Reference to a named field in the Solr index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::configuration("field name must not be empty"));
        }
        Ok(Self { name })
    }

    pub fn wildcard() -> Self {
        Self {
            name: WILDCARD.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<&str> for Field {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Field::new(value)
    }
}

impl TryFrom<String> for Field {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Field::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn rejects_empty_names() {
        assert!(Field::new("").unwrap_err().is_configuration());
        assert!(Field::new("   ").unwrap_err().is_configuration());
    }

    #[test]
    fn equality_is_by_name() {
        let mut facets = BTreeMap::new();
        facets.insert(Field::new("cat").unwrap(), 1);
        facets.insert(Field::new("cat").unwrap(), 2);
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[&Field::new("cat").unwrap()], 2);
        assert!(Field::wildcard().is_wildcard());
    }
}
