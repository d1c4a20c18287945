use std::{collections::HashMap, fs, io, path::Path};

use crate::error::Error;

/// Catalog key for a repository method: `Product.findByName`.
pub fn canonical_name(type_name: &str, method_name: &str) -> String {
    format!("{}.{}", type_name, method_name)
}

/// Query templates looked up by canonical method name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedQueries {
    queries: HashMap<String, String>,
}

impl NamedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, query: impl Into<String>) -> Self {
        self.insert(name, query);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, query: impl Into<String>) {
        self.queries.insert(name.into(), query.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Entries of `other` replace same-named ones.
    pub fn merge(&mut self, other: NamedQueries) {
        self.queries.extend(other.queries);
    }

    /// Parses `.properties` text: `key=value` or `key:value` lines, `#`/`!`
    /// comments, trailing `\` continues a line.
    pub fn from_properties(source: &str) -> Self {
        let mut queries = HashMap::new();
        let mut pending = String::new();

        for line in source.lines() {
            let line = line.trim_start();
            if pending.is_empty()
                && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
            {
                continue;
            }

            if let Some(continued) = line.strip_suffix('\\') {
                pending.push_str(continued);
                continue;
            }
            pending.push_str(line);

            let entry = std::mem::take(&mut pending);
            if let Some(pos) = entry.find(['=', ':']) {
                let key = entry[..pos].trim();
                let value = entry[pos + 1..].trim();
                if !key.is_empty() {
                    queries.insert(key.to_string(), value.to_string());
                }
            }
        }

        Self { queries }
    }

    /// Loads a properties file. A missing file yields an empty catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(source) => {
                let queries = Self::from_properties(&source);
                tracing::debug!(
                    path = %path.display(),
                    count = queries.len(),
                    "loaded named queries"
                );
                Ok(queries)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no named queries file");
                Ok(Self::default())
            }
            Err(err) => Err(Error::configuration(format!(
                "cannot read named queries from '{}': {}",
                path.display(),
                err
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_properties() {
        let catalog = NamedQueries::from_properties(
            "# products\n\
             Product.findByNamedQuery=name:?0\n\
             ! other comment\n\
             Product.findByCategory : cat:?0 \\\n  AND inStock:true\n\
             \n",
        );
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("Product.findByNamedQuery"), Some("name:?0"));
        assert_eq!(
            catalog.get("Product.findByCategory"),
            Some("cat:?0 AND inStock:true")
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let catalog = NamedQueries::load("/definitely/not/here.properties").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Product.findByTitle=title:?0").unwrap();
        let catalog = NamedQueries::load(file.path()).unwrap();
        assert!(catalog.has_query(&canonical_name("Product", "findByTitle")));
    }
}
