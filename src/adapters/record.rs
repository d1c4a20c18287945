use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    document::{EntityMetadata, PropertyMetadata, SolrDocument},
    error::Error,
};
use std::collections::BTreeMap;

/// A document as the index sees it: Solr field names mapped to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRecord {
    fields: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// String form of the value stored under `field`.
    pub fn value_string(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    pub fn from_document<T: SolrDocument>(doc: &T) -> Result<Self, Error> {
        let meta = EntityMetadata::of::<T>()?;
        Self::from_document_with(doc, &meta)
    }

    pub fn from_document_with<T: SolrDocument>(
        doc: &T,
        meta: &EntityMetadata,
    ) -> Result<Self, Error> {
        let value = serde_json::to_value(doc).map_err(|e| Error::Serialize(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(Error::Serialize(format!(
                "type '{}' does not serialize to an object",
                T::TYPE
            )));
        };

        let mut fields = Map::new();
        flatten("", meta.properties(), object, &mut fields);
        Ok(Self { fields })
    }

    pub fn to_document<T: SolrDocument>(self) -> Result<T, Error> {
        let meta = EntityMetadata::of::<T>()?;
        self.to_document_with(&meta)
    }

    pub fn to_document_with<T: SolrDocument>(self, meta: &EntityMetadata) -> Result<T, Error> {
        let object = unflatten("", meta.properties(), &self.fields);
        serde_json::from_value(Value::Object(object)).map_err(|e| Error::Deserialize(e.to_string()))
    }
}

fn flatten(
    prefix: &str,
    properties: &BTreeMap<String, PropertyMetadata>,
    object: Map<String, Value>,
    out: &mut Map<String, Value>,
) {
    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let Some(property) = properties.get(&key) else {
            out.insert(format!("{}{}", prefix, key), value);
            continue;
        };
        let name = format!("{}{}", prefix, property.field_name);
        match (&property.children, value) {
            (Some(children), Value::Object(nested)) => {
                flatten(&format!("{}.", name), children, nested, out);
            }
            (_, value) => {
                out.insert(name, value);
            }
        }
    }
}

fn unflatten(
    prefix: &str,
    properties: &BTreeMap<String, PropertyMetadata>,
    fields: &Map<String, Value>,
) -> Map<String, Value> {
    let mut object = Map::new();
    for property in properties.values() {
        let name = format!("{}{}", prefix, property.field_name);
        if let Some(value) = fields.get(&name) {
            object.insert(property.name.clone(), value.clone());
            continue;
        }
        if let Some(children) = &property.children {
            let nested = unflatten(&format!("{}.", name), children, fields);
            if !nested.is_empty() {
                object.insert(property.name.clone(), Value::Object(nested));
            }
        }
    }
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PropertyDescriptor;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Maker {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Gadget {
        id: String,
        available: bool,
        maker: Option<Maker>,
        note: Option<String>,
    }

    fn maker_properties() -> &'static [PropertyDescriptor] {
        const PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new("name")];
        PROPERTIES
    }

    impl SolrDocument for Gadget {
        const TYPE: &'static str = "Gadget";

        fn properties() -> &'static [PropertyDescriptor] {
            const PROPERTIES: &[PropertyDescriptor] = &[
                PropertyDescriptor::new("id"),
                PropertyDescriptor::new("available").field("inStock"),
                PropertyDescriptor::new("maker").field("mk").nested(maker_properties),
                PropertyDescriptor::new("note"),
            ];
            PROPERTIES
        }
    }

    #[test]
    fn renames_and_flattens() {
        let gadget = Gadget {
            id: "g1".to_string(),
            available: true,
            maker: Some(Maker {
                name: "acme".to_string(),
            }),
            note: None,
        };

        let record = DocumentRecord::from_document(&gadget).unwrap();
        assert_eq!(record.get("inStock"), Some(&json!(true)));
        assert_eq!(record.get("mk.name"), Some(&json!("acme")));
        assert!(record.get("note").is_none());
        assert_eq!(record.value_string("id").as_deref(), Some("g1"));

        let back: Gadget = record.to_document().unwrap();
        assert_eq!(back, gadget);
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let record = DocumentRecord::new()
            .with("id", "g2")
            .with("inStock", false)
            .with("score", 1.5)
            .with("_version_", 12345);
        let gadget: Gadget = record.to_document().unwrap();
        assert_eq!(gadget.id, "g2");
        assert!(!gadget.available);
        assert!(gadget.maker.is_none());
    }

    #[test]
    fn missing_required_field_fails() {
        let record = DocumentRecord::new().with("inStock", true);
        let err = record.to_document::<Gadget>().unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }
}
