use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use once_cell::sync::Lazy;

use crate::{
    document::traits::{DEFAULT_FIELD_NAME, PropertyDescriptor, SolrDocument},
    error::Error,
};

const MAX_NESTING: usize = 8;

static ENTITY_CACHE: Lazy<RwLock<HashMap<TypeId, Arc<EntityMetadata>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub name: String,
    pub field_name: String,
    pub is_id: bool,
    /// Properties of an embedded type, stored as `field.child` in the index.
    pub children: Option<BTreeMap<String, PropertyMetadata>>,
}

impl PropertyMetadata {
    fn from_descriptor(descriptor: &PropertyDescriptor, depth: usize) -> Result<Self, Error> {
        let field_name = match descriptor.field {
            Some(field) if !field.trim().is_empty() && field != DEFAULT_FIELD_NAME => {
                field.to_string()
            }
            _ => descriptor.name.to_string(),
        };

        let children = match descriptor.nested {
            Some(nested) => {
                if depth >= MAX_NESTING {
                    return Err(Error::configuration(format!(
                        "property '{}' nests deeper than {} levels",
                        descriptor.name, MAX_NESTING
                    )));
                }
                Some(build_properties(nested(), depth + 1)?)
            }
            None => None,
        };

        Ok(Self {
            name: descriptor.name.to_string(),
            is_id: descriptor.id || field_name == "id",
            field_name,
            children,
        })
    }
}

fn build_properties(
    descriptors: &[PropertyDescriptor],
    depth: usize,
) -> Result<BTreeMap<String, PropertyMetadata>, Error> {
    let mut properties = BTreeMap::new();
    for descriptor in descriptors {
        let property = PropertyMetadata::from_descriptor(descriptor, depth)?;
        if properties.insert(property.name.clone(), property).is_some() {
            return Err(Error::configuration(format!(
                "property '{}' is declared twice",
                descriptor.name
            )));
        }
    }
    Ok(properties)
}

/// Resolved property path: property names walked and the dotted field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub segments: Vec<String>,
    pub field_name: String,
}

/// Mapping description of one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    type_name: String,
    id_property: PropertyMetadata,
    properties: BTreeMap<String, PropertyMetadata>,
}

impl EntityMetadata {
    /// Cached metadata for `T`, built on first access.
    pub fn of<T: SolrDocument>() -> Result<Arc<EntityMetadata>, Error> {
        let key = TypeId::of::<T>();
        {
            let cache = ENTITY_CACHE.read().unwrap_or_else(|p| p.into_inner());
            if let Some(found) = cache.get(&key) {
                return Ok(found.clone());
            }
        }

        let built = Arc::new(Self::from_descriptors(T::TYPE, T::properties())?);
        tracing::debug!(type_name = T::TYPE, "resolved entity metadata");

        let mut cache = ENTITY_CACHE.write().unwrap_or_else(|p| p.into_inner());
        Ok(cache.entry(key).or_insert(built).clone())
    }

    pub fn from_descriptors(
        type_name: &str,
        descriptors: &[PropertyDescriptor],
    ) -> Result<Self, Error> {
        let properties = build_properties(descriptors, 0)?;

        let explicit: Vec<&PropertyDescriptor> = descriptors.iter().filter(|d| d.id).collect();
        let id_name = match explicit.as_slice() {
            [single] => single.name.to_string(),
            [] => properties
                .values()
                .find(|p| p.field_name == "id")
                .map(|p| p.name.clone())
                .ok_or_else(|| {
                    Error::configuration(format!("no id property found for type '{}'", type_name))
                })?,
            _ => {
                return Err(Error::configuration(format!(
                    "type '{}' marks more than one id property",
                    type_name
                )));
            }
        };

        let id_property = properties
            .get(&id_name)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("unknown id property '{}'", id_name)))?;

        Ok(Self {
            type_name: type_name.to_string(),
            id_property,
            properties,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id_property(&self) -> &PropertyMetadata {
        &self.id_property
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyMetadata> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.get(name)
    }

    /// Resolves a capitalised property reference as found in a method name,
    /// e.g. `Popularity` or `ManufacturerName`.
    pub fn resolve_path(&self, source: &str) -> Result<PropertyPath, Error> {
        let chain = resolve_in(&self.properties, source).ok_or_else(|| {
            Error::invalid_usage(format!(
                "no property '{}' found for type '{}'",
                decapitalize(source),
                self.type_name
            ))
        })?;

        Ok(PropertyPath {
            segments: chain.iter().map(|p| p.name.clone()).collect(),
            field_name: chain
                .iter()
                .map(|p| p.field_name.as_str())
                .collect::<Vec<_>>()
                .join("."),
        })
    }
}

fn lookup<'a>(
    properties: &'a BTreeMap<String, PropertyMetadata>,
    source: &str,
) -> Option<&'a PropertyMetadata> {
    properties
        .get(&decapitalize(source))
        .or_else(|| properties.get(source))
}

fn resolve_in<'a>(
    properties: &'a BTreeMap<String, PropertyMetadata>,
    source: &str,
) -> Option<Vec<&'a PropertyMetadata>> {
    if source.is_empty() {
        return None;
    }

    // explicit traversal
    if let Some((head, tail)) = source.split_once('_') {
        let mut chain = resolve_in(properties, head)?;
        let children = chain.last()?.children.as_ref()?;
        chain.extend(resolve_in(children, tail)?);
        return Some(chain);
    }

    if let Some(property) = lookup(properties, source) {
        return Some(vec![property]);
    }

    // longest head first
    let boundaries: Vec<usize> = source
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .collect();

    for &split in boundaries.iter().rev() {
        let (head, tail) = source.split_at(split);
        let Some(property) = lookup(properties, head) else {
            continue;
        };
        let Some(children) = property.children.as_ref() else {
            continue;
        };
        if let Some(rest) = resolve_in(children, tail) {
            let mut chain = vec![property];
            chain.extend(rest);
            return Some(chain);
        }
    }

    None
}

/// `Name` -> `name`, but `URL` stays `URL`.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            name.to_string()
        }
        (Some(first), _) => {
            let mut out: String = first.to_lowercase().collect();
            out.push_str(&name[first.len_utf8()..]);
            out
        }
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    fn manufacturer_properties() -> &'static [PropertyDescriptor] {
        const PROPERTIES: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("name"),
            PropertyDescriptor::new("country").field("country_s"),
        ];
        PROPERTIES
    }

    const PRODUCT: &[PropertyDescriptor] = &[
        PropertyDescriptor::new("id"),
        PropertyDescriptor::new("name"),
        PropertyDescriptor::new("available").field("inStock"),
        PropertyDescriptor::new("popularity").field(DEFAULT_FIELD_NAME),
        PropertyDescriptor::new("manufacturer").nested(manufacturer_properties),
        PropertyDescriptor::new("manufacturerName"),
    ];

    #[test]
    fn field_names_fall_back_to_property_names() {
        let meta = EntityMetadata::from_descriptors("Product", PRODUCT).unwrap();
        assert_eq!(meta.property("available").unwrap().field_name, "inStock");
        assert_eq!(meta.property("popularity").unwrap().field_name, "popularity");
        assert_eq!(meta.id_property().name, "id");
        assert!(meta.id_property().is_id);
    }

    #[test]
    fn explicit_id_wins_over_convention() {
        const DESCRIPTORS: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("id"),
            PropertyDescriptor::new("sku").id(),
        ];
        let meta = EntityMetadata::from_descriptors("Item", DESCRIPTORS).unwrap();
        assert_eq!(meta.id_property().name, "sku");
        assert!(meta.property("id").unwrap().is_id);
    }

    #[test]
    fn mapped_id_field_is_the_id() {
        const DESCRIPTORS: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("isbn").field("id"),
            PropertyDescriptor::new("title"),
        ];
        let meta = EntityMetadata::from_descriptors("Book", DESCRIPTORS).unwrap();
        assert_eq!(meta.id_property().name, "isbn");
    }

    #[test]
    fn missing_or_ambiguous_id_fails() {
        const NO_ID: &[PropertyDescriptor] = &[PropertyDescriptor::new("title")];
        assert!(
            EntityMetadata::from_descriptors("Book", NO_ID)
                .unwrap_err()
                .is_configuration()
        );

        const TWO_IDS: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("a").id(),
            PropertyDescriptor::new("b").id(),
        ];
        assert!(
            EntityMetadata::from_descriptors("Book", TWO_IDS)
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn resolves_paths() {
        let meta = EntityMetadata::from_descriptors("Product", PRODUCT).unwrap();
        assert_eq!(meta.resolve_path("Available").unwrap().field_name, "inStock");
        // a flat property beats the nested split
        assert_eq!(
            meta.resolve_path("ManufacturerName").unwrap().field_name,
            "manufacturerName"
        );
        assert_eq!(
            meta.resolve_path("ManufacturerCountry").unwrap().field_name,
            "manufacturer.country_s"
        );
        assert_eq!(
            meta.resolve_path("Manufacturer_Name").unwrap().field_name,
            "manufacturer.name"
        );
        assert!(meta.resolve_path("Color").unwrap_err().is_invalid_usage());
    }

    #[test]
    fn decapitalize_keeps_acronyms() {
        assert_eq!(decapitalize("Price"), "price");
        assert_eq!(decapitalize("URL"), "URL");
        assert_eq!(decapitalize("x"), "x");
    }

    #[derive(Serialize, Deserialize)]
    struct Cached {
        id: String,
    }

    impl SolrDocument for Cached {
        const TYPE: &'static str = "Cached";

        fn properties() -> &'static [PropertyDescriptor] {
            const PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new("id")];
            PROPERTIES
        }
    }

    #[test]
    fn cache_returns_the_same_instance() {
        let first = EntityMetadata::of::<Cached>().unwrap();
        let second = EntityMetadata::of::<Cached>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            *first,
            EntityMetadata::from_descriptors("Cached", Cached::properties()).unwrap()
        );
    }

    #[test]
    fn concurrent_first_access_converges() {
        #[derive(Serialize, Deserialize)]
        struct Raced {
            id: String,
        }

        impl SolrDocument for Raced {
            const TYPE: &'static str = "Raced";

            fn properties() -> &'static [PropertyDescriptor] {
                const PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new("id")];
                PROPERTIES
            }
        }

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| EntityMetadata::of::<Raced>().unwrap()))
            .collect();
        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for meta in &resolved[1..] {
            assert!(Arc::ptr_eq(meta, &resolved[0]));
        }
    }
}
