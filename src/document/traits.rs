use serde::{Serialize, de::DeserializeOwned};

/// Field value meaning "use the property name".
pub const DEFAULT_FIELD_NAME: &str = "#default";

/// Static mapping entry for one property of a [`SolrDocument`].
///
/// `name` is the property's serialized name, `field` the Solr field it is
/// stored under when that differs.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub field: Option<&'static str>,
    pub id: bool,
    pub nested: Option<fn() -> &'static [PropertyDescriptor]>,
}

impl PropertyDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            field: None,
            id: false,
            nested: None,
        }
    }

    pub const fn field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub const fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub const fn nested(mut self, properties: fn() -> &'static [PropertyDescriptor]) -> Self {
        self.nested = Some(properties);
        self
    }
}

/// A type stored as a Solr document.
///
/// Usually derived with `#[derive(SolrDocument)]`; a hand-written impl only
/// has to list its properties:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use solr_osm::document::{PropertyDescriptor, SolrDocument};
///
/// #[derive(Serialize, Deserialize)]
/// struct Book {
///     isbn: String,
///     title: String,
/// }
///
/// impl SolrDocument for Book {
///     const TYPE: &'static str = "Book";
///
///     fn properties() -> &'static [PropertyDescriptor] {
///         const PROPERTIES: &[PropertyDescriptor] = &[
///             PropertyDescriptor::new("isbn").field("id"),
///             PropertyDescriptor::new("title"),
///         ];
///         PROPERTIES
///     }
/// }
/// ```
pub trait SolrDocument: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    fn properties() -> &'static [PropertyDescriptor];
}
