pub mod meta;
pub mod traits;

pub use meta::{EntityMetadata, PropertyMetadata, PropertyPath, decapitalize};
pub use traits::{DEFAULT_FIELD_NAME, PropertyDescriptor, SolrDocument};
