mod document;
mod shared;

use proc_macro::TokenStream;

pub(crate) use crate::shared::import_solr_osm;

/// Implements `solr_osm::document::SolrDocument` for a struct with named fields.
///
/// Container attribute: `#[solr(type_name = "...")]`.
/// Field attributes: `#[solr(id)]`, `#[solr(field = "...")]`, `#[solr(nested)]`.
/// `#[serde(rename)]`, `#[serde(rename_all)]` and `#[serde(skip)]` are honored so
/// property names match the serialized form.
#[proc_macro_derive(SolrDocument, attributes(solr))]
pub fn derive_solr_document(input: TokenStream) -> TokenStream {
    document::derive(input)
}
