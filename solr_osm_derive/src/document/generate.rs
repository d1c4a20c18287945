use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Result};

use crate::import_solr_osm;

use super::parse::{DocumentConfig, PropertyConfig};

pub fn generate_document_impl(input: &DeriveInput) -> Result<TokenStream> {
    let solr = import_solr_osm();
    let config = DocumentConfig::from_attributes(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(Error::new_spanned(
                    input,
                    "SolrDocument only supports structs with named fields",
                ));
            }
        },
        _ => return Err(Error::new_spanned(input, "SolrDocument only supports structs")),
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    let mut id_seen = false;

    for field in fields {
        let Some(property) = PropertyConfig::from_field(field, config.rename_all)? else {
            continue;
        };

        if property.id {
            if id_seen {
                return Err(Error::new_spanned(
                    field,
                    "only one field may be marked #[solr(id)]",
                ));
            }
            id_seen = true;
        }

        let name = &property.name;
        let mut descriptor = quote! { #solr::document::PropertyDescriptor::new(#name) };
        if let Some(field_name) = &property.field {
            descriptor = quote! { #descriptor.field(#field_name) };
        }
        if property.id {
            descriptor = quote! { #descriptor.id() };
        }
        if let Some(ty) = &property.nested {
            descriptor = quote! {
                #descriptor.nested(<#ty as #solr::document::SolrDocument>::properties)
            };
        }
        descriptors.push(descriptor);
    }

    let ident = &input.ident;
    let type_name = config.type_name.unwrap_or_else(|| ident.to_string());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #solr::document::SolrDocument for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_name;

            fn properties() -> &'static [#solr::document::PropertyDescriptor] {
                const PROPERTIES: &[#solr::document::PropertyDescriptor] = &[
                    #(#descriptors),*
                ];
                PROPERTIES
            }
        }
    })
}
