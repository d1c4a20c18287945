use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{Attribute, Error, Expr, ExprLit, Lit, Meta, Result, punctuated::Punctuated};

pub fn import_solr_osm() -> proc_macro2::TokenStream {
    let found_crate = crate_name("solr_osm").unwrap_or(FoundCrate::Itself);

    match found_crate {
        FoundCrate::Itself => quote! { ::solr_osm },
        FoundCrate::Name(name) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote! { ::#ident }
        }
    }
}

/// Every item inside `#[<name>(...)]` attributes, in order.
pub fn attr_items(attrs: &[Attribute], name: &str) -> Result<Vec<Meta>> {
    let mut items = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident(name) {
            continue;
        }
        if let Meta::List(meta_list) = &attr.meta {
            let nested = meta_list
                .parse_args_with(Punctuated::<Meta, syn::Token![,]>::parse_terminated)
                .map_err(|e| {
                    Error::new_spanned(attr, format!("Failed to parse {} attributes: {}", name, e))
                })?;
            items.extend(nested);
        }
    }
    Ok(items)
}

pub fn lit_str(expr: &Expr, key: &str) -> Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(Error::new_spanned(
            other,
            format!("{} must be a string literal", key),
        )),
    }
}
