use syn::{Attribute, Error, Field, GenericArgument, Meta, PathArguments, Result, Type};

use crate::shared::{attr_items, lit_str};

/// serde `rename_all` rules, applied to snake_case field idents.
#[derive(Debug, Clone, Copy)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
}

impl RenameRule {
    fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            _ => return None,
        })
    }

    pub fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::Pascal => field
                .split('_')
                .map(|part| {
                    let mut chars = part.chars();
                    match chars.next() {
                        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect(),
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentConfig {
    pub type_name: Option<String>,
    pub rename_all: Option<RenameRule>,
}

impl DocumentConfig {
    pub fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
        let mut config = DocumentConfig::default();

        for meta in attr_items(attrs, "solr")? {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("type_name") => {
                    config.type_name = Some(lit_str(&nv.value, "type_name")?);
                }
                other => {
                    return Err(Error::new_spanned(other, "unknown solr container attribute"));
                }
            }
        }

        for meta in attr_items(attrs, "serde")? {
            if let Meta::NameValue(nv) = meta {
                if nv.path.is_ident("rename_all") {
                    let value = lit_str(&nv.value, "rename_all")?;
                    config.rename_all = Some(RenameRule::parse(&value).ok_or_else(|| {
                        Error::new_spanned(
                            &nv.value,
                            format!("unsupported rename_all rule '{}'", value),
                        )
                    })?);
                }
            }
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub struct PropertyConfig {
    pub name: String,
    pub field: Option<String>,
    pub id: bool,
    pub nested: Option<Type>,
}

impl PropertyConfig {
    /// `None` when serde skips the field.
    pub fn from_field(field: &Field, rename_all: Option<RenameRule>) -> Result<Option<Self>> {
        let Some(ident) = &field.ident else {
            return Err(Error::new_spanned(field, "SolrDocument fields must be named"));
        };

        let ident = ident.to_string();
        let ident = ident.strip_prefix("r#").unwrap_or(&ident);
        let mut name = match rename_all {
            Some(rule) => rule.apply(ident),
            None => ident.to_string(),
        };

        for meta in attr_items(&field.attrs, "serde")? {
            match meta {
                Meta::Path(path) if path.is_ident("skip") || path.is_ident("skip_serializing") => {
                    return Ok(None);
                }
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    name = lit_str(&nv.value, "rename")?;
                }
                _ => {}
            }
        }

        let mut config = PropertyConfig {
            name,
            field: None,
            id: false,
            nested: None,
        };

        for meta in attr_items(&field.attrs, "solr")? {
            match meta {
                Meta::Path(path) if path.is_ident("id") => config.id = true,
                Meta::Path(path) if path.is_ident("nested") => {
                    config.nested = Some(nested_type(&field.ty).clone());
                }
                Meta::NameValue(nv) if nv.path.is_ident("field") => {
                    let value = lit_str(&nv.value, "field")?;
                    if value.trim().is_empty() {
                        return Err(Error::new_spanned(&nv.value, "field name must not be empty"));
                    }
                    config.field = Some(value);
                }
                other => {
                    return Err(Error::new_spanned(other, "unknown solr field attribute"));
                }
            }
        }

        Ok(Some(config))
    }
}

/// `Option<T>` and `Vec<T>` map to `T`; anything else to itself.
fn nested_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" || segment.ident == "Vec" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}
