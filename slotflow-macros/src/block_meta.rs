use darling::{FromAttributes, FromField};
use syn::{DeriveInput, Fields};

/// Parsed attributes from #[block_meta(...)]
#[derive(Debug, FromAttributes)]
#[darling(attributes(block_meta))]
pub struct BlockMetaArgs {
    pub path: String,
    pub name: String,
    pub category: String,

    /// Whitespace separated search keywords
    #[darling(default)]
    pub keywords: Option<String>,

    /// Comma separated signal names
    #[darling(default)]
    pub signals: Option<String>,
}

/// Parsed attributes from #[param(...)]
#[derive(Debug, FromField)]
#[darling(attributes(param))]
pub struct ParamField {
    pub ident: Option<syn::Ident>,
    pub ty: syn::Type,

    /// Public parameter name, defaults to the field name
    #[darling(default)]
    pub name: Option<String>,

    /// JSON text of the default value
    #[darling(default)]
    pub default: Option<String>,

    /// Slot that applies the parameter
    #[darling(default)]
    pub setter: Option<String>,
}

/// Parsed attributes from #[factory_arg(...)]
#[derive(Debug, FromField)]
#[darling(attributes(factory_arg))]
pub struct FactoryArgField {
    pub ident: Option<syn::Ident>,
    pub ty: syn::Type,

    #[darling(default)]
    pub name: Option<String>,

    #[darling(default)]
    pub default: Option<String>,
}

pub fn parse_block_info(input: &DeriveInput) -> darling::Result<BlockMetaArgs> {
    BlockMetaArgs::from_attributes(&input.attrs)
}

fn named_fields(input: &DeriveInput) -> Vec<&syn::Field> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn has_attr(field: &syn::Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(name))
}

pub fn parse_params(input: &DeriveInput) -> darling::Result<Vec<ParamField>> {
    named_fields(input)
        .into_iter()
        .filter(|f| has_attr(f, "param"))
        .map(ParamField::from_field)
        .collect()
}

pub fn parse_factory_args(input: &DeriveInput) -> darling::Result<Vec<FactoryArgField>> {
    named_fields(input)
        .into_iter()
        .filter(|f| has_attr(f, "factory_arg"))
        .map(FactoryArgField::from_field)
        .collect()
}
