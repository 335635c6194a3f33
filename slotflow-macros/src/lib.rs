use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod block_meta;
use block_meta::{parse_block_info, parse_factory_args, parse_params};

#[proc_macro_derive(BlockNode, attributes(block_meta, param, factory_arg))]
pub fn derive_block_node(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let block_info = match parse_block_info(&input) {
        Ok(info) => info,
        Err(e) => return e.write_errors().into(),
    };
    let params = match parse_params(&input) {
        Ok(params) => params,
        Err(e) => return e.write_errors().into(),
    };
    let factory_args = match parse_factory_args(&input) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };

    let struct_name = &input.ident;
    let path = &block_info.path;
    let block_name = &block_info.name;
    let category = &block_info.category;

    let keywords: Vec<String> = block_info
        .keywords
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let signals: Vec<String> = block_info
        .signals
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut param_schemas = Vec::new();
    for f in &params {
        let Some(ident) = f.ident.as_ref() else { continue };
        let name = f.name.clone().unwrap_or_else(|| ident.to_string());
        let type_name = extract_type_name(&f.ty);
        let default = match default_tokens(ident, f.default.as_deref()) {
            Ok(tokens) => tokens,
            Err(e) => return e.to_compile_error().into(),
        };
        let setter = match &f.setter {
            Some(setter) => quote! { Some(#setter.to_string()) },
            None => quote! { None },
        };

        param_schemas.push(quote! {
            crate::registry::ParameterSchema {
                name: #name.to_string(),
                param_type: #type_name.to_string(),
                default: #default,
                setter: #setter,
            }
        });
    }

    let mut factory_arg_schemas = Vec::new();
    for f in &factory_args {
        let Some(ident) = f.ident.as_ref() else { continue };
        let name = f.name.clone().unwrap_or_else(|| ident.to_string());
        let type_name = extract_type_name(&f.ty);
        let default = match default_tokens(ident, f.default.as_deref()) {
            Ok(tokens) => tokens,
            Err(e) => return e.to_compile_error().into(),
        };

        factory_arg_schemas.push(quote! {
            crate::registry::ParameterSchema {
                name: #name.to_string(),
                param_type: #type_name.to_string(),
                default: #default,
                setter: None,
            }
        });
    }

    let mod_name = syn::Ident::new(
        &format!("__block_registration_{}", struct_name.to_string().to_lowercase()),
        struct_name.span(),
    );

    let factory_fn_name = syn::Ident::new(
        &format!("create_metadata_{}", struct_name.to_string().to_lowercase()),
        struct_name.span(),
    );

    let expanded = quote! {
        impl crate::registry::DescribeBlock for #struct_name {
            fn metadata() -> crate::registry::BlockMetadata {
                crate::registry::BlockMetadata {
                    path: #path.to_string(),
                    name: #block_name.to_string(),
                    category: #category.to_string(),
                    keywords: vec![#(#keywords.to_string()),*],
                    signals: vec![#(#signals.to_string()),*],
                    factory_args: vec![#(#factory_arg_schemas),*],
                    parameters: vec![#(#param_schemas),*],
                    factory: |args: &[crate::core::Value]| {
                        let block: Box<dyn crate::core::Block> = Box::new(
                            <#struct_name as crate::core::BlockFactory>::create(args)?,
                        );
                        Ok(block)
                    },
                }
            }
        }

        mod #mod_name {
            use super::*;

            fn #factory_fn_name() -> crate::registry::BlockMetadata {
                <#struct_name as crate::registry::DescribeBlock>::metadata()
            }

            ::inventory::submit! {
                crate::registry::BlockMetadataFactoryWrapper(#factory_fn_name)
            }
        }
    };

    TokenStream::from(expanded)
}

/// Parse a `default = "..."` JSON text at expansion time and emit the
/// expression that rebuilds it. Malformed JSON is a compile error on the field.
fn default_tokens(field: &syn::Ident, text: Option<&str>) -> syn::Result<TokenStream2> {
    let Some(text) = text else {
        return Ok(quote! { ::serde_json::Value::Null });
    };
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        syn::Error::new(field.span(), format!("invalid JSON in default for `{}`: {}", field, e))
    })?;
    Ok(json_tokens(&value))
}

fn json_tokens(value: &serde_json::Value) -> TokenStream2 {
    use serde_json::Value;

    match value {
        Value::Null => quote! { ::serde_json::Value::Null },
        Value::Bool(b) => quote! { ::serde_json::Value::Bool(#b) },
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                quote! { ::serde_json::Value::from(#i) }
            } else if let Some(u) = n.as_u64() {
                quote! { ::serde_json::Value::from(#u) }
            } else {
                let f = n.as_f64().unwrap_or_default();
                quote! { ::serde_json::Value::from(#f) }
            }
        }
        Value::String(s) => quote! { ::serde_json::Value::String(#s.to_string()) },
        Value::Array(items) => {
            let items = items.iter().map(json_tokens);
            quote! { ::serde_json::Value::Array(vec![#(#items),*]) }
        }
        Value::Object(entries) => {
            let keys = entries.keys();
            let values = entries.values().map(json_tokens);
            quote! {
                ::serde_json::Value::Object({
                    let mut map = ::serde_json::Map::new();
                    #(map.insert(#keys.to_string(), #values);)*
                    map
                })
            }
        }
    }
}

fn extract_type_name(ty: &syn::Type) -> &'static str {
    let type_str = quote!(#ty).to_string();

    // Containers first: `Vec<String>` also mentions `String`
    if type_str.contains("Vec") {
        "list"
    } else if type_str.contains("Map") {
        "dict"
    } else if type_str.contains("f64") || type_str.contains("f32") {
        "number"
    } else if type_str.contains("u32") || type_str.contains("i32")
        || type_str.contains("u64") || type_str.contains("i64")
        || type_str.contains("usize") || type_str.contains("isize") {
        "number"
    } else if type_str.contains("String") || type_str.contains("str") {
        "string"
    } else if type_str.contains("bool") {
        "boolean"
    } else {
        "unknown"
    }
}
