use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Lit, parse_macro_input};

/// Parsed `#[column(...)]` attributes of one field
#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    skip: bool,
    auto_generated: bool,
    key: bool,
    write_only: bool,
    param_type: Option<proc_macro2::TokenStream>,
}

/// Map a `param_type = "..."` name to its `ParamType` variant
fn param_type_tokens(name: &str) -> Option<proc_macro2::TokenStream> {
    let variant = match name {
        "text" => quote!(Text),
        "integer" => quote!(Integer),
        "bigint" => quote!(BigInt),
        "double" => quote!(Double),
        "boolean" => quote!(Boolean),
        "datetime" => quote!(Timestamp),
        "bytes" => quote!(Bytes),
        "text[]" => quote!(TextArray),
        "json" => quote!(Json),
        _ => return None,
    };
    Some(quote!(dao_columns::ParamType::#variant))
}

/// Parse every #[column(...)] attribute on a field
fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("auto_generated") {
                attrs.auto_generated = true;
            } else if meta.path.is_ident("key") {
                attrs.key = true;
            } else if meta.path.is_ident("write_only") {
                attrs.write_only = true;
            } else if meta.path.is_ident("name") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: Lit = meta.input.parse()?;
                match lit {
                    Lit::Str(s) => attrs.name = Some(s.value()),
                    other => return Err(syn::Error::new_spanned(other, "expected string literal")),
                }
            } else if meta.path.is_ident("param_type") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: Lit = meta.input.parse()?;
                match lit {
                    Lit::Str(s) => match param_type_tokens(&s.value()) {
                        Some(tokens) => attrs.param_type = Some(tokens),
                        None => {
                            return Err(syn::Error::new_spanned(
                                s,
                                "unknown param_type; expected one of text, integer, bigint, \
                                 double, boolean, datetime, bytes, text[], json",
                            ));
                        }
                    },
                    other => return Err(syn::Error::new_spanned(other, "expected string literal")),
                }
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}

/// Parse #[columns(table = "...")] attribute and return table name
fn parse_columns_attr(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("columns") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    meta.input.parse::<syn::Token![=]>()?;
                    let lit: Lit = meta.input.parse()?;
                    if let Lit::Str(s) = lit {
                        table_name = Some(s.value());
                    }
                    Ok(())
                } else {
                    Err(meta.error("unknown columns attribute"))
                }
            })?;
            return match table_name {
                Some(table) if !table.trim().is_empty() => Ok(table),
                _ => Err(syn::Error::new_spanned(
                    attr,
                    "#[columns(table = \"...\")] needs a non-empty table name",
                )),
            };
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "Columns requires #[columns(table = \"...\")]",
    ))
}

/// Derive macro generating a `dao_columns::Mapped` implementation.
///
/// Every named field becomes a column, in declaration order, read through a
/// cloning getter and written back through a setter.
///
/// ## Struct attribute
///
/// - `#[columns(table = "...")]` (required) - the table the bean maps to
///
/// ## Field attributes
///
/// - `#[column(name = "...")]` - column name (defaults to the field name)
/// - `#[column(skip)]` - not a column
/// - `#[column(auto_generated)]` - supplied by the database, excluded from INSERT
/// - `#[column(key)]` - part of the key used by UPDATE/DELETE/fetch-by-key
/// - `#[column(write_only)]` - never populated from result rows
/// - `#[column(param_type = "...")]` - override the parameter type
///
/// Field types must implement `dao_columns::ColumnValue`. Blank and duplicate
/// column names are rejected at compile time; type compatibility is checked
/// when the mapping is first built.
///
/// ## Example
///
/// ```text
/// #[derive(Columns, Default)]
/// #[columns(table = "users")]
/// pub struct User {
///     #[column(key, auto_generated)]
///     pub id: i64,
///     #[column(name = "full_name")]
///     pub name: String,
///     #[column(skip)]
///     pub session: Option<String>,
/// }
/// ```
#[proc_macro_derive(Columns, attributes(columns, column))]
pub fn derive_columns(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Columns does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Columns only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Columns only supports structs",
            ));
        }
    };

    let table_name = parse_columns_attr(input)?;

    let mut seen = HashSet::new();
    let mut column_exprs = Vec::new();
    let mut keys = Vec::new();

    for field in fields.iter() {
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }

        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;
        let field_str = field_name.to_string();
        let col_name = attrs.name.clone().unwrap_or_else(|| field_str.clone());

        if col_name.trim().is_empty() {
            return Err(syn::Error::new_spanned(field, "column name must not be blank"));
        }
        if !seen.insert(col_name.clone()) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate column `{}`", col_name),
            ));
        }
        if attrs.key {
            keys.push(col_name.clone());
        }

        let param_type = attrs
            .param_type
            .as_ref()
            .map(|pt| quote! { .param_type(#pt) });
        let auto_generated = attrs.auto_generated.then(|| quote! { .auto_generated() });
        let setter = (!attrs.write_only).then(|| {
            quote! {
                .setter(|bean: &mut #name, value: #field_ty| bean.#field_name = value)
            }
        });

        column_exprs.push(quote! {
            .column(
                dao_columns::ColumnDescriptor::builder(
                    #field_str,
                    |bean: &#name| -> #field_ty { ::core::clone::Clone::clone(&bean.#field_name) },
                )
                .column_name(#col_name)
                #param_type
                #auto_generated
                #setter
                .build()?
            )
        });
    }

    Ok(quote! {
        impl dao_columns::Mapped for #name {
            fn mapping() -> ::core::result::Result<
                &'static dao_columns::ColumnMapping<Self>,
                dao_columns::ColumnError,
            > {
                static MAPPING: ::std::sync::OnceLock<
                    ::core::result::Result<dao_columns::ColumnMapping<#name>, dao_columns::ColumnError>,
                > = ::std::sync::OnceLock::new();

                MAPPING
                    .get_or_init(|| {
                        dao_columns::ColumnMapping::builder(#table_name)
                            #(#column_exprs)*
                            #(.key(#keys))*
                            .build()
                    })
                    .as_ref()
                    .map_err(::core::clone::Clone::clone)
            }
        }
    })
}
