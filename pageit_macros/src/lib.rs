//! Procedural macros for the `pageit` repository library.
//!
//! `#[derive(Entity)]` inspects a struct with named fields and generates the
//! table metadata (`Fetchable`), key access (`Identifiable`), insert/update
//! value extraction (`Insertable`, `Updatable`) and a `<Name>RowAdapter` that
//! maps libSQL rows back into the struct.
//!
//! Finders are not generated from method names; callers build a
//! `pageit_core::Predicate` instead.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, Data, DeriveInput, Fields, Ident, LitInt, LitStr, Token, Type,
};

use inflections::Inflect;

/// `key = "value"` inside `#[entity(...)]`.
struct MetaNameValue {
    pub path: syn::Path,
    pub _eq_token: Token![=],
    pub value: LitStr,
}

impl Parse for MetaNameValue {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            path: input.parse()?,
            _eq_token: input.parse()?,
            value: input.parse()?,
        })
    }
}

/// Inner type of an `Option<T>`, if `ty` is one.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn type_name(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}

/// Scalar kinds that map onto `ParamValue` variants.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scalar {
    String,
    I32,
    I64,
    F64,
    Bool,
}

impl Scalar {
    fn from_type_name(s: &str) -> Option<Self> {
        match s {
            "String" | "std::string::String" => Some(Scalar::String),
            "i32" => Some(Scalar::I32),
            "i64" => Some(Scalar::I64),
            "f64" => Some(Scalar::F64),
            "bool" => Some(Scalar::Bool),
            _ => None,
        }
    }

    fn variant(self) -> TokenStream2 {
        match self {
            Scalar::String => quote! { ::pageit_core::ParamValue::String },
            Scalar::I32 => quote! { ::pageit_core::ParamValue::I32 },
            Scalar::I64 => quote! { ::pageit_core::ParamValue::I64 },
            Scalar::F64 => quote! { ::pageit_core::ParamValue::F64 },
            Scalar::Bool => quote! { ::pageit_core::ParamValue::Bool },
        }
    }

    fn is_copy(self) -> bool {
        self != Scalar::String
    }
}

/// Parsed metadata for one struct field.
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    ty_str: String,
    column_name: String,
    /// `None` for skipped fields, which never reach SQL.
    scalar: Option<Scalar>,
    optional: bool,
    is_id: bool,
    is_skipped: bool,
}

fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "#[derive(Entity)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "#[derive(Entity)] can only be used on structs",
            ))
        }
    };

    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let mut column_name = ident.to_string();
        let mut is_id = false;
        let mut is_skipped = false;

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("fetch")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let s: LitStr = meta.value()?.parse()?;
                    column_name = s.value();
                } else if meta.path.is_ident("id") {
                    is_id = true;
                } else if meta.path.is_ident("skip") {
                    is_skipped = true;
                } else {
                    return Err(meta.error("expected `id`, `skip` or `column = \"...\"`"));
                }
                Ok(())
            })?;
        }

        let ty = field.ty.clone();
        let ty_str = type_name(&ty);
        let (optional, scalar_ty) = match get_option_inner(&ty) {
            Some(inner) => (true, type_name(inner)),
            None => (false, ty_str.clone()),
        };
        let scalar = Scalar::from_type_name(&scalar_ty);
        if scalar.is_none() && !is_skipped {
            return Err(syn::Error::new_spanned(
                &field.ty,
                format!(
                    "unsupported column type `{}`: use String, i32, i64, f64, bool (or Option of one), or mark the field #[fetch(skip)]",
                    ty_str
                ),
            ));
        }

        out.push(FieldMetadata {
            ident,
            ty,
            ty_str,
            column_name,
            scalar: if is_skipped { None } else { scalar },
            optional,
            is_id,
            is_skipped,
        });
    }
    Ok(out)
}

/// ASCII identifier check for table and column names that end up in SQL text.
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Expression turning `self.<field>` into a `ParamValue`.
fn to_param_value(field: &FieldMetadata) -> TokenStream2 {
    let ident = &field.ident;
    let Some(scalar) = field.scalar else {
        return quote! { ::pageit_core::ParamValue::Null };
    };
    let variant = scalar.variant();
    match (field.optional, scalar.is_copy()) {
        (true, true) => quote! { self.#ident.map_or(::pageit_core::ParamValue::Null, #variant) },
        (true, false) => quote! {
            self.#ident.as_ref().cloned().map_or(::pageit_core::ParamValue::Null, #variant)
        },
        (false, true) => quote! { #variant(self.#ident) },
        (false, false) => quote! { #variant(self.#ident.clone()) },
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let fields = parse_field_metadata(input)?;

    let mut table_name_override = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        let list = attr.meta.require_list()?;
        let MetaNameValue { path, value, .. } = syn::parse2(list.tokens.clone())?;
        if !path.is_ident("table") {
            return Err(syn::Error::new_spanned(path, "expected `table = \"...\"`"));
        }
        table_name_override = Some(value.value());
    }
    // `Member` -> `members`
    let table_name = table_name_override
        .unwrap_or_else(|| format!("{}s", struct_name.to_string().to_snake_case()));

    if !is_valid_ident(&table_name) {
        return Err(syn::Error::new_spanned(
            struct_name,
            format!(
                "invalid table name `{}`: use ASCII letters, digits or `_`, starting with a letter or `_`",
                table_name
            ),
        ));
    }
    for f in fields.iter().filter(|f| !f.is_skipped) {
        if !is_valid_ident(&f.column_name) {
            return Err(syn::Error::new_spanned(
                &f.ident,
                format!("invalid column name `{}`", f.column_name),
            ));
        }
    }

    let mut ids = fields.iter().filter(|f| f.is_id);
    let id_field = match (ids.next(), ids.next()) {
        (Some(id), None) => id,
        (None, _) => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "a field must be marked with #[fetch(id)]",
            ))
        }
        (Some(_), Some(extra)) => {
            return Err(syn::Error::new_spanned(
                &extra.ident,
                "exactly one field may be marked with #[fetch(id)]",
            ))
        }
    };
    if id_field.is_skipped {
        return Err(syn::Error::new_spanned(
            &id_field.ident,
            "the #[fetch(id)] field cannot be skipped",
        ));
    }

    let stored: Vec<&FieldMetadata> = fields.iter().filter(|f| !f.is_skipped).collect();

    // --- Fetchable ---
    let select_columns: Vec<&String> = stored.iter().map(|f| &f.column_name).collect();
    let select_values: Vec<TokenStream2> = stored.iter().map(|f| to_param_value(f)).collect();
    let findable_columns: Vec<TokenStream2> = stored
        .iter()
        .filter(|f| !f.is_id)
        .map(|f| {
            let col = &f.column_name;
            let ty_str = &f.ty_str;
            quote! { (#col, #ty_str) }
        })
        .collect();

    let fetchable_impl = quote! {
        impl ::pageit_core::Fetchable for #struct_name {
            const TABLE: &'static str = #table_name;
            const SELECT_COLUMNS: &'static [&'static str] = &[#(#select_columns),*];
            const FINDABLE_COLUMNS: &'static [(&'static str, &'static str)] = &[#(#findable_columns),*];

            fn select_values(&self) -> ::std::vec::Vec<::pageit_core::ParamValue> {
                vec![#(#select_values),*]
            }
        }
    };

    // --- Identifiable ---
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;
    let key_ty = get_option_inner(id_ty).unwrap_or(id_ty);
    let id_column_name = &id_field.column_name;
    let id_accessor = if id_field.optional {
        quote! { self.#id_ident.clone() }
    } else {
        quote! { Some(self.#id_ident.clone()) }
    };

    let identifiable_impl = quote! {
        impl ::pageit_core::Identifiable for #struct_name {
            type Key = #key_ty;
            const ID_COLUMN: &'static str = #id_column_name;
            fn id(&self) -> Option<Self::Key> {
                #id_accessor
            }
        }
    };

    // --- Insertable / Updatable ---
    let data_fields: Vec<&FieldMetadata> = stored.iter().copied().filter(|f| !f.is_id).collect();
    let data_columns: Vec<&String> = data_fields.iter().map(|f| &f.column_name).collect();
    let data_values: Vec<TokenStream2> = data_fields.iter().map(|f| to_param_value(f)).collect();
    let id_value = to_param_value(id_field);

    let insertable_impl = quote! {
        impl ::pageit_core::Insertable for #struct_name {
            const INSERT_COLUMNS: &'static [&'static str] = &[#(#data_columns),*];
            fn insert_values(&self) -> ::std::vec::Vec<::pageit_core::ParamValue> {
                vec![#(#data_values),*]
            }
        }
    };

    let updatable_impl = quote! {
        impl ::pageit_core::Updatable for #struct_name {
            const UPDATE_COLUMNS: &'static [&'static str] = &[#(#data_columns),*];
            fn update_values(&self) -> ::std::vec::Vec<::pageit_core::ParamValue> {
                vec![#(#data_values,)* #id_value]
            }
        }
    };

    // --- RowAdapter ---
    // Column indexes follow SELECT_COLUMNS, i.e. stored fields only.
    let adapter_struct_name = Ident::new(&format!("{}RowAdapter", struct_name), struct_name.span());
    let mut index = 0i32;
    let libsql_get_mappings: Vec<TokenStream2> = fields
        .iter()
        .map(|f| {
            let ident = &f.ident;
            if f.is_skipped {
                return quote! { #ident: ::core::default::Default::default() };
            }
            let ty = &f.ty;
            let col_index = LitInt::new(&index.to_string(), ident.span());
            index += 1;
            quote! {
                #ident: row
                    .get::<#ty>(#col_index)
                    .map_err(::pageit_core::RepoError::mapping)?
            }
        })
        .collect();

    let row_adapter_impls = quote! {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #adapter_struct_name;

        // Compiled only in crates that link libsql and opt in.
        #[cfg(feature = "backend-adapters")]
        impl ::pageit_core::RowAdapter<#struct_name> for #adapter_struct_name {
            type Row = ::libsql::Row;
            fn from_row(&self, row: &Self::Row) -> ::pageit_core::RepoResult<#struct_name> {
                Ok(#struct_name {
                    #(#libsql_get_mappings),*
                })
            }
        }
    };

    Ok(quote! {
        #fetchable_impl
        #identifiable_impl
        #insertable_impl
        #updatable_impl
        #row_adapter_impls
    })
}

#[proc_macro_derive(Entity, attributes(entity, fetch))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
