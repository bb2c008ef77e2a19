//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "FromRow requires at least one field",
        ));
    }

    // Fields decode in declaration order; the first failure short-circuits
    // before the struct is constructed.
    let field_reads: Vec<_> = fields
        .iter()
        .map(|field| {
            let field_name = field.ident.as_ref().unwrap();
            let column_name = get_column_name(field)?;

            Ok(quote! {
                #field_name: row.get(#column_name)?
            })
        })
        .collect::<Result<_>>()?;

    Ok(quote! {
        impl #impl_generics snowbind::FromRow for #name #ty_generics #where_clause {
            fn from_row(
                row: &mut snowbind::Row<'_>,
            ) -> ::core::result::Result<Self, snowbind::DecodeError> {
                ::core::result::Result::Ok(Self {
                    #(#field_reads),*
                })
            }
        }
    })
}

fn get_column_name(field: &syn::Field) -> Result<String> {
    for attr in &field.attrs {
        if attr.path().is_ident("row") {
            let nested = attr.parse_args::<syn::MetaNameValue>()?;
            if nested.path.is_ident("column") {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &nested.value
                {
                    return Ok(lit.value());
                }
            }
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[row(column = \"...\")]",
            ));
        }
    }
    Ok(field.ident.as_ref().unwrap().to_string())
}
