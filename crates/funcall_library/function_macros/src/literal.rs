//! `#[derive(Literal)]` for field-less enums.

use funcall_macro_utils::{FuncallCrate, resolve_crate_path};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub(crate) fn derive_literal(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Literal)] is only supported on enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Literal)] does not support generic enums",
        ));
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Literal)] requires at least one variant",
        ));
    }

    let mut idents = Vec::with_capacity(data.variants.len());
    let mut values = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                &variant.fields,
                "#[derive(Literal)] variants cannot have fields",
            ));
        }
        let mut value = variant.ident.to_string();
        for attr in &variant.attrs {
            if !attr.path().is_ident("literal") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    value = meta.value()?.parse::<LitStr>()?.value();
                    Ok(())
                } else {
                    Err(meta.error("unsupported #[literal] argument; expected `rename`"))
                }
            })?;
        }
        if values.contains(&value) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate literal value `{value}`"),
            ));
        }
        idents.push(&variant.ident);
        values.push(value);
    }

    let fc = resolve_crate_path(FuncallCrate::Convert);
    let name = &input.ident;

    Ok(quote! {
        impl #fc::NativeType for #name {
            fn type_tag() -> #fc::TypeTag {
                #fc::TypeTag::literal::<Self>()
            }
        }

        impl #fc::Literal for #name {
            const VALUES: &'static [&'static str] = &[#(#values),*];

            fn from_literal(value: &str) -> ::core::option::Option<Self> {
                match value {
                    #(#values => ::core::option::Option::Some(Self::#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn as_literal(&self) -> &'static str {
                match self {
                    #(Self::#idents => #values,)*
                }
            }
        }

        impl #fc::__private::serde::Serialize for #name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: #fc::__private::serde::Serializer,
            {
                serializer.serialize_str(#fc::Literal::as_literal(self))
            }
        }
    })
}
