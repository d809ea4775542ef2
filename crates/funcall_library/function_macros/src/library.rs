//! Code generation for `#[library]` on impl blocks.

use funcall_macro_utils::{FuncallCrate, resolve_crate_path};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{ImplItem, ItemImpl};

use crate::common::{
    Declaration, FunctionArgs, extract_doc_comments, parse_params, strip_param_attrs,
    validate_method, validate_signature,
};

/// Generates a `Library` impl collecting every `#[function]` method.
pub(crate) fn generate_library(input: &ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[library] must be applied to an inherent impl block",
        ));
    }

    let fl = resolve_crate_path(FuncallCrate::Library);
    let self_ty = &input.self_ty;
    let (impl_generics, _ty_generics, where_clause) = input.generics.split_for_impl();

    let mut cleaned = input.clone();
    let mut declarations = Vec::new();

    for item in &mut cleaned.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let Some(position) = method
            .attrs
            .iter()
            .position(|attr| attr.path().is_ident("function"))
        else {
            continue;
        };
        let attr = method.attrs.remove(position);

        validate_signature(&method.sig)?;
        validate_method(&method.sig)?;
        let args = FunctionArgs::from_attribute(&attr)?;
        let params = parse_params(&method.sig)?;

        let method_name = &method.sig.ident;
        declarations.push(
            Declaration {
                fl: &fl,
                sig: &method.sig,
                doc: extract_doc_comments(&method.attrs),
                args: &args,
                params: &params,
                call_target: quote! { __this.#method_name },
                capture: quote! { let __this = ::std::sync::Arc::clone(&__this); },
            }
            .generate(),
        );

        strip_param_attrs(&mut method.sig);
    }

    Ok(quote! {
        #cleaned

        impl #impl_generics #fl::Library for #self_ty #where_clause {
            fn declarations(self) -> ::std::vec::Vec<#fl::FunctionDeclaration> {
                let __this = ::std::sync::Arc::new(self);
                ::std::vec![
                    #(#declarations),*
                ]
            }
        }
    })
}
