//! Code generation for `#[function]` on free functions.

use funcall_macro_utils::{FuncallCrate, resolve_crate_path};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemFn;

use crate::common::{
    Declaration, FunctionArgs, extract_doc_comments, parse_params, strip_param_attrs,
    validate_free, validate_signature,
};

/// Keeps the function and adds `fn <name>_declaration() -> FunctionDeclaration`.
pub(crate) fn generate_function(args: &FunctionArgs, input: &ItemFn) -> syn::Result<TokenStream> {
    validate_signature(&input.sig)?;
    validate_free(&input.sig)?;

    let fl = resolve_crate_path(FuncallCrate::Library);
    let params = parse_params(&input.sig)?;
    let fn_name = &input.sig.ident;

    let declaration = Declaration {
        fl: &fl,
        sig: &input.sig,
        doc: extract_doc_comments(&input.attrs),
        args,
        params: &params,
        call_target: quote! { #fn_name },
        capture: TokenStream::new(),
    }
    .generate();

    let mut cleaned = input.clone();
    strip_param_attrs(&mut cleaned.sig);

    let vis = &input.vis;
    let declaration_fn = format_ident!("{}_declaration", fn_name);
    let doc = format!("Returns the function declaration of [`{fn_name}`].");

    Ok(quote! {
        #cleaned

        #[doc = #doc]
        #[must_use]
        #vis fn #declaration_fn() -> #fl::FunctionDeclaration {
            #declaration
        }
    })
}
