//! Shared parsing and code generation for `#[function]` and `#[library]`.

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Expr, ExprLit, FnArg, GenericArgument, Lit, LitBool, LitStr, Meta, MetaNameValue,
    Pat, PatType, PathArguments, ReturnType, Signature, Token, Type,
};

/// Arguments of `#[function(...)]`.
#[derive(Default)]
pub(crate) struct FunctionArgs {
    name: Option<LitStr>,
    description: Option<LitStr>,
    required: Option<Vec<LitStr>>,
    force_words: Vec<LitStr>,
    enabled: Option<LitBool>,
}

impl FunctionArgs {
    /// Parses one `key = value` argument.
    pub(crate) fn parse_meta(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("description") {
            self.description = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("required") {
            self.required = Some(parse_str_list(&meta)?);
        } else if meta.path.is_ident("force_words") {
            self.force_words = parse_str_list(&meta)?;
        } else if meta.path.is_ident("enabled") {
            self.enabled = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error(
                "unsupported #[function] argument; expected one of \
                 `name`, `description`, `required`, `force_words`, `enabled`",
            ));
        }
        Ok(())
    }

    /// Parses the arguments of a `#[function]` attribute found on a method.
    pub(crate) fn from_attribute(attr: &Attribute) -> syn::Result<Self> {
        let mut args = Self::default();
        if !matches!(attr.meta, Meta::Path(_)) {
            attr.parse_nested_meta(|meta| args.parse_meta(meta))?;
        }
        Ok(args)
    }
}

fn parse_str_list(meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<LitStr>> {
    let value = meta.value()?;
    let content;
    syn::bracketed!(content in value);
    let list = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
    Ok(list.into_iter().collect())
}

/// Rejects generic, unsafe, extern and `const` functions.
pub(crate) fn validate_signature(sig: &Signature) -> syn::Result<()> {
    if let Some(unsafety) = &sig.unsafety {
        return Err(syn::Error::new_spanned(
            unsafety,
            "#[function] cannot be applied to unsafe functions",
        ));
    }
    if let Some(abi) = &sig.abi {
        return Err(syn::Error::new_spanned(
            abi,
            "#[function] cannot be applied to extern functions",
        ));
    }
    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "#[function] cannot be applied to const functions",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "#[function] does not support generic parameters",
        ));
    }
    Ok(())
}

/// Requires a `&self` receiver on a `#[library]` method.
pub(crate) fn validate_method(sig: &Signature) -> syn::Result<()> {
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if receiver.mutability.is_some() => {
            Err(syn::Error::new_spanned(
                receiver,
                "#[function] methods must take `&self`, not `&mut self`; \
                 the library is shared behind an Arc",
            ))
        }
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_none() => {
            Err(syn::Error::new_spanned(
                receiver,
                "#[function] methods must take `&self`, not `self` by value",
            ))
        }
        Some(FnArg::Receiver(_)) => Ok(()),
        _ => Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[function] methods in a #[library] must take `&self` as the first parameter",
        )),
    }
}

/// Rejects a receiver on a free `#[function]`.
pub(crate) fn validate_free(sig: &Signature) -> syn::Result<()> {
    if let Some(FnArg::Receiver(receiver)) = sig.inputs.first() {
        return Err(syn::Error::new_spanned(
            receiver,
            "#[function] on a method requires #[library] on the enclosing impl block",
        ));
    }
    Ok(())
}

/// A parameter of an annotated function.
pub(crate) enum FnParam {
    /// A `&CallContext` supplied by the dispatcher.
    Context,
    /// A parameter exposed to the model.
    Value(ParamInfo),
}

/// A model-facing parameter.
pub(crate) struct ParamInfo {
    ident: Ident,
    name: String,
    ty: Type,
    description: Option<String>,
    keywords: Vec<(String, Expr)>,
    default: Option<Expr>,
}

/// Parses every non-receiver parameter.
pub(crate) fn parse_params(sig: &Signature) -> syn::Result<Vec<FnParam>> {
    sig.inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => Some(parse_param(pat_type)),
            FnArg::Receiver(_) => None,
        })
        .collect()
}

fn parse_param(pat_type: &PatType) -> syn::Result<FnParam> {
    if is_context_type(&pat_type.ty) {
        return Ok(FnParam::Context);
    }
    let Pat::Ident(pat_ident) = &*pat_type.pat else {
        return Err(syn::Error::new_spanned(
            &pat_type.pat,
            "#[function] parameters must be plain identifiers",
        ));
    };

    let mut keywords = Vec::new();
    let mut default = None;
    for attr in &pat_type.attrs {
        if attr.path().is_ident("schema") {
            let pairs = attr.parse_args_with(
                Punctuated::<MetaNameValue, Token![,]>::parse_terminated,
            )?;
            for pair in pairs {
                let key = pair.path.get_ident().ok_or_else(|| {
                    syn::Error::new_spanned(&pair.path, "schema keywords must be single identifiers")
                })?;
                keywords.push((key.unraw().to_string(), pair.value));
            }
        } else if attr.path().is_ident("default") {
            default = Some(attr.parse_args::<Expr>()?);
        }
    }

    if default.is_some() && unwrap_option_inner(&pat_type.ty).is_some() {
        return Err(syn::Error::new_spanned(
            &pat_type.ty,
            "Option parameters are already optional and cannot take #[default]",
        ));
    }

    Ok(FnParam::Value(ParamInfo {
        ident: pat_ident.ident.clone(),
        name: pat_ident.ident.unraw().to_string(),
        ty: (*pat_type.ty).clone(),
        description: extract_doc_comments(&pat_type.attrs),
        keywords,
        default,
    }))
}

/// Removes parameter attributes consumed by the macros.
pub(crate) fn strip_param_attrs(sig: &mut Signature) {
    for input in &mut sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|attr| {
                !attr.path().is_ident("doc")
                    && !attr.path().is_ident("default")
                    && !attr.path().is_ident("schema")
            });
        }
    }
}

/// Extracts doc comment text from attributes.
pub(crate) fn extract_doc_comments(attrs: &[Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(MetaNameValue {
                value:
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }),
                ..
            }) => Some(lit.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// Checks if a return type is `Result<T, E>`.
fn is_result_type(return_type: &ReturnType) -> bool {
    if let ReturnType::Type(_, ty) = return_type
        && let Type::Path(type_path) = ty.as_ref()
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "Result";
    }
    false
}

/// Checks if a return type is `()`, written or implied.
fn is_unit_type(return_type: &ReturnType) -> bool {
    match return_type {
        ReturnType::Default => true,
        ReturnType::Type(_, ty) => matches!(ty.as_ref(), Type::Tuple(tuple) if tuple.elems.is_empty()),
    }
}

/// Checks if a type is `&CallContext`.
fn is_context_type(ty: &Type) -> bool {
    if let Type::Reference(reference) = ty
        && reference.mutability.is_none()
        && let Type::Path(type_path) = reference.elem.as_ref()
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "CallContext";
    }
    false
}

/// Extracts `T` from `Option<T>`, returning `None` if the type is not `Option`.
fn unwrap_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Option"
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && args.args.len() == 1
        && let GenericArgument::Type(inner) = &args.args[0]
    {
        Some(inner)
    } else {
        None
    }
}

/// Everything needed to generate one `FunctionDeclaration` expression.
pub(crate) struct Declaration<'a> {
    /// Path to `funcall_library`.
    pub fl: &'a TokenStream,
    /// The function's signature.
    pub sig: &'a Signature,
    /// Doc comment of the function.
    pub doc: Option<String>,
    /// Parsed `#[function(...)]` arguments.
    pub args: &'a FunctionArgs,
    /// Parsed parameters.
    pub params: &'a [FnParam],
    /// Callee path, e.g. `my_fn` or `__this.my_method`.
    pub call_target: TokenStream,
    /// Statement cloning shared state into the callable, and into each
    /// invocation of a coroutine. Empty for free functions.
    pub capture: TokenStream,
}

impl Declaration<'_> {
    /// Generates the declaration expression.
    pub(crate) fn generate(&self) -> TokenStream {
        let fl = self.fl;
        let native_name = self.sig.ident.unraw().to_string();
        let is_async = self.sig.asyncness.is_some();
        let annotation = self.annotation();

        let param_decls = self.params.iter().filter_map(|param| match param {
            FnParam::Value(info) => Some(param_declaration(fl, info)),
            FnParam::Context => None,
        });
        let extractions: Vec<_> = self
            .params
            .iter()
            .filter_map(|param| match param {
                FnParam::Value(info) => Some(extraction(info)),
                FnParam::Context => None,
            })
            .collect();
        let call_args = self.params.iter().map(|param| match param {
            FnParam::Value(info) => {
                let ident = &info.ident;
                quote! { #ident }
            }
            FnParam::Context if is_async => quote! { &__ctx },
            FnParam::Context => quote! { __ctx },
        });

        let call_target = &self.call_target;
        let call = if is_async {
            quote! { #call_target(#(#call_args),*).await }
        } else {
            quote! { #call_target(#(#call_args),*) }
        };
        let output = if is_result_type(&self.sig.output) {
            quote! {
                match #call {
                    ::core::result::Result::Ok(__value) => #fl::to_output(__value),
                    ::core::result::Result::Err(__err) => {
                        ::core::result::Result::Err(#fl::FunctionError::failed(__err))
                    }
                }
            }
        } else if is_unit_type(&self.sig.output) {
            quote! {
                #call;
                #fl::to_output(())
            }
        } else {
            quote! { #fl::to_output(#call) }
        };

        let input = if extractions.is_empty() {
            quote! { __input }
        } else {
            quote! { mut __input }
        };
        let capture = &self.capture;

        let declaration = if is_async {
            quote! {
                {
                    #capture
                    #fl::FunctionDeclaration::coroutine(
                        #native_name,
                        move |__ctx: #fl::CallContext, #input: #fl::CallInput| {
                            #capture
                            async move {
                                #(#extractions)*
                                #output
                            }
                        },
                    )
                }
            }
        } else {
            quote! {
                {
                    #capture
                    #fl::FunctionDeclaration::blocking(
                        #native_name,
                        move |__ctx: &#fl::CallContext, #input: #fl::CallInput| {
                            #(#extractions)*
                            #output
                        },
                    )
                }
            }
        };

        quote! {
            #declaration
                .with_annotation(#annotation)
                #(.with_param(#param_decls))*
        }
    }

    fn annotation(&self) -> TokenStream {
        let fl = self.fl;
        let description = self
            .args
            .description
            .as_ref()
            .map(LitStr::value)
            .or_else(|| self.doc.clone())
            .unwrap_or_default();

        let mut annotation = quote! { #fl::FunctionAnnotation::new(#description) };
        if let Some(name) = &self.args.name {
            annotation = quote! { #annotation.with_name(#name) };
        }
        if let Some(required) = &self.args.required {
            annotation = quote! {
                #annotation.with_required::<_, &'static str>([#(#required),*])
            };
        }
        if !self.args.force_words.is_empty() {
            let words = &self.args.force_words;
            annotation = quote! { #annotation.with_force_words([#(#words),*]) };
        }
        if let Some(enabled) = &self.args.enabled {
            annotation = quote! { #annotation.with_enabled(#enabled) };
        }
        annotation
    }
}

fn param_declaration(fl: &TokenStream, info: &ParamInfo) -> TokenStream {
    let name = &info.name;
    let mut decl = match unwrap_option_inner(&info.ty) {
        Some(inner) => quote! { #fl::ParamDeclaration::typed::<#inner>(#name).optional() },
        None => {
            let ty = &info.ty;
            quote! { #fl::ParamDeclaration::typed::<#ty>(#name) }
        }
    };
    if let Some(description) = &info.description {
        decl = quote! { #decl.with_description(#description) };
    }
    for (key, value) in &info.keywords {
        decl = quote! {
            #decl.with_keyword(#key, #fl::__private::serde_json::json!(#value))
        };
    }
    if let Some(default) = &info.default {
        decl = quote! {
            #decl.with_default(#fl::__private::serde_json::json!(#default))
        };
    }
    decl
}

fn extraction(info: &ParamInfo) -> TokenStream {
    let ident = &info.ident;
    let name = &info.name;
    let ty = &info.ty;
    if let Some(inner) = unwrap_option_inner(ty) {
        quote! {
            let #ident: #ty = __input.take_optional::<#inner>(#name)?;
        }
    } else if let Some(default) = &info.default {
        quote! {
            let #ident: #ty = __input.take_optional::<#ty>(#name)?.unwrap_or_else(|| #default);
        }
    } else {
        quote! {
            let #ident: #ty = __input.take::<#ty>(#name)?;
        }
    }
}
