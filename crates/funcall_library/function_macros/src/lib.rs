//! Procedural macros for funcall function libraries.
//!
//! Provides `#[function]` for standalone functions, `#[library]` for grouped
//! functions on impl blocks, and `#[derive(Literal)]` for closed value sets.

mod common;
mod function_fn;
mod library;
mod literal;

use proc_macro::TokenStream;

/// Declares a model-callable function.
///
/// On a free function, generates `fn <name>_declaration() -> FunctionDeclaration`
/// next to the function. Inside a `#[library]` impl block, marks the method
/// for collection into the library.
///
/// # Arguments
///
/// - `name = "..."` — name exposed to the model (defaults to the Rust name)
/// - `description = "..."` — function description (defaults to the doc comment)
/// - `required = ["a", "b"]` — explicit required parameters
/// - `force_words = ["..."]` — words in a prompt that force this function
/// - `enabled = false` — keep the function out of exported schemas
///
/// # Parameter Attributes
///
/// - `/// doc comment` — becomes the parameter's description
/// - `#[default(expr)]` — makes the parameter optional with a default value
/// - `#[schema(key = value)]` — extra JSON Schema keywords
///
/// A parameter of type `&CallContext` is injected by the dispatcher and does
/// not appear in the schema. `Option<T>` parameters are optional.
///
/// # Example
///
/// ```
/// use funcall_library::{FunctionError, function};
///
/// /// Divide two numbers.
/// #[function]
/// fn divide(a: f64, b: f64) -> Result<f64, FunctionError> {
///     if b == 0.0 {
///         return Err(FunctionError::failed("division by zero"));
///     }
///     Ok(a / b)
/// }
///
/// let declaration = divide_declaration();
/// assert_eq!(declaration.native_name(), "divide");
/// ```
#[proc_macro_attribute]
pub fn function(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = common::FunctionArgs::default();
    let parser = syn::meta::parser(|meta| args.parse_meta(meta));
    syn::parse_macro_input!(attr with parser);
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    function_fn::generate_function(&args, &input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Collects the `#[function]` methods of an impl block into a `Library`.
///
/// The receiver is moved into an `Arc` shared by every declaration, so
/// methods take `&self`.
///
/// # Example
///
/// ```
/// use funcall_library::{FunctionLibrary, function, library};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// #[library]
/// impl Greeter {
///     /// Greet someone.
///     #[function]
///     fn greet(&self, name: String) -> String {
///         format!("{}, {name}!", self.greeting)
///     }
///
///     /// Greet someone, eventually.
///     #[function]
///     async fn greet_later(&self, name: String) -> String {
///         format!("{}, {name}.", self.greeting)
///     }
/// }
///
/// let library = FunctionLibrary::new(Greeter { greeting: "Hello".into() }).unwrap();
/// assert_eq!(library.names(), ["greet", "greet_later"]);
/// ```
#[proc_macro_attribute]
pub fn library(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemImpl);
    library::generate_library(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `Literal` and `NativeType` for a field-less enum.
///
/// Each variant's wire value is its name, unless renamed with
/// `#[literal(rename = "...")]`. The enum serializes as that value.
///
/// # Example
///
/// ```
/// use funcall_library::Literal;
///
/// #[derive(Literal)]
/// enum Unit {
///     #[literal(rename = "celsius")]
///     Celsius,
///     #[literal(rename = "fahrenheit")]
///     Fahrenheit,
/// }
///
/// assert_eq!(Unit::VALUES, ["celsius", "fahrenheit"]);
/// assert!(Unit::from_literal("kelvin").is_none());
/// ```
#[proc_macro_derive(Literal, attributes(literal))]
pub fn derive_literal(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    literal::derive_literal(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
