//! Crate-path resolution for funcall procedural macros.
//!
//! Generated code must name the funcall crates by whatever path the
//! consuming crate can see: a direct (possibly renamed) dependency, the
//! `convert` re-export of `funcall_library`, or the `funcall` umbrella.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Name of the umbrella crate that re-exports every workspace crate.
const UMBRELLA: &str = "funcall";

/// A funcall crate that macro-generated code may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncallCrate {
    /// `funcall_convert`
    Convert,
    /// `funcall_library`
    Library,
}

impl FuncallCrate {
    /// Returns the `Cargo.toml` package name for this crate.
    fn package(self) -> &'static str {
        match self {
            Self::Convert => "funcall_convert",
            Self::Library => "funcall_library",
        }
    }

    /// Returns the crate re-exporting this one and the re-export's name.
    fn reexport(self) -> Option<(FuncallCrate, &'static str)> {
        match self {
            Self::Convert => Some((Self::Library, "convert")),
            Self::Library => None,
        }
    }
}

/// Returns a [`TokenStream`] path for the given funcall crate.
///
/// Resolution order:
/// 1. Direct dependency (possibly renamed in `Cargo.toml`).
/// 2. The re-export inside another funcall crate that is a direct dependency.
/// 3. The `funcall` umbrella crate (`funcall::<name>`).
/// 4. The literal crate name, so the compile error names the missing
///    dependency.
pub fn resolve_crate_path(krate: FuncallCrate) -> TokenStream {
    if let Some(path) = direct_path(krate.package()) {
        return path;
    }
    if let Some((parent, name)) = krate.reexport()
        && let Some(parent) = direct_path(parent.package())
    {
        let name = format_ident!("{}", name);
        return quote!(#parent::#name);
    }

    let ident = format_ident!("{}", krate.package());
    match crate_name(UMBRELLA) {
        // The umbrella never expands these macros in its own lib target,
        // so `Itself` only shows up for its tests and doctests.
        Ok(FoundCrate::Itself) => {
            let umbrella = format_ident!("{}", UMBRELLA);
            quote!(::#umbrella::#ident)
        }
        Ok(FoundCrate::Name(found)) => {
            let umbrella = format_ident!("{}", found);
            quote!(::#umbrella::#ident)
        }
        Err(_) => quote!(::#ident),
    }
}

fn direct_path(package: &str) -> Option<TokenStream> {
    match crate_name(package).ok()? {
        FoundCrate::Itself => {
            let ident = format_ident!("{}", package);
            Some(quote!(#ident))
        }
        FoundCrate::Name(found) => {
            let ident = format_ident!("{}", found);
            Some(quote!(::#ident))
        }
    }
}
