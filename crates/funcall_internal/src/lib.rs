//! # Funcall Internal Library
//!
//! Re-exports the core funcall crates for convenience.

/// Type converters between native Rust values and JSON Schema.
pub use funcall_convert;

/// Function libraries: registration, schema export and dispatch.
pub use funcall_library;

/// Tracing subscriber setup.
pub use funcall_tracing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use funcall_convert::{ConvertError, Converter, ConverterRegistry, NativeType};
    pub use funcall_library::{
        CallContext, DispatchError, FunctionDeclaration, FunctionError, FunctionLibrary,
        InvocationRequest, Library, LibraryConfig, Literal, Reply, ToolCall, function, library,
    };
    pub use funcall_tracing::{TracingConfig, TracingFormat};
}
