//! Typed function libraries for LLM function calling.
//!
//! Annotate Rust functions, export their JSON Schema to a model, and dispatch
//! the model's invocations back with validated, coerced arguments.
//!
//! # Example
//!
//! ```
//! use funcall::prelude::*;
//!
//! struct Weather;
//!
//! #[library]
//! impl Weather {
//!     /// Get the forecast for a city.
//!     #[function(force_words = ["forecast"])]
//!     fn forecast(
//!         &self,
//!         /// City name.
//!         city: String,
//!         /// Days ahead.
//!         #[default(1)]
//!         days: u8,
//!     ) -> String {
//!         format!("{city}: sunny for {days} day(s)")
//!     }
//! }
//!
//! let library = FunctionLibrary::new(Weather).unwrap();
//! let reply = library
//!     .call_by_dict(&serde_json::json!({"name": "forecast", "arguments": "{\"city\": \"Oslo\"}"}))
//!     .unwrap();
//! assert_eq!(reply.content, "Oslo: sunny for 1 day(s)");
//! ```

pub use funcall_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use funcall_internal::prelude::*;
}
