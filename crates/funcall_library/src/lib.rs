//! Function libraries for LLM function calling.
//!
//! This crate turns annotated Rust functions into JSON Schema descriptors for
//! a model's function-calling interface, and dispatches the model's
//! invocations back onto those functions with validated, coerced arguments.
//!
//! # Quick Start
//!
//! ```
//! use funcall_library::{CallContext, FunctionLibrary, InvocationRequest, function, library};
//!
//! struct Alarms;
//!
//! #[library]
//! impl Alarms {
//!     /// Set an alarm.
//!     #[function(required = ["hour", "label"])]
//!     fn set_alarm(
//!         &self,
//!         /// Hour of day, 0 to 23.
//!         #[schema(minimum = 0, maximum = 23)]
//!         hour: u8,
//!         /// Alarm label.
//!         #[default("alarm".to_string())]
//!         label: String,
//!     ) -> String {
//!         format!("{label} at {hour}:00")
//!     }
//! }
//!
//! let library = FunctionLibrary::new(Alarms).unwrap();
//! let schema = &library.get_schema()[0];
//! assert_eq!(schema.parameters.required, ["hour", "label"]);
//!
//! let request = InvocationRequest::new("set_alarm", r#"{"hour": 7, "label": "wake"}"#);
//! let reply = library.resolve_and_call(&request, &CallContext::default()).unwrap();
//! assert_eq!(reply.content, "wake at 7:00");
//! ```
//!
//! # Architecture
//!
//! - [`FunctionDeclaration`] / [`ParamDeclaration`] — what a function declares
//! - [`FunctionDescriptor`] / [`ParameterDescriptor`] — resolved, cached form
//! - [`FunctionLibrary`] — registry, schema export and dispatch
//! - [`Library`] / [`CallableSource`] — collections of annotated functions
//! - [`SingleCall`] — one-shot completion with tool dispatch
//! - [`convert`] — the type converter registry

// Self-reference so macro-generated `funcall_library::` paths resolve inside this crate.
extern crate self as funcall_library;

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod function;
pub mod library;
pub mod param;
pub mod repair;
pub mod request;
pub mod schema;
pub mod single_call;

pub use funcall_convert as convert;
pub use funcall_convert::{Converter, ConverterRegistry, Literal, NativeType, TypeTag};

pub use config::{ImportMode, LibraryConfig};
pub use context::CallContext;
pub use dispatch::{Reply, ReplyStatus, ToolOutput};
pub use error::{DispatchError, FunctionError, RegistrationError, SingleCallError};
pub use function::{
    CallFuture, Callable, FunctionAnnotation, FunctionDeclaration, FunctionDescriptor, to_output,
};
pub use library::{CallableSource, FunctionLibrary, FunctionLibraryBuilder, Library};
pub use param::{CallInput, ParamDeclaration, ParameterDescriptor};
pub use repair::{ArithmeticEvaluator, ExpressionEvaluator};
pub use request::{Invocation, InvocationRequest, RawArguments, ToolCall};
pub use schema::{FunctionSchema, ParametersSchema, ToolSchema};
pub use single_call::{AsyncChatClient, ChatClient, SingleCall, ToolChoice};

// Re-export proc macros.
pub use function_macros::{Literal, function, library};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
