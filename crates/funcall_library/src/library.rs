//! The function library: registration, schema export and lookup.
//!
//! Dispatch lives in [`dispatch`](crate::dispatch); this module owns the
//! registry itself.
//!
//! # Usage
//!
//! ```
//! use funcall_library::{FunctionLibrary, function, library};
//!
//! struct Clock;
//!
//! #[library]
//! impl Clock {
//!     /// Get the current time.
//!     #[function]
//!     fn get_time(
//!         &self,
//!         /// Why the time is needed.
//!         comment: String,
//!     ) -> String {
//!         format!("12:00 ({comment})")
//!     }
//! }
//!
//! let library = FunctionLibrary::new(Clock).unwrap();
//! assert_eq!(library.names(), ["get_time"]);
//! ```

use crate::config::{ImportMode, LibraryConfig};
use crate::error::RegistrationError;
use crate::function::{FunctionDeclaration, FunctionDescriptor};
use crate::repair::{ArithmeticEvaluator, ExpressionEvaluator};
use crate::schema::{FunctionSchema, ToolSchema};
use funcall_convert::ConverterRegistry;
use indexmap::IndexMap;
use std::sync::Arc;

/// A value whose annotated methods form a set of functions.
///
/// Implemented by `#[library]` on an `impl` block.
pub trait Library: Send + Sync + 'static {
    /// Consumes the value and returns one declaration per annotated method.
    fn declarations(self) -> Vec<FunctionDeclaration>;
}

/// Any object exposing a collection of annotated callables, such as a host
/// application's command table.
pub trait CallableSource {
    /// Returns the callables to import.
    fn callables(&self) -> Vec<FunctionDeclaration>;
}

impl CallableSource for [FunctionDeclaration] {
    fn callables(&self) -> Vec<FunctionDeclaration> {
        self.to_vec()
    }
}

impl CallableSource for Vec<FunctionDeclaration> {
    fn callables(&self) -> Vec<FunctionDeclaration> {
        self.clone()
    }
}

impl<const N: usize> CallableSource for [FunctionDeclaration; N] {
    fn callables(&self) -> Vec<FunctionDeclaration> {
        self.to_vec()
    }
}

/// Registry of callable functions keyed by display name.
///
/// Populated at construction and by explicit registration; read-only from
/// the dispatcher's point of view. Iteration follows registration order.
pub struct FunctionLibrary {
    pub(crate) functions: IndexMap<String, FunctionDescriptor>,
    pub(crate) converters: ConverterRegistry,
    pub(crate) config: LibraryConfig,
    pub(crate) evaluator: Arc<dyn ExpressionEvaluator>,
}

impl core::fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionLibrary")
            .field("functions", &self.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for FunctionLibrary {
    fn default() -> Self {
        Self {
            functions: IndexMap::new(),
            converters: ConverterRegistry::default(),
            config: LibraryConfig::default(),
            evaluator: Arc::new(ArithmeticEvaluator),
        }
    }
}

impl FunctionLibrary {
    /// Creates a library holding the functions of `library`, with the
    /// built-in converters and default configuration.
    pub fn new(library: impl Library) -> Result<Self, RegistrationError> {
        Self::builder().library(library).build()
    }

    /// Returns a builder for a customised library.
    #[must_use]
    pub fn builder() -> FunctionLibraryBuilder {
        FunctionLibraryBuilder::default()
    }

    /// Registers a single function.
    ///
    /// On error the library is left unchanged.
    pub fn register(
        &mut self,
        declaration: FunctionDeclaration,
    ) -> Result<&FunctionDescriptor, RegistrationError> {
        let descriptor = FunctionDescriptor::build(
            declaration,
            &self.converters,
            self.config.include_defaults_in_schema,
        )?;
        let name = descriptor.name().to_string();
        if self.functions.contains_key(&name) {
            return Err(RegistrationError::DuplicateFunction(name));
        }
        tracing::info!(
            function = %name,
            kind = if descriptor.is_coroutine() { "coroutine" } else { "blocking" },
            parameters = descriptor.parameters().len(),
            "registered function"
        );
        let entry = self.functions.entry(name).or_insert(descriptor);
        Ok(entry)
    }

    /// Registers every function of a [`Library`] value.
    ///
    /// Returns the number of functions registered. Stops at the first error;
    /// functions registered before it remain.
    pub fn register_library(&mut self, library: impl Library) -> Result<usize, RegistrationError> {
        let declarations = library.declarations();
        let count = declarations.len();
        for declaration in declarations {
            self.register(declaration)?;
        }
        Ok(count)
    }

    /// Bulk-registers callables from an external source.
    ///
    /// Callables rejected by `filter` are ignored. Callables lacking
    /// annotations are skipped in [`ImportMode::Lenient`] and fail the import
    /// in [`ImportMode::Strict`]. Any other registration error fails the
    /// import; callables imported before it remain.
    ///
    /// Returns the number of callables imported.
    pub fn import_callables<S>(
        &mut self,
        source: &S,
        filter: Option<&dyn Fn(&FunctionDeclaration) -> bool>,
    ) -> Result<usize, RegistrationError>
    where
        S: CallableSource + ?Sized,
    {
        let lenient = self.config.import_mode == ImportMode::Lenient;
        let mut imported = 0;
        for declaration in source.callables() {
            if filter.is_some_and(|keep| !keep(&declaration)) {
                continue;
            }
            let native_name = declaration.native_name().to_string();
            match self.register(declaration) {
                Ok(_) => imported += 1,
                Err(err) if err.is_unannotated() && lenient => {
                    tracing::debug!(callable = %native_name, error = %err, "skipping unannotated callable");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(imported)
    }

    /// Schemas of every enabled function, in registration order.
    #[must_use]
    pub fn get_schema(&self) -> Vec<FunctionSchema> {
        self.enabled().map(|f| f.schema().clone()).collect()
    }

    /// Tool-envelope schemas of every enabled function, in registration order.
    #[must_use]
    pub fn get_tool_schema(&self) -> Vec<ToolSchema> {
        self.enabled().map(|f| f.schema().to_tool()).collect()
    }

    /// Returns the schema of the first enabled function whose force words
    /// appear in `query`.
    #[must_use]
    pub fn force_word_check(&self, query: &str) -> Option<&FunctionSchema> {
        self.enabled()
            .find(|f| f.matches_force_word(query))
            .map(FunctionDescriptor::schema)
    }

    /// Looks up a function by display name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    /// Returns whether a function is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Display names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Registered functions in registration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns whether no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The library configuration.
    #[must_use]
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// The converter registry used for registration.
    #[must_use]
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    fn enabled(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().filter(|f| f.enabled())
    }
}

/// Builder for [`FunctionLibrary`].
///
/// # Example
///
/// ```
/// use funcall_library::{
///     FunctionAnnotation, FunctionDeclaration, FunctionLibrary, LibraryConfig, to_output,
/// };
///
/// let library = FunctionLibrary::builder()
///     .with_config(LibraryConfig::new().with_evaluate_expressions(true))
///     .function(
///         FunctionDeclaration::blocking("ping", |_ctx, _input| to_output("pong"))
///             .with_annotation(FunctionAnnotation::new("Health check.")),
///     )
///     .build()
///     .unwrap();
/// assert!(library.contains("ping"));
/// ```
#[derive(Default)]
pub struct FunctionLibraryBuilder {
    converters: Option<ConverterRegistry>,
    config: LibraryConfig,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    declarations: Vec<FunctionDeclaration>,
}

impl FunctionLibraryBuilder {
    /// Uses `converters` instead of the built-in registry.
    #[must_use]
    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = Some(converters);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: LibraryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the expression evaluator used when
    /// [`evaluate_expressions`](LibraryConfig::evaluate_expressions) is on.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Collects the functions of a [`Library`] value.
    #[must_use]
    pub fn library(mut self, library: impl Library) -> Self {
        self.declarations.extend(library.declarations());
        self
    }

    /// Adds a single function.
    #[must_use]
    pub fn function(mut self, declaration: FunctionDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Builds the library, registering every collected function.
    pub fn build(self) -> Result<FunctionLibrary, RegistrationError> {
        let mut library = FunctionLibrary {
            functions: IndexMap::with_capacity(self.declarations.len()),
            converters: self.converters.unwrap_or_default(),
            config: self.config,
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(ArithmeticEvaluator)),
        };
        for declaration in self.declarations {
            library.register(declaration)?;
        }
        Ok(library)
    }
}
