//! Library configuration.

use serde::{Deserialize, Serialize};

/// How [`import_callables`](crate::FunctionLibrary::import_callables) treats
/// callables that lack annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Skip unannotated callables.
    #[default]
    Lenient,
    /// Fail on the first unannotated callable.
    Strict,
}

/// Behaviour switches for a [`FunctionLibrary`](crate::FunctionLibrary).
///
/// # Example
///
/// ```
/// use funcall_library::{ImportMode, LibraryConfig};
///
/// let config: LibraryConfig =
///     serde_json::from_str(r#"{"import_mode": "strict", "fallback_max_chars": 64}"#).unwrap();
/// assert_eq!(config.import_mode, ImportMode::Strict);
/// assert!(config.repair_arguments);
/// assert_eq!(config.fallback_max_chars, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Treatment of unannotated callables on import.
    pub import_mode: ImportMode,
    /// Repair argument strings before decoding them.
    pub repair_arguments: bool,
    /// Evaluate unquoted arithmetic expressions in argument strings.
    pub evaluate_expressions: bool,
    /// Maximum number of argument characters echoed in a fallback reply.
    pub fallback_max_chars: usize,
    /// Render declared defaults as `"default"` in parameter schemas.
    pub include_defaults_in_schema: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            import_mode: ImportMode::Lenient,
            repair_arguments: true,
            evaluate_expressions: false,
            fallback_max_chars: 512,
            include_defaults_in_schema: true,
        }
    }
}

impl LibraryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the import mode.
    #[must_use]
    pub fn with_import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = mode;
        self
    }

    /// Enables or disables argument string repair.
    #[must_use]
    pub fn with_repair_arguments(mut self, enabled: bool) -> Self {
        self.repair_arguments = enabled;
        self
    }

    /// Enables or disables expression evaluation.
    #[must_use]
    pub fn with_evaluate_expressions(mut self, enabled: bool) -> Self {
        self.evaluate_expressions = enabled;
        self
    }

    /// Sets the fallback argument echo limit.
    #[must_use]
    pub fn with_fallback_max_chars(mut self, max: usize) -> Self {
        self.fallback_max_chars = max;
        self
    }

    /// Enables or disables `"default"` in parameter schemas.
    #[must_use]
    pub fn with_include_defaults_in_schema(mut self, enabled: bool) -> Self {
        self.include_defaults_in_schema = enabled;
        self
    }
}
