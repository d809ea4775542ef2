//! Host-supplied invocation context.

use core::any::Any;
use std::sync::Arc;

/// A value threaded by the host to every call.
///
/// Functions receive it by declaring a `&CallContext` parameter, which is
/// never exposed in the schema. Model-supplied arguments cannot populate it.
///
/// # Example
///
/// ```
/// use funcall_library::CallContext;
///
/// struct Channel(&'static str);
///
/// let ctx = CallContext::with_host(Channel("general"));
/// assert_eq!(ctx.host::<Channel>().map(|c| c.0), Some("general"));
/// assert!(ctx.host::<String>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct CallContext {
    host: Option<Arc<dyn Any + Send + Sync>>,
}

impl CallContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context holding `value`.
    #[must_use]
    pub fn with_host<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            host: Some(Arc::new(value)),
        }
    }

    /// Creates a context sharing an existing host value.
    #[must_use]
    pub fn from_shared(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self { host: Some(value) }
    }

    /// Returns the host value if it is a `T`.
    #[must_use]
    pub fn host<T: Any>(&self) -> Option<&T> {
        self.host.as_deref().and_then(|host| host.downcast_ref::<T>())
    }

    /// Returns whether a host value is present.
    #[must_use]
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }
}

impl core::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallContext")
            .field("has_host", &self.has_host())
            .finish()
    }
}
