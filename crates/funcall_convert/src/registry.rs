//! The converter registry.
//!
//! [`ConverterRegistry`] maps native types to converters. Lookup is by exact
//! type identity first; on a miss, literal and sequence types are resolved
//! structurally from their [`Shape`].

use crate::builtin::{
    BooleanConverter, DateConverter, DateTimeConverter, IntegerConverter, NumberConverter,
    StringConverter, UtcDateTimeConverter,
};
use crate::converter::{AnyConverter, Converter};
use crate::error::UnsupportedTypeError;
use crate::native::{NativeType, Shape, TypeTag};
use crate::structural::{ArrayConverter, LiteralConverter};
use core::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A converter was already registered for a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("A converter for `{type_name}` is already registered")]
pub struct ConverterConflictError {
    /// Rust type name of the conflicting registration.
    pub type_name: &'static str,
}

/// Registry of converters keyed by native type.
///
/// [`Default`] includes the built-in converters; use [`empty`](Self::empty)
/// to start from nothing.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, (&'static str, Arc<dyn AnyConverter>)>,
}

impl core::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<_> = self.converters.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("types", &names)
            .finish()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConverterRegistry {
    /// Creates a registry with no converters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Creates a registry with converters for strings, every primitive integer
    /// and float, `bool`, and the chrono date types.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(StringConverter);
        registry.register(BooleanConverter);
        registry.register(IntegerConverter::<i8>::new());
        registry.register(IntegerConverter::<i16>::new());
        registry.register(IntegerConverter::<i32>::new());
        registry.register(IntegerConverter::<i64>::new());
        registry.register(IntegerConverter::<isize>::new());
        registry.register(IntegerConverter::<u8>::new());
        registry.register(IntegerConverter::<u16>::new());
        registry.register(IntegerConverter::<u32>::new());
        registry.register(IntegerConverter::<u64>::new());
        registry.register(IntegerConverter::<usize>::new());
        registry.register(NumberConverter::<f32>::new());
        registry.register(NumberConverter::<f64>::new());
        registry.register(DateTimeConverter);
        registry.register(UtcDateTimeConverter);
        registry.register(DateConverter);
        registry
    }

    /// Registers `converter` for its native type, replacing and returning any
    /// previous converter for that type.
    pub fn register<C: Converter>(&mut self, converter: C) -> Option<Arc<dyn AnyConverter>> {
        let tag = TypeTag::exact::<C::Native>();
        tracing::debug!(native = tag.name(), "registering converter");
        self.converters
            .insert(tag.id(), (tag.name(), Arc::new(converter)))
            .map(|(_, previous)| previous)
    }

    /// Registers `converter` only if its native type has no converter yet.
    pub fn try_register<C: Converter>(&mut self, converter: C) -> Result<(), ConverterConflictError> {
        if self.contains::<C::Native>() {
            return Err(ConverterConflictError {
                type_name: core::any::type_name::<C::Native>(),
            });
        }
        self.register(converter);
        Ok(())
    }

    /// Returns whether an exact converter exists for `T`.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Resolves the converter for `T`.
    pub fn resolve_type<T: NativeType>(&self) -> Result<Arc<dyn AnyConverter>, UnsupportedTypeError> {
        self.resolve(&T::type_tag())
    }

    /// Resolves the converter for a type tag.
    ///
    /// An exact registration always wins. Otherwise literal tags get a
    /// [`LiteralConverter`] and sequence tags an [`ArrayConverter`] around
    /// the resolved item converter.
    pub fn resolve(&self, tag: &TypeTag) -> Result<Arc<dyn AnyConverter>, UnsupportedTypeError> {
        if let Some((_, converter)) = self.converters.get(&tag.id()) {
            return Ok(Arc::clone(converter));
        }

        match tag.shape() {
            Shape::Literal(shape) => Ok(Arc::new(LiteralConverter::new(*shape))),
            Shape::Sequence(shape) => {
                let item = self.resolve(&shape.item)?;
                Ok(Arc::new(ArrayConverter::new(item, shape)))
            }
            Shape::Exact => Err(UnsupportedTypeError {
                type_name: tag.name(),
            }),
        }
    }

    /// Number of exact registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns whether no exact converters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
