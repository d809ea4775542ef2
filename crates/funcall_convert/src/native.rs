//! Native type identification.
//!
//! Every Rust type that can appear as a function parameter implements
//! [`NativeType`], which yields a [`TypeTag`]. The tag carries the type's
//! identity plus a [`Shape`] describing how the registry may resolve it
//! structurally when no converter is registered for the exact type.

use core::any::{Any, TypeId};
use core::fmt;

/// A boxed, type-erased native value produced by a converter.
pub type NativeValue = Box<dyn Any + Send>;

/// A Rust type that can be described to, and reconstructed from, a model.
///
/// Plain types use the default [`type_tag`](Self::type_tag), which resolves by
/// exact identity. Closed value sets and sequences override it to expose a
/// structural [`Shape`].
///
/// # Example
///
/// ```
/// use funcall_convert::NativeType;
///
/// struct UserId(u64);
///
/// impl NativeType for UserId {}
/// ```
pub trait NativeType: Sized + Send + 'static {
    /// Returns the tag used to resolve this type's converter.
    fn type_tag() -> TypeTag {
        TypeTag::exact::<Self>()
    }
}

/// A closed set of string values, typically a field-less enum.
///
/// Usually implemented with `#[derive(Literal)]`.
pub trait Literal: NativeType {
    /// Allowed wire values, in declaration order.
    const VALUES: &'static [&'static str];

    /// Parses one of [`VALUES`](Self::VALUES).
    fn from_literal(value: &str) -> Option<Self>;

    /// Returns the wire value of `self`.
    fn as_literal(&self) -> &'static str;
}

/// Identity and shape of a native type.
#[derive(Clone)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
    shape: Shape,
}

/// How a type may be resolved when no exact converter exists.
#[derive(Clone)]
pub enum Shape {
    /// Resolved by identity only.
    Exact,
    /// A closed set of string values.
    Literal(LiteralShape),
    /// A homogeneous sequence of another native type.
    Sequence(SequenceShape),
}

/// Structural description of a closed value set.
#[derive(Clone, Copy)]
pub struct LiteralShape {
    /// Allowed wire values.
    pub values: &'static [&'static str],
    /// Builds the native value for one of `values`.
    pub parse: fn(&str) -> Option<NativeValue>,
}

/// Structural description of a sequence type.
#[derive(Clone)]
pub struct SequenceShape {
    /// Tag of the element type.
    pub item: Box<TypeTag>,
    /// Assembles converted elements into the sequence type.
    pub collect: fn(Vec<NativeValue>) -> Option<NativeValue>,
}

impl TypeTag {
    /// Tag resolved by exact identity.
    #[must_use]
    pub fn exact<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
            shape: Shape::Exact,
        }
    }

    /// Tag for a [`Literal`] type.
    #[must_use]
    pub fn literal<T: Literal>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
            shape: Shape::Literal(LiteralShape {
                values: T::VALUES,
                parse: parse_literal::<T>,
            }),
        }
    }

    /// Tag for `Vec<T>`.
    #[must_use]
    pub fn sequence<T: NativeType>() -> Self {
        Self {
            id: TypeId::of::<Vec<T>>(),
            name: core::any::type_name::<Vec<T>>(),
            shape: Shape::Sequence(SequenceShape {
                item: Box::new(T::type_tag()),
                collect: collect_vec::<T>,
            }),
        }
    }

    /// Tag of `T`.
    #[must_use]
    pub fn of<T: NativeType>() -> Self {
        T::type_tag()
    }

    /// Runtime identity of the type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Structural shape of the type.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.shape {
            Shape::Exact => "exact",
            Shape::Literal(_) => "literal",
            Shape::Sequence(_) => "sequence",
        };
        f.debug_struct("TypeTag")
            .field("name", &self.name)
            .field("shape", &shape)
            .finish()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

fn parse_literal<T: Literal>(value: &str) -> Option<NativeValue> {
    T::from_literal(value).map(|v| Box::new(v) as NativeValue)
}

fn collect_vec<T: NativeType>(items: Vec<NativeValue>) -> Option<NativeValue> {
    items
        .into_iter()
        .map(|item| item.downcast::<T>().ok().map(|boxed| *boxed))
        .collect::<Option<Vec<T>>>()
        .map(|vec| Box::new(vec) as NativeValue)
}

macro_rules! exact_native {
    ($($ty:ty),* $(,)?) => {
        $(impl NativeType for $ty {})*
    };
}

exact_native!(
    String,
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
);

impl<T: NativeType> NativeType for Vec<T> {
    fn type_tag() -> TypeTag {
        TypeTag::sequence::<T>()
    }
}
