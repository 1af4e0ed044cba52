//! Runtime descriptors for tensor element types.
//!
//! A [`TypeMeta`] is what a type-erased [`Tensor`](crate::Tensor) carries to
//! remember what its bytes mean. Every supported Rust element type maps to a
//! fixed [`TypeTag`]; tag `0` is reserved for "no type yet".

use half::f16;
use std::fmt;

/// Numeric identity of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(pub u16);

impl TypeTag {
    pub const UNDEFINED: TypeTag = TypeTag(0);
    pub const BOOL: TypeTag = TypeTag(1);
    pub const INT8: TypeTag = TypeTag(2);
    pub const INT16: TypeTag = TypeTag(3);
    pub const INT32: TypeTag = TypeTag(4);
    pub const INT64: TypeTag = TypeTag(5);
    pub const UINT8: TypeTag = TypeTag(6);
    pub const UINT16: TypeTag = TypeTag(7);
    pub const UINT32: TypeTag = TypeTag(8);
    pub const UINT64: TypeTag = TypeTag(9);
    pub const FLOAT16: TypeTag = TypeTag(10);
    pub const FLOAT32: TypeTag = TypeTag(11);
    pub const FLOAT64: TypeTag = TypeTag(12);
    pub const STRING: TypeTag = TypeTag(13);
}

/// Byte-string tensor element. Arbitrary bytes, not required to be UTF-8.
pub type ByteString = Vec<u8>;

/// Describes one element type: its tag, a printable name and its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeMeta {
    id: TypeTag,
    name: &'static str,
    itemsize: usize,
}

impl TypeMeta {
    const fn new(id: TypeTag, name: &'static str, itemsize: usize) -> Self {
        Self { id, name, itemsize }
    }

    /// The descriptor of "no type". Its `id()` is [`TypeTag::UNDEFINED`].
    pub const fn undefined() -> Self {
        Self::new(TypeTag::UNDEFINED, "undefined", 0)
    }

    pub fn of<T: Element>() -> Self {
        T::META
    }

    pub fn id(&self) -> TypeTag {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    pub fn is_defined(&self) -> bool {
        self.id != TypeTag::UNDEFINED
    }

    /// True for the variable-length byte-string element kind.
    pub fn is_string(&self) -> bool {
        self.id == TypeTag::STRING
    }

    pub fn matches<T: Element>(&self) -> bool {
        self.id == T::META.id
    }

    /// Looks a descriptor up by tag; unknown tags give [`TypeMeta::undefined`].
    pub fn from_tag(tag: TypeTag) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|meta| meta.id == tag)
            .unwrap_or_else(Self::undefined)
    }

    /// Every defined element type, in tag order.
    pub fn all() -> &'static [TypeMeta] {
        &ALL_TYPES
    }
}

impl Default for TypeMeta {
    fn default() -> Self {
        Self::undefined()
    }
}

impl fmt::Display for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Rust types that can be stored in a tensor.
pub trait Element: Clone + Send + Sync + 'static {
    const META: TypeMeta;
}

/// Fixed-width element types whose storage is plain bytes.
///
/// `bool` is included: it is not `Pod`, but reading it back goes through
/// bytemuck's checked casts, which reject bytes other than 0 and 1.
pub trait PodElement: Element + Copy + bytemuck::NoUninit + bytemuck::CheckedBitPattern {}

macro_rules! pod_elements {
    ($($ty:ty => $tag:ident, $name:literal);* $(;)?) => {
        $(
            impl Element for $ty {
                const META: TypeMeta =
                    TypeMeta::new(TypeTag::$tag, $name, std::mem::size_of::<$ty>());
            }
            impl PodElement for $ty {}
        )*
    };
}

pod_elements! {
    bool => BOOL, "bool";
    i8 => INT8, "int8";
    i16 => INT16, "int16";
    i32 => INT32, "int32";
    i64 => INT64, "int64";
    u8 => UINT8, "uint8";
    u16 => UINT16, "uint16";
    u32 => UINT32, "uint32";
    u64 => UINT64, "uint64";
    f16 => FLOAT16, "float16";
    f32 => FLOAT32, "float";
    f64 => FLOAT64, "double";
}

impl Element for ByteString {
    const META: TypeMeta = TypeMeta::new(
        TypeTag::STRING,
        "string",
        std::mem::size_of::<ByteString>(),
    );
}

static ALL_TYPES: [TypeMeta; 13] = [
    <bool as Element>::META,
    <i8 as Element>::META,
    <i16 as Element>::META,
    <i32 as Element>::META,
    <i64 as Element>::META,
    <u8 as Element>::META,
    <u16 as Element>::META,
    <u32 as Element>::META,
    <u64 as Element>::META,
    <f16 as Element>::META,
    <f32 as Element>::META,
    <f64 as Element>::META,
    <ByteString as Element>::META,
];
