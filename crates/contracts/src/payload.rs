//! Payload shapes carried by a port
//!
//! A port is generic over one `PortTraits` implementation, which fixes the
//! buffer type and how the buffer is counted for statistics. Buffers are
//! reference counted so the producer and every local consumer share one copy.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Port payload family
pub trait PortTraits: Send + Sync + 'static {
    /// Shared buffer handed to transports
    type Buffer: Clone + Debug + Default + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Interface repository id of the port type
    const REPID: &'static str;

    /// Storage size of one element, used for bit rates
    const BITS_PER_ELEMENT: usize;

    /// Number of elements a buffer counts as in statistics
    fn element_count(buffer: &Self::Buffer) -> usize;

    fn is_empty(buffer: &Self::Buffer) -> bool;
}

/// Numeric sample element
pub trait Sample:
    Copy + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const REPID: &'static str;
}

macro_rules! impl_sample {
    ($($ty:ty => $repid:literal),* $(,)?) => {
        $(
            impl Sample for $ty {
                const REPID: &'static str = $repid;
            }
        )*
    };
}

impl_sample!(
    i8 => "IDL:BULKIO/dataChar:1.0",
    u8 => "IDL:BULKIO/dataOctet:1.0",
    i16 => "IDL:BULKIO/dataShort:1.0",
    u16 => "IDL:BULKIO/dataUshort:1.0",
    i32 => "IDL:BULKIO/dataLong:1.0",
    u32 => "IDL:BULKIO/dataUlong:1.0",
    i64 => "IDL:BULKIO/dataLongLong:1.0",
    u64 => "IDL:BULKIO/dataUlongLong:1.0",
    f32 => "IDL:BULKIO/dataFloat:1.0",
    f64 => "IDL:BULKIO/dataDouble:1.0",
);

/// Immutable, reference-counted sample buffer.
///
/// Cloning shares the allocation; lifetime is that of the longest holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedBuffer<T>(Arc<[T]>);

impl<T> SharedBuffer<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// True when both handles share one allocation
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> SharedBuffer<T> {
    /// Copy a borrowed slice into a new shared buffer
    pub fn copy_from_slice(data: &[T]) -> Self {
        Self(Arc::from(data))
    }
}

impl<T> Default for SharedBuffer<T> {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl<T> Deref for SharedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for SharedBuffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self(Arc::from(data))
    }
}

impl<T> From<Arc<[T]>> for SharedBuffer<T> {
    fn from(data: Arc<[T]>) -> Self {
        Self(data)
    }
}

impl<T: Clone, const N: usize> From<[T; N]> for SharedBuffer<T> {
    fn from(data: [T; N]) -> Self {
        Self(Arc::from(data.to_vec()))
    }
}

/// Immutable, reference-counted text (file URLs, XML documents)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedText(Arc<str>);

impl SharedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SharedText {
    fn default() -> Self {
        Self(Arc::from(""))
    }
}

impl Deref for SharedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedText {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SharedText {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Bulk numeric samples of element type `T`
pub struct SampleTraits<T>(PhantomData<fn() -> T>);

impl<T: Sample> PortTraits for SampleTraits<T> {
    type Buffer = SharedBuffer<T>;

    const REPID: &'static str = T::REPID;
    const BITS_PER_ELEMENT: usize = std::mem::size_of::<T>() * 8;

    fn element_count(buffer: &SharedBuffer<T>) -> usize {
        buffer.len()
    }

    fn is_empty(buffer: &SharedBuffer<T>) -> bool {
        buffer.is_empty()
    }
}

/// File URL payloads
pub struct FileTraits;

impl PortTraits for FileTraits {
    type Buffer = SharedText;

    const REPID: &'static str = "IDL:BULKIO/dataFile:1.0";
    const BITS_PER_ELEMENT: usize = 8;

    // The whole URL counts as a single element
    fn element_count(_buffer: &SharedText) -> usize {
        1
    }

    fn is_empty(buffer: &SharedText) -> bool {
        buffer.is_empty()
    }
}

/// XML document payloads
pub struct XmlTraits;

impl PortTraits for XmlTraits {
    type Buffer = SharedText;

    const REPID: &'static str = "IDL:BULKIO/dataXML:1.0";
    const BITS_PER_ELEMENT: usize = 8;

    fn element_count(buffer: &SharedText) -> usize {
        buffer.len()
    }

    fn is_empty(buffer: &SharedText) -> bool {
        buffer.is_empty()
    }
}

pub type CharTraits = SampleTraits<i8>;
pub type OctetTraits = SampleTraits<u8>;
pub type ShortTraits = SampleTraits<i16>;
pub type UShortTraits = SampleTraits<u16>;
pub type LongTraits = SampleTraits<i32>;
pub type ULongTraits = SampleTraits<u32>;
pub type LongLongTraits = SampleTraits<i64>;
pub type ULongLongTraits = SampleTraits<u64>;
pub type FloatTraits = SampleTraits<f32>;
pub type DoubleTraits = SampleTraits<f64>;
