/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field storage for FIX messages.
//!
//! This module provides:
//! - [`Field`]: a single tag=value pair with an owned value
//! - [`FieldMap`]: an insertion-ordered collection of fields
//!
//! Fields are stored in insertion order so that a parsed message remembers
//! its wire layout, while equality is order-insensitive so the round-trip
//! law (`parse(serialize(m)) == m`) holds regardless of canonical reordering
//! at serialization time.

use crate::error::DecodeError;
use bytes::Bytes;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// A single FIX field: tag number plus owned value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field tag number.
    pub tag: u32,
    /// The field value, without delimiters.
    pub value: Bytes,
}

impl Field {
    /// Creates a new field.
    ///
    /// # Arguments
    /// * `tag` - The field tag number
    /// * `value` - The value bytes
    #[must_use]
    pub fn new(tag: u32, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Returns the value as a string slice.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidUtf8` if the value is not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, DecodeError> {
        std::str::from_utf8(&self.value).map_err(DecodeError::from)
    }

    /// Parses the value as the specified type.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidValue` if parsing fails.
    pub fn parse<T: FromStr>(&self) -> Result<T, DecodeError> {
        let s = self.as_str()?;
        s.parse().map_err(|_| DecodeError::InvalidValue {
            tag: self.tag,
            reason: format!("failed to parse '{}' as {}", s, std::any::type_name::<T>()),
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.tag, String::from_utf8_lossy(&self.value))
    }
}

/// Insertion-ordered collection of FIX fields.
///
/// Lookups return the first field with a matching tag. Duplicate tags are
/// permitted (repeating groups store their entries flat, in wire order).
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: SmallVec<[Field; 16]>,
}

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: SmallVec::new(),
        }
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the map holds no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if a field with the given tag is present.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.fields.iter().any(|f| f.tag == tag)
    }

    /// Returns the first field with the given tag.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Returns the first value for the given tag as raw bytes.
    #[must_use]
    pub fn get_bytes(&self, tag: u32) -> Option<&[u8]> {
        self.get(tag).map(|f| f.value.as_ref())
    }

    /// Returns the first value for the given tag as a string slice.
    #[must_use]
    pub fn get_str(&self, tag: u32) -> Option<&str> {
        self.get(tag).and_then(|f| f.as_str().ok())
    }

    /// Returns the first value for the given tag parsed as `T`.
    ///
    /// # Errors
    /// Returns `DecodeError::MissingField` if the tag is absent, or
    /// `DecodeError::InvalidValue` if the value fails to parse.
    pub fn get_parsed<T: FromStr>(&self, tag: u32) -> Result<T, DecodeError> {
        self.get(tag)
            .ok_or(DecodeError::MissingField { tag })?
            .parse()
    }

    /// Returns the first value for the given tag as a FIX boolean (Y/N).
    ///
    /// Absent tags and values other than `Y` read as false.
    #[must_use]
    pub fn get_flag(&self, tag: u32) -> bool {
        matches!(self.get_bytes(tag), Some(b"Y"))
    }

    /// Sets a field, replacing the first occurrence in place or appending.
    ///
    /// # Arguments
    /// * `tag` - The field tag number
    /// * `value` - The value bytes
    pub fn set(&mut self, tag: u32, value: impl Into<Bytes>) {
        let value = value.into();
        if let Some(existing) = self.fields.iter_mut().find(|f| f.tag == tag) {
            existing.value = value;
        } else {
            self.fields.push(Field { tag, value });
        }
    }

    /// Sets a field from a string value.
    pub fn set_str(&mut self, tag: u32, value: &str) {
        self.set(tag, Bytes::copy_from_slice(value.as_bytes()));
    }

    /// Sets a field from an unsigned integer value.
    pub fn set_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a field from a signed integer value.
    pub fn set_int(&mut self, tag: u32, value: i64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a field from a FIX boolean (Y/N).
    pub fn set_flag(&mut self, tag: u32, value: bool) {
        self.set(tag, Bytes::from_static(if value { b"Y" } else { b"N" }));
    }

    /// Appends a field without checking for an existing tag.
    ///
    /// Used by the decoder (wire order is authoritative) and by repeating
    /// group writers.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Removes all fields with the given tag, returning the first removed
    /// value if any.
    pub fn remove(&mut self, tag: u32) -> Option<Bytes> {
        let first = self
            .fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.clone());
        self.fields.retain(|f| f.tag != tag);
        first
    }

    /// Removes every field from the map.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the fields sorted ascending by tag (stable, so duplicate
    /// tags keep their relative order). Used for canonical serialization.
    #[must_use]
    pub fn sorted_by_tag(&self) -> Vec<&Field> {
        let mut sorted: Vec<&Field> = self.fields.iter().collect();
        sorted.sort_by_key(|f| f.tag);
        sorted
    }
}

impl PartialEq for FieldMap {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.sorted_by_tag()
            .iter()
            .zip(other.sorted_by_tag())
            .all(|(a, b)| **a == *b)
    }
}

impl Eq for FieldMap {}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
