//! Minimal columnar collaborators: the sketch consumes records through
//! this surface but never stores keys, only their 64-bit hashes.

use crate::error::SketchError;

/// Declared type of a column's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    UInt32,
    UInt64,
    /// Fixed-width opaque bytes.
    FixedBytes(usize),
    /// Variable-width bytes.  Not sketchable: the key byte width drives
    /// the layer count, so it must be known up front.
    VarBytes,
}

impl ColumnType {
    /// Byte width for fixed-width types, `None` otherwise.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::UInt32 => Some(4),
            ColumnType::UInt64 => Some(8),
            ColumnType::FixedBytes(w) => Some(*w),
            ColumnType::VarBytes => None,
        }
    }
}

/// A named, typed column within a [`Schema`].
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    index: usize,
    ty: ColumnType,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }
}

/// An ordered set of columns.
#[derive(Clone, Debug)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new<S: Into<String>>(columns: Vec<(S, ColumnType)>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(index, (name, ty))| Column {
                name: name.into(),
                index,
                ty,
            })
            .collect();
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Result<&Column, SketchError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SketchError::UnknownColumn(name.to_string()))
    }
}

/// One row of values, byte-string per column, in schema order.
///
/// The record does not carry its schema; callers are expected to build
/// records consistent with the schema they sketch against.
#[derive(Clone, Debug)]
pub struct Record {
    values: Vec<Vec<u8>>,
}

impl Record {
    pub fn new(values: Vec<Vec<u8>>) -> Self {
        Record { values }
    }

    /// The key bytes of the column at `index`.  Empty for out-of-range
    /// indices, so a short record degrades to the empty key rather than
    /// panicking mid-stream.
    pub fn column(&self, index: usize) -> &[u8] {
        self.values.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
