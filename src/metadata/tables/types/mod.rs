//! Generic infrastructure shared by all metadata tables.
//!
//! A table in the `#~` stream is a flat array of fixed-size rows. [`MetadataTable`] is a borrowed,
//! zero-copy view over such an array that decodes rows on demand into a table-specific raw row
//! type implementing [`RowReadable`].
//!
//! Besides positional access, the view supports the key-based lookups the ECMA-335 layout
//! allows for: many tables are sorted by one of their columns (II.22), so a row can be found
//! with a binary search ([`MetadataTable::index_by_primary_key`]) and all rows sharing a key are
//! adjacent ([`MetadataTable::rows_with_key`]).

mod codedindex;
mod tabledata;
mod tableid;
mod tableinfo;

use crate::{file::io::read_le_at_width, Result};
use rayon::iter::{plumbing, IndexedParallelIterator, ParallelIterator};
use std::marker::PhantomData;

pub use codedindex::{CodedIndex, CodedIndexType, CodedIndexTypeIter};
pub use tabledata::{TableAccess, TableData};
pub(crate) use tabledata::impl_table_access;
pub use tableid::{TableId, TableIdIter};
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};

/// Trait implemented by every raw row type.
pub trait RowReadable: Sized + Send {
    /// The table this row type belongs to.
    const TABLE_ID: TableId;

    /// Size of a row in bytes.
    fn row_size(sizes: &TableInfoRef) -> u32;

    /// Decode the row starting at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the row is truncated or contains an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self>;
}

/// A borrowed view over the packed rows of one table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    columns: Vec<(usize, usize)>,
    sizes: TableInfoRef,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a view over `row_count` rows at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the table.
    pub fn new(data: &'a [u8], row_count: u32, sizes: TableInfoRef) -> Result<Self> {
        let row_size = T::row_size(&sizes);

        let mut columns = Vec::new();
        let mut column_offset = 0;
        for width in sizes.column_widths(T::TABLE_ID) {
            columns.push((column_offset, usize::from(width)));
            column_offset += usize::from(width);
        }

        if u64::from(row_count) * u64::from(row_size) > data.len() as u64 {
            return Err(out_of_bounds_error!());
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            columns,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Total size of the table in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }

    /// Size of a single row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Decode the row with the 1-based index `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist or cannot be decoded.
    pub fn get(&self, index: u32) -> Result<T> {
        if index == 0 || self.row_count < index {
            return Err(malformed_error!("Invalid {:?} row {}", T::TABLE_ID, index));
        }

        T::row_read(
            self.data,
            &mut ((index as usize - 1) * self.row_size as usize),
            index,
            &self.sizes,
        )
        .map_err(|error| malformed_error!("Unreadable {:?} row {}: {}", T::TABLE_ID, index, error))
    }

    /// Read a single column of row `rid` as a raw integer. `column` is 0-based.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an invalid row or column.
    pub fn value(&self, rid: u32, column: usize) -> Result<u32> {
        if rid == 0 || rid > self.row_count {
            return Err(out_of_bounds_error!());
        }

        let Some((column_offset, width)) = self.columns.get(column) else {
            return Err(out_of_bounds_error!());
        };

        let mut offset = (rid as usize - 1) * self.row_size as usize + column_offset;
        read_le_at_width(self.data, &mut offset, *width)
    }

    /// Binary search for the first row whose key (`key_width` bytes at byte `key_offset` within
    /// the row) equals `key`. The table must be sorted by that key.
    ///
    /// Returns the 1-based row index, or 0 if no row carries the key.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the key lies outside the row data.
    pub fn index_by_primary_key(&self, key: u32, key_width: usize, key_offset: usize) -> Result<u32> {
        if self.row_count == 0 {
            return Ok(0);
        }

        let mut left = 0_u32;
        let mut right = self.row_count - 1;
        while left < right {
            let mid = left + (right - left) / 2;
            if self.key_at(mid, key_width, key_offset)? < key {
                left = mid + 1;
            } else {
                right = mid;
            }
        }

        if self.key_at(left, key_width, key_offset)? == key {
            Ok(left + 1)
        } else {
            Ok(0)
        }
    }

    /// Returns true if row `rid` exists and its first column equals `key`.
    #[must_use]
    pub fn has_next(&self, rid: u32, key: u32, key_width: usize) -> bool {
        if rid == 0 || rid > self.row_count {
            return false;
        }

        matches!(self.key_at(rid - 1, key_width, 0), Ok(value) if value == key)
    }

    /// Iterate the 1-based indices of all rows whose first column equals `key`, for tables sorted
    /// by their first column.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the key column lies outside the row data.
    pub fn rows_with_key(&self, key: u32, key_width: usize) -> Result<RowKeyIterator<'_, 'a, T>> {
        let first = self.index_by_primary_key(key, key_width, 0)?;
        Ok(RowKeyIterator {
            table: self,
            key,
            key_width,
            next: first,
        })
    }

    /// Iterate the rows `first..=last`. An empty range (`last < first`) yields nothing.
    #[must_use]
    pub fn range(&self, first: u32, last: u32) -> TableRangeIterator<'_, 'a, T> {
        TableRangeIterator {
            table: self,
            next: first,
            last,
        }
    }

    /// Sequential iterator over all rows.
    #[must_use]
    pub fn iter(&'a self) -> TableIterator<'a, T> {
        TableIterator {
            table: self,
            current_row: 0,
            current_offset: 0,
        }
    }

    /// Parallel iterator over all rows.
    #[must_use]
    pub fn par_iter(&'a self) -> TableParIterator<'a, T> {
        TableParIterator {
            table: self,
            range: 0..self.row_count,
        }
    }

    fn key_at(&self, position: u32, key_width: usize, key_offset: usize) -> Result<u32> {
        let mut offset = position as usize * self.row_size as usize + key_offset;
        read_le_at_width(self.data, &mut offset, key_width)
    }
}

impl<'a, T: RowReadable> IntoIterator for &'a MetadataTable<'a, T> {
    type Item = Result<T>;
    type IntoIter = TableIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sequential iterator over the rows of a [`MetadataTable`].
pub struct TableIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    current_row: u32,
    current_offset: usize,
}

impl<'a, T: RowReadable> Iterator for TableIterator<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.table.row_count {
            return None;
        }

        let rid = self.current_row + 1;
        match T::row_read(self.table.data, &mut self.current_offset, rid, &self.table.sizes) {
            Ok(row) => {
                self.current_row = rid;
                Some(Ok(row))
            }
            Err(error) => {
                // no row after an unreadable one can be located
                self.current_row = self.table.row_count;
                Some(Err(malformed_error!(
                    "Unreadable {:?} row {}: {}",
                    T::TABLE_ID,
                    rid,
                    error
                )))
            }
        }
    }
}

/// Iterator over a contiguous, inclusive range of rows.
pub struct TableRangeIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    next: u32,
    last: u32,
}

impl<T: RowReadable> Iterator for TableRangeIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }

        let row = self.table.get(self.next);
        self.next = if row.is_ok() { self.next + 1 } else { self.last + 1 };
        Some(row)
    }
}

/// Iterator over the indices of adjacent rows sharing a key in their first column.
pub struct RowKeyIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    key: u32,
    key_width: usize,
    next: u32,
}

impl<T: RowReadable> Iterator for RowKeyIterator<'_, '_, T> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.table.has_next(self.next, self.key, self.key_width) {
            return None;
        }

        let rid = self.next;
        self.next += 1;
        Some(rid)
    }
}

/// Parallel iterator over the rows of a [`MetadataTable`].
pub struct TableParIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<'a, T: RowReadable + Send + Sync> ParallelIterator for TableParIterator<'a, T> {
    type Item = Result<T>;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: rayon::iter::plumbing::UnindexedConsumer<Self::Item>,
    {
        plumbing::bridge(self, consumer)
    }
}

impl<'a, T: RowReadable + Send + Sync> IndexedParallelIterator for TableParIterator<'a, T> {
    fn len(&self) -> usize {
        self.range.len()
    }

    fn drive<C>(self, consumer: C) -> C::Result
    where
        C: rayon::iter::plumbing::Consumer<Self::Item>,
    {
        plumbing::bridge(self, consumer)
    }

    fn with_producer<CB>(self, callback: CB) -> CB::Output
    where
        CB: rayon::iter::plumbing::ProducerCallback<Self::Item>,
    {
        callback.callback(TableProducer {
            table: self.table,
            range: self.range,
        })
    }
}

struct TableProducer<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<'a, T: RowReadable + Send + Sync> rayon::iter::plumbing::Producer for TableProducer<'a, T> {
    type Item = Result<T>;
    type IntoIter = TableProducerIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        TableProducerIterator {
            table: self.table,
            range: self.range,
        }
    }

    fn split_at(self, index: usize) -> (Self, Self) {
        // Row positions always fit in u32
        #[allow(clippy::cast_possible_truncation)]
        let mid = self.range.start + index as u32;
        let left = TableProducer {
            table: self.table,
            range: self.range.start..mid,
        };
        let right = TableProducer {
            table: self.table,
            range: mid..self.range.end,
        };
        (left, right)
    }
}

struct TableProducerIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<'a, T: RowReadable + Send + Sync> Iterator for TableProducerIterator<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.range.start >= self.range.end {
            return None;
        }

        let row_index = self.range.start;
        self.range.start += 1;

        // +1 because row indices start at 1
        Some(self.table.get(row_index + 1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.range.len();
        (len, Some(len))
    }
}

impl<'a, T: RowReadable + Send + Sync> ExactSizeIterator for TableProducerIterator<'a, T> {}

impl<'a, T: RowReadable + Send + Sync> DoubleEndedIterator for TableProducerIterator<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.range.start >= self.range.end {
            return None;
        }

        self.range.end -= 1;

        Some(self.table.get(self.range.end + 1))
    }
}
