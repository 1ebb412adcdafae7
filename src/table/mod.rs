//! In-memory tables and the cleaning pipeline.
//!
//! Provides:
//! - [`Table`]: an Arrow record batch with unique column names
//! - Input cleaning (normalise, deduplicate, missing values, dtypes)
//! - Output formatting (rounding, sorting, JSON rows)

pub mod clean;
pub mod dtype;
pub mod format;

pub use clean::{
    clean_input_data, convert_dtypes, handle_missing_values, normalise_columns,
    remove_duplicates, CleanOptions, FillValue, MissingStrategy,
};
pub use dtype::{DType, DtypeMap};
pub use format::{format_query_output, to_json_rows};

use duckdb::arrow::array::{Array, ArrayRef, BooleanArray};
use duckdb::arrow::compute::{concat_batches, filter_record_batch, take};
use duckdb::arrow::datatypes::{Field, FieldRef, Schema, SchemaRef};
use duckdb::arrow::error::ArrowError;
use duckdb::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use duckdb::arrow::util::display::array_value_to_string;
use duckdb::arrow::util::pretty::pretty_format_batches;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Error type for table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("fill_value must be provided when strategy is 'fill'")]
    MissingFillValue,

    #[error("Unknown dtype: {0}")]
    UnknownDtype(String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// An ordered set of named, row-aligned columns.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// Build a table from `(name, column)` pairs. Every column is nullable.
    pub fn try_new<N: Into<String>>(columns: Vec<(N, ArrayRef)>) -> Result<Self, TableError> {
        let (fields, arrays): (Vec<FieldRef>, Vec<ArrayRef>) = columns
            .into_iter()
            .map(|(name, array)| {
                let field = Arc::new(Field::new(name, array.data_type().clone(), true));
                (field, array)
            })
            .unzip();
        let num_rows = arrays.first().map_or(0, |a| a.len());
        Self::from_parts(fields, arrays, num_rows)
    }

    /// Wrap a record batch, rejecting duplicate column names.
    pub fn from_batch(batch: RecordBatch) -> Result<Self, TableError> {
        ensure_unique(batch.schema_ref())?;
        Ok(Self { batch })
    }

    /// Concatenate query result batches into one table.
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self, TableError> {
        let batch = concat_batches(&schema, batches)?;
        Self::from_batch(batch)
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    pub(crate) fn from_parts(
        fields: Vec<FieldRef>,
        columns: Vec<ArrayRef>,
        num_rows: usize,
    ) -> Result<Self, TableError> {
        let schema = Arc::new(Schema::new(fields));
        ensure_unique(&schema)?;
        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let batch = RecordBatch::try_new_with_options(schema, columns, &options)?;
        Ok(Self { batch })
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Position of the named column.
    pub fn index_of(&self, name: &str) -> Result<usize, TableError> {
        self.batch
            .schema_ref()
            .index_of(name)
            .map_err(|_| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.index_of(name).ok().map(|idx| self.batch.column(idx))
    }

    /// Display form of a single cell. Nulls render as an empty string.
    pub fn value_string(&self, name: &str, row: usize) -> Result<String, TableError> {
        let idx = self.index_of(name)?;
        Ok(array_value_to_string(self.batch.column(idx), row)?)
    }

    pub fn null_count(&self, name: &str) -> Result<usize, TableError> {
        let idx = self.index_of(name)?;
        Ok(self.batch.column(idx).null_count())
    }

    /// Render the table as an ASCII grid.
    pub fn to_pretty_string(&self) -> Result<String, TableError> {
        Ok(pretty_format_batches(std::slice::from_ref(&self.batch))?.to_string())
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_record_batch(self) -> RecordBatch {
        self.batch
    }

    /// Resolve a list of column names to positions, or all columns if `None`.
    pub(crate) fn resolve_columns(&self, names: Option<&[String]>) -> Result<Vec<usize>, TableError> {
        match names {
            Some(names) => names.iter().map(|n| self.index_of(n)).collect(),
            None => Ok((0..self.num_columns()).collect()),
        }
    }

    /// Keep only rows where `mask` is true.
    pub(crate) fn filter(&self, mask: &BooleanArray) -> Result<Self, TableError> {
        Ok(Self {
            batch: filter_record_batch(&self.batch, mask)?,
        })
    }

    /// Reorder or subset rows by an unsigned integer index array.
    pub(crate) fn take_rows(&self, indices: &dyn Array) -> Result<Self, TableError> {
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|c| take(c.as_ref(), indices, None))
            .collect::<Result<Vec<_>, _>>()?;
        let fields = self.batch.schema_ref().fields().iter().cloned().collect();
        Self::from_parts(fields, columns, indices.len())
    }

    /// Replace the column at `idx`, keeping its name.
    pub(crate) fn replace_column(&self, idx: usize, column: ArrayRef) -> Result<Self, TableError> {
        let schema = self.batch.schema_ref();
        let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
        let mut columns = self.batch.columns().to_vec();
        let name = fields[idx].name().clone();
        fields[idx] = Arc::new(Field::new(name, column.data_type().clone(), true));
        columns[idx] = column;
        Self::from_parts(fields, columns, self.num_rows())
    }
}

fn ensure_unique(schema: &Schema) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(schema.fields().len());
    for field in schema.fields() {
        if !seen.insert(field.name().as_str()) {
            return Err(TableError::DuplicateColumn(field.name().clone()));
        }
    }
    Ok(())
}
