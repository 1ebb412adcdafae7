//! Input cleaning pipeline.
//!
//! Applied to freshly loaded CSV data in a fixed order:
//! normalise columns, deduplicate, handle missing values, convert dtypes.

use duckdb::arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, Scalar, StringArray, UInt32Array,
    UInt64Array,
};
use duckdb::arrow::compute::kernels::zip::zip;
use duckdb::arrow::compute::{
    and, cast, cast_with_options, is_not_null, is_null, take, CastOptions,
};
use duckdb::arrow::datatypes::{DataType, Field, FieldRef};
use duckdb::arrow::error::ArrowError;
use duckdb::arrow::row::{RowConverter, SortField};
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::dtype::{DType, DtypeMap};
use super::{Table, TableError};

/// Casting that reports unconvertible values instead of nulling them.
fn strict_cast() -> CastOptions<'static> {
    CastOptions {
        safe: false,
        ..Default::default()
    }
}

/// How rows with missing values are treated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MissingStrategy {
    /// Remove rows with a null in any selected column.
    Drop,
    /// Replace nulls with a fill value.
    Fill,
    /// Any other strategy name. Leaves the table unchanged.
    Other(String),
}

impl MissingStrategy {
    /// True for an empty strategy name, which disables the step in the pipeline.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Other(name) if name.trim().is_empty())
    }
}

impl From<&str> for MissingStrategy {
    fn from(value: &str) -> Self {
        match value {
            "drop" => Self::Drop,
            "fill" => Self::Fill,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MissingStrategy {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Value used to fill nulls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FillValue {
    fn to_array(&self) -> ArrayRef {
        match self {
            Self::Bool(v) => Arc::new(BooleanArray::from(vec![*v])),
            Self::Int(v) => Arc::new(Int64Array::from(vec![*v])),
            Self::Float(v) => Arc::new(Float64Array::from(vec![*v])),
            Self::Str(v) => Arc::new(StringArray::from(vec![v.as_str()])),
        }
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Settings for [`clean_input_data`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    pub uppercase_columns: bool,
    pub remove_duplicates: bool,
    /// `None` skips the missing-value step.
    pub handle_missing: Option<MissingStrategy>,
    /// Only consulted when `handle_missing` is `Fill`.
    pub fill_value: Option<FillValue>,
    /// `None` skips the dtype step.
    pub convert_dtypes: Option<DtypeMap>,
}

impl CleanOptions {
    /// Pipeline with every step disabled.
    pub fn none() -> Self {
        Self {
            uppercase_columns: false,
            remove_duplicates: false,
            handle_missing: None,
            fill_value: None,
            convert_dtypes: None,
        }
    }

    /// Column types of the transactions event feed.
    pub fn transactions_dtypes() -> DtypeMap {
        [
            ("USER_ID", DType::Int64),
            ("EVENT_NAME", DType::Utf8),
            ("PLATFORM", DType::Utf8),
            ("EXPERIENCE", DType::Utf8),
            ("EVENT_TIME", DType::DateTime),
        ]
        .into_iter()
        .map(|(name, dtype)| (name.to_string(), dtype))
        .collect()
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            uppercase_columns: true,
            remove_duplicates: true,
            handle_missing: Some(MissingStrategy::Drop),
            fill_value: None,
            convert_dtypes: Some(Self::transactions_dtypes()),
        }
    }
}

/// Rename every column to its upper- or lowercase form.
///
/// Names that collide after folding are not reported: the later column's
/// data replaces the earlier one in the earlier column's position.
pub fn normalise_columns(table: Table, uppercase: bool) -> Result<Table, TableError> {
    let batch = table.record_batch();
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.num_columns());
    let mut fields: Vec<FieldRef> = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in batch.schema_ref().fields().iter().zip(batch.columns()) {
        let name = if uppercase {
            field.name().to_uppercase()
        } else {
            field.name().to_lowercase()
        };
        let renamed: FieldRef = Arc::new(Field::new(
            name.clone(),
            field.data_type().clone(),
            field.is_nullable(),
        ));
        match positions.entry(name) {
            Entry::Occupied(slot) => {
                let idx = *slot.get();
                fields[idx] = renamed;
                columns[idx] = Arc::clone(column);
            }
            Entry::Vacant(slot) => {
                slot.insert(fields.len());
                fields.push(renamed);
                columns.push(Arc::clone(column));
            }
        }
    }

    tracing::debug!(
        columns = fields.len(),
        case = if uppercase { "uppercase" } else { "lowercase" },
        "Normalised column names"
    );
    Table::from_parts(fields, columns, table.num_rows())
}

/// Remove repeated rows, keeping the first occurrence.
///
/// Rows are compared across `subset` (all columns when `None`). Nulls compare
/// equal to each other.
pub fn remove_duplicates(table: Table, subset: Option<&[String]>) -> Result<Table, TableError> {
    let selected = table.resolve_columns(subset)?;
    if selected.is_empty() || table.num_rows() == 0 {
        return Ok(table);
    }

    let batch = table.record_batch();
    let keys: Vec<ArrayRef> = selected.iter().map(|&idx| Arc::clone(batch.column(idx))).collect();
    let converter = RowConverter::new(
        keys.iter()
            .map(|k| SortField::new(k.data_type().clone()))
            .collect(),
    )?;
    let rows = converter.convert_columns(&keys)?;

    let mut seen = HashSet::with_capacity(rows.num_rows());
    let keep: Vec<u64> = (0..rows.num_rows())
        .zip(0_u64..)
        .filter(|&(i, _)| seen.insert(rows.row(i)))
        .map(|(_, idx)| idx)
        .collect();

    let removed = table.num_rows() - keep.len();
    if removed == 0 {
        return Ok(table);
    }
    tracing::info!(removed, "Removed duplicate rows");
    table.take_rows(&UInt64Array::from(keep))
}

/// Drop or fill missing values in the selected columns (all when `None`).
pub fn handle_missing_values(
    table: Table,
    strategy: &MissingStrategy,
    fill_value: Option<&FillValue>,
    columns: Option<&[String]>,
) -> Result<Table, TableError> {
    match strategy {
        MissingStrategy::Drop => drop_missing(table, columns),
        MissingStrategy::Fill => {
            let value = fill_value.ok_or(TableError::MissingFillValue)?;
            fill_missing(table, value, columns)
        }
        MissingStrategy::Other(_) => Ok(table),
    }
}

fn drop_missing(table: Table, columns: Option<&[String]>) -> Result<Table, TableError> {
    let selected = table.resolve_columns(columns)?;
    let batch = table.record_batch();

    let mut mask: Option<BooleanArray> = None;
    for idx in selected {
        let column = batch.column(idx);
        if column.null_count() == 0 {
            continue;
        }
        let present = is_not_null(column.as_ref())?;
        mask = Some(match mask {
            Some(acc) => and(&acc, &present)?,
            None => present,
        });
    }

    let Some(mask) = mask else {
        return Ok(table);
    };
    let filtered = table.filter(&mask)?;
    let dropped = table.num_rows() - filtered.num_rows();
    if dropped > 0 {
        tracing::info!(dropped, "Dropped rows with missing values");
    }
    Ok(filtered)
}

fn fill_missing(
    table: Table,
    value: &FillValue,
    columns: Option<&[String]>,
) -> Result<Table, TableError> {
    let selected = table.resolve_columns(columns)?;
    let replacement = value.to_array();
    let mut table = table;

    for idx in selected {
        let column = Arc::clone(table.record_batch().column(idx));
        if column.null_count() == 0 {
            continue;
        }
        let filled = if column.data_type() == &DataType::Null {
            // An all-null column takes the fill value's type.
            let indices = UInt32Array::from(vec![0u32; column.len()]);
            take(replacement.as_ref(), &indices, None)?
        } else {
            let fill = cast_with_options(&replacement, column.data_type(), &strict_cast())?;
            zip(&is_null(column.as_ref())?, &Scalar::new(fill), &column)?
        };
        table = table.replace_column(idx, filled)?;
    }

    tracing::debug!(fill_value = %value, "Filled missing values");
    Ok(table)
}

/// Cast columns named in `dtype_map`.
///
/// Columns absent from the table are skipped. A column whose conversion
/// fails is logged and left unchanged.
pub fn convert_dtypes(table: Table, dtype_map: &DtypeMap) -> Result<Table, TableError> {
    let mut table = table;
    for (name, dtype) in dtype_map.iter() {
        let Ok(idx) = table.index_of(name) else {
            continue;
        };
        let column = table.record_batch().column(idx);
        let converted = if dtype.is_temporal() {
            parse_temporal(column, dtype)
        } else {
            cast_with_options(column, &dtype.arrow_type(), &strict_cast())
        };
        match converted {
            Ok(array) => {
                table = table.replace_column(idx, array)?;
                tracing::debug!(column = name, dtype = %dtype, "Converted column");
            }
            Err(err) => {
                tracing::warn!(column = name, dtype = %dtype, error = %err, "Could not convert column");
            }
        }
    }
    Ok(table)
}

/// Parse text as dates or timestamps. Temporal columns are re-unit cast.
fn parse_temporal(column: &ArrayRef, dtype: DType) -> Result<ArrayRef, ArrowError> {
    let target = dtype.arrow_type();
    match column.data_type() {
        DataType::LargeUtf8 | DataType::Utf8View => {
            let text = cast(column, &DataType::Utf8)?;
            cast_with_options(&text, &target, &strict_cast())
        }
        _ => cast_with_options(column, &target, &strict_cast()),
    }
}

/// Run the cleaning pipeline described by `options`.
pub fn clean_input_data(table: Table, options: &CleanOptions) -> Result<Table, TableError> {
    tracing::info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Cleaning input data"
    );
    let mut table = table;

    if options.uppercase_columns {
        table = normalise_columns(table, true)?;
    }

    if options.remove_duplicates {
        table = remove_duplicates(table, None)?;
    }

    if let Some(strategy) = options.handle_missing.as_ref().filter(|s| !s.is_blank()) {
        table = handle_missing_values(table, strategy, options.fill_value.as_ref(), None)?;
    }

    if let Some(dtype_map) = options.convert_dtypes.as_ref().filter(|m| !m.is_empty()) {
        table = convert_dtypes(table, dtype_map)?;
    }

    tracing::info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Cleaned data"
    );
    Ok(table)
}
