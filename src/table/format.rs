//! Query output formatting.

use duckdb::arrow::array::{Array, ArrayRef, AsArray};
use duckdb::arrow::compute::{cast, lexsort_to_indices, SortColumn, SortOptions};
use duckdb::arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use duckdb::arrow::util::display::array_value_to_string;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

use super::{Table, TableError};

/// Round float columns, then sort.
///
/// Rounding is skipped when `round_decimals` is `None`; sorting is skipped
/// when `sort_by` is empty. Nulls sort last in either direction. Decimal
/// columns are rounded as `Float64` and come back with that type.
pub fn format_query_output(
    table: Table,
    round_decimals: Option<i32>,
    sort_by: &[String],
    ascending: bool,
) -> Result<Table, TableError> {
    let mut table = table;

    if let Some(decimals) = round_decimals {
        for idx in 0..table.num_columns() {
            let column = table.record_batch().column(idx);
            let rounded: ArrayRef = match column.data_type() {
                DataType::Float64 => Arc::new(
                    column
                        .as_primitive::<Float64Type>()
                        .unary::<_, Float64Type>(|v| round_half_even(v, decimals)),
                ),
                DataType::Float32 => Arc::new(
                    column
                        .as_primitive::<Float32Type>()
                        .unary::<_, Float32Type>(|v| round_half_even(f64::from(v), decimals) as f32),
                ),
                DataType::Decimal128(..) | DataType::Decimal256(..) => {
                    let floats = cast(column, &DataType::Float64)?;
                    Arc::new(
                        floats
                            .as_primitive::<Float64Type>()
                            .unary::<_, Float64Type>(|v| round_half_even(v, decimals)),
                    )
                }
                _ => continue,
            };
            table = table.replace_column(idx, rounded)?;
        }
    }

    if !sort_by.is_empty() {
        let sort_columns = sort_by
            .iter()
            .map(|name| {
                let idx = table.index_of(name)?;
                Ok(SortColumn {
                    values: Arc::clone(table.record_batch().column(idx)),
                    options: Some(SortOptions {
                        descending: !ascending,
                        nulls_first: false,
                    }),
                })
            })
            .collect::<Result<Vec<_>, TableError>>()?;
        let indices = lexsort_to_indices(&sort_columns, None)?;
        table = table.take_rows(&indices)?;
    }

    Ok(table)
}

fn round_half_even(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round_ties_even() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Convert a table to one JSON object per row.
///
/// Integers, floats, booleans and strings map to their JSON counterparts;
/// other types use their display form.
pub fn to_json_rows(table: &Table) -> Result<Vec<Map<String, Value>>, TableError> {
    let batch = table.record_batch();
    let names = table.column_names();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let mut object = Map::with_capacity(names.len());
        for (name, column) in names.iter().zip(batch.columns()) {
            object.insert((*name).to_string(), json_value(column, row)?);
        }
        rows.push(object);
    }
    Ok(rows)
}

fn json_value(column: &ArrayRef, row: usize) -> Result<Value, TableError> {
    if column.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match column.data_type() {
        DataType::Boolean => Value::Bool(column.as_boolean().value(row)),
        DataType::Int8 => Value::from(column.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::from(column.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::from(column.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Value::from(column.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::from(column.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => Value::from(column.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => Value::from(column.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => Value::from(column.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => float_value(f64::from(column.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => float_value(column.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(column.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(column.as_string::<i64>().value(row).to_string()),
        _ => Value::String(array_value_to_string(column, row)?),
    };
    Ok(value)
}

// NaN and infinities have no JSON number form.
fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
