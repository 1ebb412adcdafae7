//! Column type tags used by the dtype conversion step.

use duckdb::arrow::datatypes::{DataType, TimeUnit};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::TableError;

/// Target type for a column conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DType {
    Int64,
    Int32,
    Float64,
    Float32,
    Utf8,
    Boolean,
    Date,
    DateTime,
}

impl DType {
    /// Arrow type a column is cast to.
    pub fn arrow_type(self) -> DataType {
        match self {
            Self::Int64 => DataType::Int64,
            Self::Int32 => DataType::Int32,
            Self::Float64 => DataType::Float64,
            Self::Float32 => DataType::Float32,
            Self::Utf8 => DataType::Utf8,
            Self::Boolean => DataType::Boolean,
            Self::Date => DataType::Date32,
            Self::DateTime => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

impl FromStr for DType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int64" | "int" | "integer" | "bigint" | "long" => Ok(Self::Int64),
            "int32" | "int4" => Ok(Self::Int32),
            "float64" | "float" | "double" | "f64" => Ok(Self::Float64),
            "float32" | "real" | "f32" => Ok(Self::Float32),
            "string" | "str" | "utf8" | "varchar" | "text" => Ok(Self::Utf8),
            "bool" | "boolean" => Ok(Self::Boolean),
            "date" | "date32" => Ok(Self::Date),
            "datetime" | "datetime64" | "datetime64[ns]" | "datetime64[us]" | "timestamp" => {
                Ok(Self::DateTime)
            }
            _ => Err(TableError::UnknownDtype(s.to_string())),
        }
    }
}

impl TryFrom<String> for DType {
    type Error = TableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "int64",
            Self::Int32 => "int32",
            Self::Float64 => "float64",
            Self::Float32 => "float32",
            Self::Utf8 => "string",
            Self::Boolean => "bool",
            Self::Date => "date",
            Self::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// Ordered mapping of column name to target type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, DType>")]
pub struct DtypeMap {
    entries: Vec<(String, DType)>,
}

impl DtypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the target type for `column`.
    pub fn insert(&mut self, column: impl Into<String>, dtype: DType) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = dtype,
            None => self.entries.push((column, dtype)),
        }
    }

    /// Build a map from `(column, tag)` pairs, rejecting unknown tags.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (column, tag) in pairs {
            map.insert(column, tag.as_ref().parse()?);
        }
        Ok(map)
    }

    pub fn get(&self, column: &str) -> Option<DType> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, dtype)| *dtype)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DType)> {
        self.entries.iter().map(|(name, dtype)| (name.as_str(), *dtype))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DType)> for DtypeMap {
    fn from_iter<T: IntoIterator<Item = (String, DType)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (column, dtype) in iter {
            map.insert(column, dtype);
        }
        map
    }
}

impl From<BTreeMap<String, DType>> for DtypeMap {
    fn from(value: BTreeMap<String, DType>) -> Self {
        value.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_tags_parse() {
        assert_eq!("int64".parse::<DType>().unwrap(), DType::Int64);
        assert_eq!("string".parse::<DType>().unwrap(), DType::Utf8);
        assert_eq!("datetime64[ns]".parse::<DType>().unwrap(), DType::DateTime);
        assert_eq!("Float64".parse::<DType>().unwrap(), DType::Float64);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = DtypeMap::parse([("A", "int64"), ("B", "complex128")]).unwrap_err();
        assert!(matches!(err, TableError::UnknownDtype(tag) if tag == "complex128"));
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut map = DtypeMap::new();
        map.insert("A", DType::Int64);
        map.insert("B", DType::Utf8);
        map.insert("A", DType::Float64);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("A"), Some(DType::Float64));
        let order: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_deserialize_from_json() {
        let map: DtypeMap =
            serde_json::from_str(r#"{"USER_ID": "int64", "EVENT_TIME": "datetime64"}"#).unwrap();
        assert_eq!(map.get("USER_ID"), Some(DType::Int64));
        assert_eq!(map.get("EVENT_TIME"), Some(DType::DateTime));
        assert!(serde_json::from_str::<DtypeMap>(r#"{"X": "nope"}"#).is_err());
    }
}
