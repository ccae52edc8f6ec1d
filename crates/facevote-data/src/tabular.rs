//! Typed CSV reading and writing.

use crate::error::DataError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read every row of `path` into `T`, matching columns by header.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataError> {
    let csv_err = |source| DataError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader.deserialize().collect::<Result<Vec<T>, _>>().map_err(csv_err)
}

/// Write `rows` to `path`, creating parent directories.
///
/// An empty slice still produces a file; it carries no header because the
/// header comes from the first serialized row.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), DataError> {
    ensure_parent(path)?;
    let csv_err = |source| DataError::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DataError::Io { path: path.to_path_buf(), source })
}

/// Write pre-formatted rows under one or more header lines.
pub fn write_rows(path: &Path, headers: &[Vec<String>], rows: &[Vec<String>]) -> Result<(), DataError> {
    ensure_parent(path)?;
    let csv_err = |source| DataError::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    for record in headers.iter().chain(rows) {
        writer.write_record(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DataError::Io { path: path.to_path_buf(), source })
}

/// Cell text for an optional number; missing values are empty cells.
pub fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn ensure_parent(path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| DataError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Round to four decimal places, the precision of every published table.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Serde helpers for `T`/`F` flag columns.
pub mod tf_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "T" } else { "F" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "T" => Ok(true),
            "F" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected T or F, got {other:?}"))),
        }
    }
}
