use crate::error::AppError;
use polars::prelude::*;
use serde::Serialize;

/// Cell kind of a column, inferred once when the sheet is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every non-missing cell is a number. Stored as `Int64` when the column
    /// is complete and every value is whole, otherwise as `Float64`.
    Numeric,
    /// Text labels, booleans, or numbers mixed with text. Stored as `String`.
    Categorical,
    /// Dates, times and durations. Stored as rendered text but never summarized.
    Unsupported,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNulls {
    pub column: String,
    pub missing: usize,
    pub present: usize,
}

/// First rows of a selection of columns, rendered as JSON cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// An uploaded worksheet. Immutable once built; every view reads from it.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    kinds: Vec<ColumnKind>,
}

impl Table {
    pub fn new(frame: DataFrame, kinds: Vec<ColumnKind>) -> Result<Self, AppError> {
        if frame.width() != kinds.len() {
            return Err(AppError::DataFrameError(format!(
                "{} columns but {} column kinds",
                frame.width(),
                kinds.len()
            )));
        }
        Ok(Self { frame, kinds })
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn columns_with_kinds(&self) -> Vec<(String, ColumnKind)> {
        self.column_names().into_iter().zip(self.kinds.iter().copied()).collect()
    }

    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns_with_kinds()
            .into_iter()
            .filter(|(_, k)| *k == kind)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn kind_of(&self, name: &str) -> Result<ColumnKind, AppError> {
        let idx = self
            .frame
            .get_column_index(name)
            .ok_or_else(|| AppError::InvalidColumn(name.to_string()))?;
        Ok(self.kinds[idx])
    }

    pub fn column(&self, name: &str) -> Result<&Series, AppError> {
        self.frame
            .column(name)
            .map_err(|_| AppError::InvalidColumn(name.to_string()))
    }

    pub fn null_report(&self) -> Vec<ColumnNulls> {
        let height = self.height();
        self.frame
            .get_columns()
            .iter()
            .map(|series| {
                let missing = series.null_count();
                ColumnNulls {
                    column: series.name().to_string(),
                    missing,
                    present: height - missing,
                }
            })
            .collect()
    }

    pub fn total_missing(&self) -> usize {
        self.frame.get_columns().iter().map(|s| s.null_count()).sum()
    }

    /// First `rows` rows of `columns`, in the order given.
    pub fn preview(&self, columns: &[String], rows: usize) -> Result<RowPreview, AppError> {
        let selected = columns
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let row_count = rows.min(self.height());

        let mut out = Vec::with_capacity(row_count);
        for row_idx in 0..row_count {
            let mut cells = Vec::with_capacity(selected.len());
            for series in &selected {
                cells.push(any_value_to_json(series.get(row_idx)?));
            }
            out.push(cells);
        }

        Ok(RowPreview {
            columns: columns.to_vec(),
            rows: out,
        })
    }

    pub fn preview_all(&self, rows: usize) -> Result<RowPreview, AppError> {
        self.preview(&self.column_names(), rows)
    }
}

pub(crate) fn any_value_to_json(value: AnyValue<'_>) -> serde_json::Value {
    match value {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Float64(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        AnyValue::Int64(v) => serde_json::Value::from(v),
        AnyValue::Boolean(v) => serde_json::Value::Bool(v),
        AnyValue::String(v) => serde_json::Value::String(v.to_string()),
        other => serde_json::Value::String(other.to_string()),
    }
}
