use super::types::{ColumnKind, Table};
use super::utils::*;
use std::collections::HashSet;
use std::io::Cursor;
use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use crate::error::AppError;
use polars::prelude::*;

/// A worksheet parsed into a [`Table`], plus the names of every sheet in the workbook.
#[derive(Debug)]
pub struct LoadedSheet {
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub table: Table,
}

pub struct ExcelLoader {
    max_file_size: usize,
}

impl ExcelLoader {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    /// Parses `file_data` and builds a table from `sheet`, or from the first
    /// worksheet when no sheet is requested.
    pub fn load(&self, file_data: Bytes, sheet: Option<&str>) -> Result<LoadedSheet, AppError> {
        let start = std::time::Instant::now();
        if file_data.is_empty() {
            return Err(AppError::MissingUpload);
        }
        if file_data.len() > self.max_file_size {
            return Err(AppError::PayloadTooLarge {
                size: file_data.len(),
                limit: self.max_file_size,
            });
        }

        tracing::info!("Opening workbook ({}KB)", file_data.len() / 1024);
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(file_data))
            .map_err(|e| {
                tracing::error!("Failed to open Excel file: {}", e);
                AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
            })?;

        let sheet_names = workbook.sheet_names().to_vec();
        tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

        let sheet_name = match sheet {
            Some(requested) => sheet_names
                .iter()
                .find(|name| name.as_str() == requested)
                .cloned()
                .ok_or_else(|| AppError::InvalidInput(format!("Worksheet '{}' not found", requested)))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
            AppError::FileProcessingError(format!("Failed to read worksheet '{}': {}", sheet_name, e))
        })?;
        let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
        if rows.is_empty() {
            tracing::warn!("Sheet {} is empty", sheet_name);
            return Err(AppError::FileProcessingError(format!("Worksheet '{}' is empty", sheet_name)));
        }

        let table = build_table(&rows)?;
        tracing::info!(
            "Loaded sheet {} as {} rows x {} columns in {:?}",
            sheet_name,
            table.height(),
            table.width(),
            start.elapsed()
        );

        Ok(LoadedSheet {
            sheet_names,
            sheet_name,
            table,
        })
    }
}

/// Builds a table from raw sheet rows. The first row holds the headers.
pub fn build_table(rows: &[Vec<Data>]) -> Result<Table, AppError> {
    let header_row = rows
        .first()
        .filter(|row| !row.is_empty())
        .ok_or_else(|| AppError::FileProcessingError("Missing header row".to_string()))?;

    let mut existing_names = HashSet::new();
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| unique_column_name(cell, idx, &mut existing_names))
        .collect();

    let mut columns = Vec::with_capacity(headers.len());
    let mut kinds = Vec::with_capacity(headers.len());

    for (col_idx, header) in headers.iter().enumerate() {
        let values: Vec<Data> = rows.iter()
            .skip(1) // Skip header row
            .map(|row| row.get(col_idx).cloned().unwrap_or(Data::Empty))
            .collect();

        let kind = detect_column_kind(&values);
        tracing::debug!("Column {} inferred as {}", header, kind);

        let series = match kind {
            ColumnKind::Numeric if is_whole_number_column(&values) => {
                let nums: Vec<Option<i64>> = values.iter().map(cell_to_i64).collect();
                Series::new(header, nums)
            }
            ColumnKind::Numeric => {
                let nums: Vec<Option<f64>> = values.iter().map(cell_to_f64).collect();
                Series::new(header, nums)
            }
            ColumnKind::Categorical | ColumnKind::Unsupported => {
                let strings: Vec<Option<String>> = values.iter().map(cell_to_text).collect();
                Series::new(header, strings)
            }
        };

        columns.push(series);
        kinds.push(kind);
    }

    let frame = DataFrame::new(columns)
        .map_err(|e| AppError::FileProcessingError(format!("Failed to create DataFrame: {}", e)))?;
    Table::new(frame, kinds)
}
