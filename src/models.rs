use crate::error::AppError;
use crate::services::excel::summarizer::NumericStats;
use crate::services::excel::types::{ColumnNulls, RowPreview};
use crate::services::excel::{ColumnKind, ColumnSummarizer, ColumnSummary, Table};
use crate::services::session::Session;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ColumnEntry {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Serialize)]
pub struct SessionOverview {
    pub session_id: String,
    pub file_name: Option<String>,
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub loaded_at: DateTime<Utc>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnEntry>,
}

impl SessionOverview {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            file_name: session.file_name.clone(),
            sheet_names: session.sheet_names.clone(),
            sheet_name: session.sheet_name.clone(),
            loaded_at: session.loaded_at,
            row_count: session.table.height(),
            column_count: session.table.width(),
            columns: column_entries(&session.table),
        }
    }
}

/// Data Explorer page: preview, column list and the describe table.
#[derive(Debug, Serialize)]
pub struct ExplorerView {
    pub preview: RowPreview,
    pub columns: Vec<ColumnEntry>,
    pub numeric_summary: Vec<NumericStats>,
}

impl ExplorerView {
    pub fn build(table: &Table, preview_rows: usize) -> Result<Self, AppError> {
        Ok(Self {
            preview: table.preview_all(preview_rows)?,
            columns: column_entries(table),
            numeric_summary: ColumnSummarizer.describe_all(table)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnAnalysis {
    pub column: String,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DatasetMetrics {
    pub rows: usize,
    pub columns: usize,
    pub missing_values: usize,
}

/// Dashboard page: shape metrics, nulls per column and per-kind previews.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub metrics: DatasetMetrics,
    pub null_values: Vec<ColumnNulls>,
    pub numeric_preview: Option<RowPreview>,
    pub categorical_preview: Option<RowPreview>,
}

impl DashboardView {
    pub fn build(table: &Table, preview_rows: usize) -> Result<Self, AppError> {
        Ok(Self {
            metrics: DatasetMetrics {
                rows: table.height(),
                columns: table.width(),
                missing_values: table.total_missing(),
            },
            null_values: table.null_report(),
            numeric_preview: kind_preview(table, ColumnKind::Numeric, preview_rows)?,
            categorical_preview: kind_preview(table, ColumnKind::Categorical, preview_rows)?,
        })
    }
}

fn column_entries(table: &Table) -> Vec<ColumnEntry> {
    table
        .columns_with_kinds()
        .into_iter()
        .map(|(name, kind)| ColumnEntry { name, kind })
        .collect()
}

fn kind_preview(table: &Table, kind: ColumnKind, rows: usize) -> Result<Option<RowPreview>, AppError> {
    let columns = table.columns_of_kind(kind);
    if columns.is_empty() {
        return Ok(None);
    }
    table.preview(&columns, rows).map(Some)
}
