use std::collections::HashSet;
use std::path::Path;
use calamine::Data;
use super::types::ColumnKind;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

// 2^53: beyond this an f64 no longer holds every integer exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Header label for column `idx`, made unique against `existing_names`.
///
/// Blank headers become `Unnamed: <idx>`; repeats get a `.1`, `.2`, ... suffix.
pub fn unique_column_name(header: &Data, idx: usize, existing_names: &mut HashSet<String>) -> String {
    let base_name = match header {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    };
    let base_name = if base_name.is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        base_name
    };

    let mut cleaned = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}.{}", base_name, counter);
        counter += 1;
    }

    cleaned
}

pub fn has_supported_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn is_missing(value: &Data) -> bool {
    match value {
        Data::Empty | Data::Error(_) => true,
        Data::Float(f) => f.is_nan(),
        _ => false,
    }
}

fn is_temporal(value: &Data) -> bool {
    matches!(value, Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_))
}

/// Infers the kind of a column from its data cells (header excluded).
///
/// A column with no values at all is numeric, so it summarizes to an empty
/// distribution instead of being rejected.
pub fn detect_column_kind(values: &[Data]) -> ColumnKind {
    let mut numeric_count = 0;
    let mut temporal_count = 0;
    let mut other_count = 0;

    for value in values.iter().filter(|v| !is_missing(v)) {
        match value {
            Data::Float(_) | Data::Int(_) => numeric_count += 1,
            v if is_temporal(v) => temporal_count += 1,
            _ => other_count += 1,
        }
    }

    match (numeric_count, temporal_count, other_count) {
        (_, 0, 0) => ColumnKind::Numeric,
        (0, _, 0) => ColumnKind::Unsupported,
        _ => ColumnKind::Categorical,
    }
}

pub fn cell_to_f64(value: &Data) -> Option<f64> {
    match value {
        Data::Float(f) if !f.is_nan() => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    }
}

/// Whole-number value of a cell, if it has one that fits losslessly in `i64`.
pub fn cell_to_i64(value: &Data) -> Option<i64> {
    match value {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => Some(*f as i64),
        _ => None,
    }
}

/// True when every cell holds a whole number. A single missing cell rules the
/// column out, since integer storage has no NaN to fall back on.
pub fn is_whole_number_column(values: &[Data]) -> bool {
    values.iter().all(|v| cell_to_i64(v).is_some())
}

pub fn cell_to_text(value: &Data) -> Option<String> {
    if is_missing(value) {
        return None;
    }
    match value {
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        other => Some(other.to_string()),
    }
}
