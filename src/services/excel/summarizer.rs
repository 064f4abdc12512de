use super::types::{any_value_to_json, ColumnKind, Table};
use crate::error::AppError;
use polars::prelude::*;
use serde::Serialize;

pub const DEFAULT_TOP_N: usize = 10;
pub const MAX_TOP_N: usize = 20;

const VALUE: &str = "value";
const COUNT: &str = "count";

/// Count, mean, std-dev and five-number summary of a numeric column.
///
/// Every statistic is `None` when the column has no values; `std` is also
/// `None` for a single value (sample standard deviation, n - 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount<T> {
    pub value: T,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub stats: NumericStats,
    /// One entry per distinct value, ascending by value. Keys keep the
    /// column's storage type, so whole-number columns report `20`, not `20.0`.
    pub histogram: Vec<ValueCount<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub non_missing: usize,
    pub distinct: usize,
    pub top_n: usize,
    /// Largest top-N a caller may ask for on this column.
    pub max_top_n: usize,
    /// Most frequent values first.
    pub counts: Vec<ValueCount<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
    Unsupported { message: String },
}

pub struct ColumnSummarizer;

impl ColumnSummarizer {
    /// Summarizes `column` according to its kind. `top_n` only applies to
    /// categorical columns and is clamped to `[1, min(20, distinct)]`.
    pub fn summarize(&self, table: &Table, column: &str, top_n: Option<usize>) -> Result<ColumnSummary, AppError> {
        let kind = table.kind_of(column)?;
        let series = table.column(column)?;
        tracing::debug!("Summarizing {} column {}", kind, column);

        match kind {
            ColumnKind::Numeric => {
                let cleaned = clean_numeric(series)?;
                Ok(ColumnSummary::Numeric(NumericSummary {
                    stats: describe(column, &cleaned)?,
                    histogram: value_histogram(&cleaned)?,
                }))
            }
            ColumnKind::Categorical => {
                let cleaned = clean_text(series);
                let ranked = rank_categories(&cleaned)?;
                let distinct = ranked.len();
                let top_n = clamp_top_n(top_n, distinct);
                Ok(ColumnSummary::Categorical(CategoricalSummary {
                    non_missing: cleaned.len(),
                    distinct,
                    top_n,
                    max_top_n: top_n_bound(distinct),
                    counts: ranked.into_iter().take(top_n).collect(),
                }))
            }
            ColumnKind::Unsupported => Ok(ColumnSummary::Unsupported {
                message: "Unsupported data type for this column.".to_string(),
            }),
        }
    }

    /// Descriptive statistics for every numeric column, in table order.
    pub fn describe_all(&self, table: &Table) -> Result<Vec<NumericStats>, AppError> {
        table
            .columns_of_kind(ColumnKind::Numeric)
            .iter()
            .map(|name| describe(name, &clean_numeric(table.column(name)?)?))
            .collect()
    }
}

/// Non-missing cells of a numeric series. NaN counts as missing.
pub fn clean_numeric(series: &Series) -> Result<Series, AppError> {
    let present = series.drop_nulls();
    if present.dtype().is_float() {
        let mask = present.f64()?.is_not_nan();
        return Ok(present.filter(&mask)?);
    }
    Ok(present)
}

/// Non-missing cells of a text series.
pub fn clean_text(series: &Series) -> Series {
    series.drop_nulls()
}

/// Describe table row for an already cleaned numeric series.
pub fn describe(column: &str, cleaned: &Series) -> Result<NumericStats, AppError> {
    let values = cleaned.cast(&DataType::Float64)?;
    let ca = values.f64()?;
    let count = ca.len();
    if count == 0 {
        return Ok(NumericStats {
            column: column.to_string(),
            count,
            mean: None,
            std: None,
            min: None,
            q25: None,
            median: None,
            q75: None,
            max: None,
        });
    }

    Ok(NumericStats {
        column: column.to_string(),
        count,
        mean: ca.mean(),
        std: if count > 1 { ca.std(1) } else { None },
        min: ca.min(),
        q25: ca.quantile(0.25, QuantileInterpolOptions::Linear)?,
        median: ca.quantile(0.5, QuantileInterpolOptions::Linear)?,
        q75: ca.quantile(0.75, QuantileInterpolOptions::Linear)?,
        max: ca.max(),
    })
}

/// Occurrences of each distinct value of `cleaned`, counted with a stable
/// group-by so equal counts keep first-seen order.
fn frequencies(cleaned: &Series, most_frequent_first: bool) -> Result<DataFrame, AppError> {
    let counted = DataFrame::new(vec![cleaned.clone().with_name(VALUE)])?
        .lazy()
        .group_by_stable([col(VALUE)])
        .agg([len().alias(COUNT)]);

    let sorted = if most_frequent_first {
        counted.sort(
            COUNT,
            SortOptions {
                descending: true,
                maintain_order: true,
                ..Default::default()
            },
        )
    } else {
        counted.sort(VALUE, SortOptions::default())
    };
    Ok(sorted.collect()?)
}

fn value_counts<T>(
    frame: &DataFrame,
    to_value: impl Fn(AnyValue<'_>) -> T,
) -> Result<Vec<ValueCount<T>>, AppError> {
    let values = frame.column(VALUE)?;
    let counts = frame.column(COUNT)?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    let mut out = Vec::with_capacity(frame.height());
    for idx in 0..frame.height() {
        out.push(ValueCount {
            value: to_value(values.get(idx)?),
            count: counts.get(idx).unwrap_or(0) as usize,
        });
    }
    Ok(out)
}

pub fn value_histogram(cleaned: &Series) -> Result<Vec<ValueCount<serde_json::Value>>, AppError> {
    value_counts(&frequencies(cleaned, false)?, any_value_to_json)
}

/// Occurrences per distinct value, most frequent first.
pub fn rank_categories(cleaned: &Series) -> Result<Vec<ValueCount<String>>, AppError> {
    value_counts(&frequencies(cleaned, true)?, |value| match value {
        AnyValue::String(s) => s.to_string(),
        other => other.to_string(),
    })
}

pub fn top_n_bound(distinct: usize) -> usize {
    distinct.min(MAX_TOP_N).max(1)
}

pub fn clamp_top_n(requested: Option<usize>, distinct: usize) -> usize {
    requested
        .unwrap_or(DEFAULT_TOP_N)
        .clamp(1, top_n_bound(distinct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::loader::build_table;
    use calamine::Data;
    use serde_json::json;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn example_table() -> Table {
        let ages = [Some(20.0), Some(20.0), Some(30.0), None, Some(40.0), None];
        let cities = ["NY", "NY", "LA", "SF", "LA", "LA"];
        let mut rows = vec![vec![s("age"), s("city"), s("blank"), s("joined")]];
        for (age, city) in ages.iter().zip(cities.iter()) {
            rows.push(vec![
                age.map(Data::Float).unwrap_or(Data::Empty),
                s(city),
                Data::Empty,
                Data::DateTimeIso("2024-01-01".to_string()),
            ]);
        }
        build_table(&rows).unwrap()
    }

    fn numeric(summary: ColumnSummary) -> NumericSummary {
        match summary {
            ColumnSummary::Numeric(n) => n,
            other => panic!("expected numeric summary, got {:?}", other),
        }
    }

    fn categorical(summary: ColumnSummary) -> CategoricalSummary {
        match summary {
            ColumnSummary::Categorical(c) => c,
            other => panic!("expected categorical summary, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_example() {
        let table = example_table();
        let summary = numeric(ColumnSummarizer.summarize(&table, "age", None).unwrap());

        assert_eq!(summary.stats.count, 4);
        assert_eq!(summary.stats.mean, Some(27.5));
        assert_eq!(summary.stats.min, Some(20.0));
        assert_eq!(summary.stats.max, Some(40.0));
        assert_eq!(summary.stats.median, Some(25.0));
        assert_eq!(
            summary.histogram,
            vec![
                ValueCount { value: json!(20.0), count: 2 },
                ValueCount { value: json!(30.0), count: 1 },
                ValueCount { value: json!(40.0), count: 1 },
            ]
        );
        let total: usize = summary.histogram.iter().map(|h| h.count).sum();
        assert_eq!(total, summary.stats.count);
    }

    #[test]
    fn test_categorical_example() {
        let table = example_table();
        let summary = categorical(ColumnSummarizer.summarize(&table, "city", Some(2)).unwrap());

        assert_eq!(
            summary.counts,
            vec![
                ValueCount { value: "LA".to_string(), count: 3 },
                ValueCount { value: "NY".to_string(), count: 2 },
            ]
        );
        assert_eq!(summary.distinct, 3);
        assert_eq!(summary.max_top_n, 3);
        assert_eq!(summary.non_missing, 6);
    }

    #[test]
    fn test_categorical_top_n_properties() {
        let table = example_table();
        for n in 1..=25 {
            let summary = categorical(ColumnSummarizer.summarize(&table, "city", Some(n)).unwrap());
            assert!(summary.counts.len() <= n);
            assert!(summary.counts.len() <= summary.distinct);
            assert!(summary.counts.windows(2).all(|w| w[0].count >= w[1].count));

            let total: usize = summary.counts.iter().map(|c| c.count).sum();
            assert!(total <= summary.non_missing);
            if n >= summary.distinct {
                assert_eq!(total, summary.non_missing);
            }
        }
    }

    #[test]
    fn test_top_n_is_clamped() {
        assert_eq!(clamp_top_n(None, 3), 3);
        assert_eq!(clamp_top_n(None, 50), DEFAULT_TOP_N);
        assert_eq!(clamp_top_n(Some(0), 50), 1);
        assert_eq!(clamp_top_n(Some(100), 50), MAX_TOP_N);
        assert_eq!(clamp_top_n(Some(5), 0), 1);
    }

    #[test]
    fn test_all_missing_column_reports_no_data() {
        let table = example_table();
        let summary = numeric(ColumnSummarizer.summarize(&table, "blank", None).unwrap());
        assert_eq!(summary.stats.count, 0);
        assert_eq!(summary.stats.mean, None);
        assert_eq!(summary.stats.std, None);
        assert_eq!(summary.stats.q25, None);
        assert!(summary.histogram.is_empty());
    }

    #[test]
    fn test_unsupported_column_degrades_gracefully() {
        let table = example_table();
        let summary = ColumnSummarizer.summarize(&table, "joined", Some(3)).unwrap();
        assert!(matches!(summary, ColumnSummary::Unsupported { .. }));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let table = example_table();
        let err = ColumnSummarizer.summarize(&table, "salary", None).unwrap_err();
        assert!(matches!(err, AppError::InvalidColumn(name) if name == "salary"));
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let table = example_table();
        for column in ["age", "city", "blank", "joined"] {
            let first = ColumnSummarizer.summarize(&table, column, Some(2)).unwrap();
            let second = ColumnSummarizer.summarize(&table, column, Some(2)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_describe_matches_sample_statistics() {
        let stats = describe("x", &Series::new("x", &[4.0, 2.0, 1.0, 3.0])).unwrap();
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q75, Some(3.25));
        let std = stats.std.unwrap();
        assert!((std - 1.2909944487358056).abs() < 1e-12);

        let single = describe("x", &Series::new("x", &[7.0])).unwrap();
        assert_eq!(single.std, None);
        assert_eq!(single.min, single.max);
    }

    #[test]
    fn test_cleaning_drops_nulls_and_nan() {
        let raw = Series::new("x", &[Some(1.0), None, Some(f64::NAN), Some(3.0)]);
        let cleaned = clean_numeric(&raw).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(describe("x", &cleaned).unwrap().mean, Some(2.0));

        let text = Series::new("c", &[Some("a"), None, Some("b")]);
        assert_eq!(clean_text(&text).len(), 2);
    }

    #[test]
    fn test_quartiles_are_ordered() {
        let samples: [&[f64]; 4] = [
            &[5.0, -3.0, 12.5, 0.0, 0.0, 8.0],
            &[1.0, 1.0, 1.0],
            &[100.0, 2.0],
            &[-1.5, 3.25, 9.0, 9.0, 42.0, 7.0, 0.5],
        ];
        for values in samples {
            let stats = describe("x", &Series::new("x", values)).unwrap();
            let ordered = [stats.min, stats.q25, stats.median, stats.q75, stats.max];
            let ordered: Vec<f64> = ordered.iter().map(|v| v.unwrap()).collect();
            assert!(ordered.windows(2).all(|w| w[0] <= w[1]), "{:?}", ordered);
        }
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let ranked = rank_categories(&Series::new("c", &["b", "a", "a", "b", "c"])).unwrap();
        let values: Vec<&str> = ranked.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
        assert_eq!(ranked[0].count, 2);
    }

    #[test]
    fn test_whole_number_histogram_keeps_integer_keys() {
        let rows = vec![
            vec![s("score")],
            vec![Data::Int(20)],
            vec![Data::Float(20.0)],
            vec![Data::Int(5)],
        ];
        let table = build_table(&rows).unwrap();
        let summary = numeric(ColumnSummarizer.summarize(&table, "score", None).unwrap());
        assert_eq!(
            summary.histogram,
            vec![
                ValueCount { value: json!(5), count: 1 },
                ValueCount { value: json!(20), count: 2 },
            ]
        );
        assert_eq!(summary.stats.mean, Some(15.0));
    }

    #[test]
    fn test_describe_all_covers_numeric_columns_only() {
        let table = example_table();
        let described = ColumnSummarizer.describe_all(&table).unwrap();
        let names: Vec<&str> = described.iter().map(|d| d.column.as_str()).collect();
        assert_eq!(names, vec!["age", "blank"]);
    }

    #[test]
    fn test_numeric_summary_serializes_with_kind_tag() {
        let table = example_table();
        let summary = ColumnSummarizer.summarize(&table, "age", None).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["kind"], "numeric");
        assert_eq!(json["stats"]["25%"], 20.0);
        assert_eq!(json["histogram"][0]["count"], 2);
    }
}
