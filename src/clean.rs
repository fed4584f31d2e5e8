//! Row de-duplication, type coercion, missing-value handling, and outlier
//! removal.
//!
//! Every operation reads a `&Table` and returns a new table together with a
//! [`CleaningEvent`] describing what it did. The same facts are also logged.

use std::{collections::BTreeSet, fmt, str::FromStr};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::{ColumnKind, Value, row_key},
    error::ConfigurationError,
    frame::Table,
    mapper::CanonicalField,
    stats::{NumericSummary, mode},
};

pub const UNKNOWN_LABEL: &str = "Unknown";
const IQR_FENCE: f64 = 1.5;
const ZSCORE_LIMIT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValueStrategy {
    /// Median for numeric columns, mode (or "Unknown") for text columns.
    #[default]
    Fill,
    /// Remove every row holding a missing value.
    Drop,
    /// Linear interpolation by row position, numeric columns only.
    Interpolate,
}

impl MissingValueStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingValueStrategy::Fill => "fill",
            MissingValueStrategy::Drop => "drop",
            MissingValueStrategy::Interpolate => "interpolate",
        }
    }
}

impl fmt::Display for MissingValueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingValueStrategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill" => Ok(MissingValueStrategy::Fill),
            "drop" => Ok(MissingValueStrategy::Drop),
            "interpolate" => Ok(MissingValueStrategy::Interpolate),
            _ => Err(ConfigurationError::UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Zscore => "zscore",
        })
    }
}

impl FromStr for OutlierMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" => Ok(OutlierMethod::Zscore),
            _ => Err(ConfigurationError::UnknownOutlierMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CleaningEvent {
    DuplicatesRemoved {
        removed: usize,
    },
    TypesFixed {
        unparseable_dates: usize,
        unparseable_numbers: usize,
    },
    MissingValuesHandled {
        strategy: MissingValueStrategy,
        before: usize,
        after: usize,
    },
    OutliersRemoved {
        column: String,
        method: OutlierMethod,
        removed: usize,
    },
    /// The operation could not run on this input; the table is unchanged.
    Skipped {
        operation: String,
        reason: String,
    },
}

impl CleaningEvent {
    pub fn is_warning(&self) -> bool {
        matches!(self, CleaningEvent::Skipped { .. })
    }
}

/// Output of a single cleaning step.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub event: CleaningEvent,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningReport {
    pub events: Vec<CleaningEvent>,
}

impl CleaningReport {
    pub fn warnings(&self) -> impl Iterator<Item = &CleaningEvent> {
        self.events.iter().filter(|event| event.is_warning())
    }

    pub fn duplicates_removed(&self) -> usize {
        self.events
            .iter()
            .map(|event| match event {
                CleaningEvent::DuplicatesRemoved { removed } => *removed,
                _ => 0,
            })
            .sum()
    }

    fn record(&mut self, step: Cleaned) -> Table {
        self.events.push(step.event);
        step.table
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Drops rows equal to an earlier row in every column; the first
    /// occurrence is kept.
    pub fn remove_duplicates(&self, table: &Table) -> Cleaned {
        let mut seen = BTreeSet::new();
        let cleaned = table.filter_rows(|row| seen.insert(row_key(row)));
        let removed = table.row_count() - cleaned.row_count();
        info!("Removed {removed} duplicate rows");
        Cleaned {
            table: cleaned,
            event: CleaningEvent::DuplicatesRemoved { removed },
        }
    }

    /// Coerces canonical columns: `date` to calendar dates, `revenue` and
    /// `quantity` to numbers, `product` and `region` to text. Values that do
    /// not parse become missing.
    pub fn fix_data_types(&self, table: &Table) -> Cleaned {
        info!("Fixing data types...");
        let mut next = table.clone();
        let mut unparseable_dates = 0usize;
        let mut unparseable_numbers = 0usize;

        for field in CanonicalField::ALL {
            let Some(index) = next.column_index(field.as_str()) else {
                continue;
            };
            let (kind, values, failures) = match field {
                CanonicalField::Date => coerce_column(&next, index, ColumnKind::Date, |v| {
                    v.as_date().map(Value::Date)
                }),
                CanonicalField::Revenue | CanonicalField::Quantity => {
                    coerce_column(&next, index, ColumnKind::Number, |v| {
                        v.as_number().map(Value::Number)
                    })
                }
                CanonicalField::Product | CanonicalField::Region => {
                    coerce_column(&next, index, ColumnKind::Text, |v| {
                        Some(Value::Text(v.as_display()))
                    })
                }
            };
            match kind {
                ColumnKind::Date => unparseable_dates += failures,
                ColumnKind::Number => unparseable_numbers += failures,
                ColumnKind::Text => {}
            }
            next = next.with_column(index, kind, values);
            info!("Converted '{field}' column to {kind}");
        }

        if unparseable_dates + unparseable_numbers > 0 {
            warn!(
                "{unparseable_dates} date value(s) and {unparseable_numbers} numeric value(s) could not be parsed and were marked missing"
            );
        }
        Cleaned {
            table: next,
            event: CleaningEvent::TypesFixed {
                unparseable_dates,
                unparseable_numbers,
            },
        }
    }

    pub fn handle_missing_values(&self, table: &Table, strategy: MissingValueStrategy) -> Cleaned {
        let before = table.missing_count();
        if before == 0 {
            info!("No missing values found");
            return Cleaned {
                table: table.clone(),
                event: CleaningEvent::MissingValuesHandled {
                    strategy,
                    before,
                    after: 0,
                },
            };
        }
        info!("Found {before} missing values, applying strategy: {strategy}");

        let cleaned = match strategy {
            MissingValueStrategy::Drop => {
                let dropped = table.filter_rows(|row| row.iter().all(Option::is_some));
                info!(
                    "Dropped {} row(s) with missing values",
                    table.row_count() - dropped.row_count()
                );
                dropped
            }
            MissingValueStrategy::Fill => fill_missing(table),
            MissingValueStrategy::Interpolate => interpolate_missing(table),
        };

        let after = cleaned.missing_count();
        info!("Remaining missing values: {after}");
        Cleaned {
            table: cleaned,
            event: CleaningEvent::MissingValuesHandled {
                strategy,
                before,
                after,
            },
        }
    }

    /// Removes rows whose `column` value lies outside the IQR fence or has an
    /// absolute z-score of 3 or more. Rows missing a value in `column` are
    /// removed as well. Degenerate input (absent or non-numeric column, zero
    /// spread for z-scores) skips the step with a warning.
    pub fn remove_outliers(&self, table: &Table, column: &str, method: OutlierMethod) -> Cleaned {
        let operation = format!("remove_outliers({column}, {method})");
        let skip = |reason: String| {
            warn!("{reason}");
            Cleaned {
                table: table.clone(),
                event: CleaningEvent::Skipped {
                    operation: operation.clone(),
                    reason,
                },
            }
        };

        let Some(index) = table.column_index(column) else {
            return skip(format!("Column '{column}' not found"));
        };
        if table.kind(index) != Some(ColumnKind::Number) {
            return skip(format!("Column '{column}' is not numeric"));
        }
        let summary = NumericSummary::from_values(table.column(index).filter_map(|v| v?.as_number()));

        let keep: Box<dyn Fn(f64) -> bool> = match method {
            OutlierMethod::Iqr => {
                let (Some(q1), Some(q3)) = (summary.quantile(0.25), summary.quantile(0.75)) else {
                    return skip(format!("Column '{column}' has no values"));
                };
                let iqr = q3 - q1;
                let lower = q1 - IQR_FENCE * iqr;
                let upper = q3 + IQR_FENCE * iqr;
                debug!("IQR fence for '{column}': [{lower}, {upper}]");
                Box::new(move |value| value >= lower && value <= upper)
            }
            OutlierMethod::Zscore => {
                let (Some(mean), Some(std)) = (summary.mean(), summary.std_dev()) else {
                    return skip(format!(
                        "Cannot calculate z-scores: too few values in column '{column}'"
                    ));
                };
                if std <= 0.0 {
                    return skip(format!(
                        "Cannot calculate z-scores: standard deviation is zero for column '{column}'"
                    ));
                }
                Box::new(move |value| ((value - mean) / std).abs() < ZSCORE_LIMIT)
            }
        };

        let cleaned = table.filter_rows(|row| {
            row[index]
                .as_ref()
                .and_then(Value::as_number)
                .is_some_and(|value| keep(value))
        });
        let removed = table.row_count() - cleaned.row_count();
        info!("Removed {removed} outliers from '{column}' column");
        Cleaned {
            table: cleaned,
            event: CleaningEvent::OutliersRemoved {
                column: column.to_string(),
                method,
                removed,
            },
        }
    }

    /// Duplicates → types → missing values. Outlier removal is never part of
    /// this sequence. A final duplicate sweep catches rows that only became
    /// identical once coerced or filled.
    pub fn clean_all(&self, table: &Table, strategy: MissingValueStrategy) -> (Table, CleaningReport) {
        info!("Starting comprehensive data cleaning...");
        let mut report = CleaningReport::default();
        let deduped = report.record(self.remove_duplicates(table));
        let typed = report.record(self.fix_data_types(&deduped));
        let handled = report.record(self.handle_missing_values(&typed, strategy));

        let sweep = self.remove_duplicates(&handled);
        let cleaned = if matches!(sweep.event, CleaningEvent::DuplicatesRemoved { removed } if removed > 0) {
            report.record(sweep)
        } else {
            sweep.table
        };
        info!("Data cleaning completed: {} row(s)", cleaned.row_count());
        (cleaned, report)
    }
}

fn coerce_column<F>(
    table: &Table,
    index: usize,
    kind: ColumnKind,
    convert: F,
) -> (ColumnKind, Vec<Option<Value>>, usize)
where
    F: Fn(&Value) -> Option<Value>,
{
    let mut failures = 0usize;
    let values = table
        .column(index)
        .map(|cell| {
            let converted = cell.and_then(&convert);
            if cell.is_some() && converted.is_none() {
                failures += 1;
            }
            converted
        })
        .collect::<Vec<_>>();
    (kind, values, failures)
}

fn fill_missing(table: &Table) -> Table {
    let mut next = table.clone();
    for (index, kind) in table.kinds().iter().enumerate() {
        if table.column(index).all(|cell| cell.is_some()) {
            continue;
        }
        let name = &table.headers()[index];
        let fill = match kind {
            ColumnKind::Number => {
                let summary =
                    NumericSummary::from_values(table.column(index).filter_map(|v| v?.as_number()));
                match summary.median() {
                    Some(median) => {
                        info!("Filled missing values in '{name}' with median: {median}");
                        Value::Number(median)
                    }
                    None => continue,
                }
            }
            ColumnKind::Text => {
                let present = table
                    .column(index)
                    .flatten()
                    .map(Value::as_display)
                    .collect::<Vec<_>>();
                let value = mode(present.iter().map(String::as_str))
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                info!("Filled missing values in '{name}' with mode: {value}");
                Value::Text(value)
            }
            ColumnKind::Date => continue,
        };
        let values = table
            .column(index)
            .map(|cell| Some(cell.cloned().unwrap_or_else(|| fill.clone())))
            .collect();
        next = next.with_column(index, *kind, values);
    }
    next
}

fn interpolate_missing(table: &Table) -> Table {
    let mut next = table.clone();
    for (index, kind) in table.kinds().iter().enumerate() {
        if *kind != ColumnKind::Number || table.column(index).all(|cell| cell.is_some()) {
            continue;
        }
        let series = table
            .column(index)
            .map(|cell| cell.and_then(Value::as_number))
            .collect::<Vec<_>>();
        let values = interpolate_linear(&series)
            .into_iter()
            .map(|value| value.map(Value::Number))
            .collect();
        next = next.with_column(index, ColumnKind::Number, values);
        info!("Interpolated missing values in '{}'", table.headers()[index]);
    }
    next
}

/// Fills interior gaps linearly by position and carries the last observed
/// value over trailing gaps. Leading gaps stay missing.
pub fn interpolate_linear(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = series.to_vec();
    let mut previous: Option<(usize, f64)> = None;
    for (idx, value) in series.iter().enumerate() {
        let Some(current) = *value else {
            continue;
        };
        if let Some((start, start_value)) = previous {
            let span = (idx - start) as f64;
            for gap in (start + 1)..idx {
                let weight = (gap - start) as f64 / span;
                out[gap] = Some(start_value + (current - start_value) * weight);
            }
        }
        previous = Some((idx, current));
    }
    if let Some((last, last_value)) = previous {
        for slot in out.iter_mut().skip(last + 1) {
            *slot = Some(last_value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_linear_fills_interior_and_trailing_gaps() {
        let series = [None, Some(1.0), None, None, Some(4.0), None];
        assert_eq!(
            interpolate_linear(&series),
            vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(4.0)]
        );
    }

    #[test]
    fn strategy_parsing_fails_fast_on_unknown_names() {
        assert_eq!("Drop".parse::<MissingValueStrategy>(), Ok(MissingValueStrategy::Drop));
        assert_eq!(
            "mean".parse::<MissingValueStrategy>(),
            Err(ConfigurationError::UnknownStrategy("mean".to_string()))
        );
    }

    #[test]
    fn outlier_method_accepts_hyphenated_zscore() {
        assert_eq!("z-score".parse::<OutlierMethod>(), Ok(OutlierMethod::Zscore));
        assert!("mad".parse::<OutlierMethod>().is_err());
    }

    #[test]
    fn zscore_on_constant_fractional_column_is_skipped() {
        let rows = vec![["Widget", "0.1"]; 7];
        let borrowed = rows.iter().map(|row| &row[..]).collect::<Vec<_>>();
        let table = Table::from_str_rows(&["product", "revenue"], &borrowed);
        let cleaned = DataCleaner::new().remove_outliers(&table, "revenue", OutlierMethod::Zscore);
        assert!(
            matches!(&cleaned.event, CleaningEvent::Skipped { reason, .. } if reason.contains("standard deviation is zero")),
            "{:?}",
            cleaned.event
        );
        assert!(cleaned.event.is_warning());
        assert_eq!(cleaned.table, table);
    }

    #[test]
    fn fill_uses_unknown_for_all_missing_text_column() {
        let table = Table::from_str_rows(&["region", "revenue"], &[&["", "1"], &["", "2"]]);
        let cleaned = DataCleaner::new().handle_missing_values(&table, MissingValueStrategy::Fill);
        assert!(
            cleaned
                .table
                .column(0)
                .all(|cell| cell == Some(&Value::Text(UNKNOWN_LABEL.to_string())))
        );
    }
}
