use serde::Serialize;

use crate::{
    data::ColumnKind,
    error::{FieldCandidates, SchemaError},
    frame::Table,
    mapper::{CanonicalField, ColumnMapping},
};

/// Outcome of the schema gate: which canonical columns are absent and which
/// of the remaining columns looked related to each of them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub missing: Vec<CanonicalField>,
    pub candidates: Vec<FieldCandidates>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn into_result(self) -> Result<(), SchemaError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SchemaError {
                missing: self.missing,
                candidates: self.candidates,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks a mapped table for the five canonical columns. Never mutates
    /// the table and never fails; absence is reported in the returned value.
    /// Candidates come from columns that do not already carry a canonical
    /// name.
    pub fn validate(&self, table: &Table) -> ValidationReport {
        let names = table
            .headers()
            .iter()
            .filter(|header| CanonicalField::ALL.iter().all(|f| f.as_str() != header.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>();
        report(table, &names)
    }

    /// Like [`validate`](Self::validate), but candidates are drawn from the
    /// column names as they appeared before `mapping` renamed them, so a
    /// column claimed by another field is still offered as a hint.
    pub fn validate_mapped(&self, table: &Table, mapping: &ColumnMapping) -> ValidationReport {
        let names = table
            .headers()
            .iter()
            .map(|header| {
                mapping
                    .entries()
                    .iter()
                    .find(|entry| entry.field.as_str() == header.as_str())
                    .map_or(header.as_str(), |entry| entry.original.as_str())
            })
            .collect::<Vec<_>>();
        report(table, &names)
    }
}

fn report(table: &Table, names: &[&str]) -> ValidationReport {
    let missing = CanonicalField::ALL
        .into_iter()
        .filter(|field| !table.has_column(field.as_str()))
        .collect::<Vec<_>>();
    let candidates = missing
        .iter()
        .map(|field| FieldCandidates {
            field: *field,
            columns: related_columns(names, *field),
        })
        .collect();
    ValidationReport {
        missing,
        candidates,
    }
}

fn related_columns(names: &[&str], field: CanonicalField) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            let name = name.trim().to_lowercase();
            field
                .related_keywords()
                .iter()
                .any(|keyword| name.contains(*keyword))
        })
        .map(|name| name.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    MissingColumns { columns: Vec<CanonicalField> },
    EmptyTable,
    UnparseableDates { count: usize },
    NotNumeric { column: CanonicalField },
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityIssue::MissingColumns { columns } => {
                let names = columns.iter().map(|c| c.as_str()).collect::<Vec<_>>();
                write!(f, "Missing columns: {}", names.join(", "))
            }
            QualityIssue::EmptyTable => f.write_str("Table is empty"),
            QualityIssue::UnparseableDates { count } => {
                write!(f, "Column 'date' has {count} value(s) that cannot be converted to a date")
            }
            QualityIssue::NotNumeric { column } => {
                write!(f, "Column '{column}' should be numeric")
            }
        }
    }
}

/// Non-blocking data-quality checks on a mapped table.
pub fn quality_issues(table: &Table) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let report = SchemaValidator::new().validate(table);
    if !report.is_valid() {
        issues.push(QualityIssue::MissingColumns {
            columns: report.missing,
        });
    }
    if table.is_empty() {
        issues.push(QualityIssue::EmptyTable);
    }
    if let Some(idx) = table.column_index(CanonicalField::Date.as_str()) {
        let count = table
            .column(idx)
            .flatten()
            .filter(|value| value.as_date().is_none())
            .count();
        if count > 0 {
            issues.push(QualityIssue::UnparseableDates { count });
        }
    }
    for field in [CanonicalField::Revenue, CanonicalField::Quantity] {
        let Some(idx) = table.column_index(field.as_str()) else {
            continue;
        };
        let numeric = table.kind(idx) == Some(ColumnKind::Number)
            || table.column(idx).flatten().all(|v| v.as_number().is_some());
        if !numeric {
            issues.push(QualityIssue::NotNumeric { column: field });
        }
    }
    issues
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

pub fn table_info(table: &Table) -> TableInfo {
    let columns = table
        .headers()
        .iter()
        .zip(table.kinds())
        .enumerate()
        .map(|(idx, (name, kind))| ColumnInfo {
            name: name.clone(),
            kind: *kind,
            missing: table.column(idx).filter(Option::is_none).count(),
        })
        .collect();
    TableInfo {
        rows: table.row_count(),
        columns,
    }
}
