use std::fmt::Write as _;

use thiserror::Error;

use crate::mapper::CanonicalField;

/// Columns that a field could plausibly have come from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldCandidates {
    pub field: CanonicalField,
    pub columns: Vec<String>,
}

/// A canonical column required by an operation is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required column(s): {}", join_fields(.missing))]
pub struct SchemaError {
    pub missing: Vec<CanonicalField>,
    pub candidates: Vec<FieldCandidates>,
}

impl SchemaError {
    pub fn missing(fields: Vec<CanonicalField>) -> Self {
        Self {
            missing: fields,
            candidates: Vec::new(),
        }
    }

    /// Multi-line explanation suitable for showing to whoever supplied the
    /// file: what is missing and which of their columns looked related.
    pub fn diagnostic(&self) -> String {
        let mut out = format!("{self}\n");
        if self.candidates.is_empty() {
            return out;
        }
        out.push_str("Rename your columns or map them explicitly:\n");
        for candidate in &self.candidates {
            let _ = writeln!(
                out,
                "- {} ({}) - found: [{}]",
                candidate.field,
                candidate.field.description(),
                candidate.columns.join(", ")
            );
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown missing-value strategy '{0}' (expected fill, drop, or interpolate)")]
    UnknownStrategy(String),
    #[error("unknown outlier method '{0}' (expected iqr or zscore)")]
    UnknownOutlierMethod(String),
    #[error("invalid outlier directive '{0}' (expected column:method)")]
    InvalidOutlierDirective(String),
    #[error("unknown canonical field '{0}' (expected date, product, region, revenue, or quantity)")]
    UnknownField(String),
    #[error("column '{column}' configured for '{field}' was not found in the input")]
    OverrideColumnNotFound {
        field: CanonicalField,
        column: String,
    },
    #[error("top-N product count must be at least 1")]
    InvalidTopN,
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_missing_fields() {
        let err = SchemaError::missing(vec![CanonicalField::Region, CanonicalField::Quantity]);
        assert_eq!(err.to_string(), "missing required column(s): region, quantity");
    }

    #[test]
    fn diagnostic_includes_candidates() {
        let err = SchemaError {
            missing: vec![CanonicalField::Revenue],
            candidates: vec![FieldCandidates {
                field: CanonicalField::Revenue,
                columns: vec!["Sales Amount USD".to_string()],
            }],
        };
        let text = err.diagnostic();
        assert!(text.contains("revenue (sales amount) - found: [Sales Amount USD]"));
    }
}
