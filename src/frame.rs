//! In-memory table shared by every pipeline stage.
//!
//! A [`Table`] is a plain value: stages take `&Table` and hand back a new
//! `Table`, so a caller's table is never modified behind its back.

use crate::data::{ColumnKind, Value, is_missing_token, parse_number};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table from typed parts. Short rows are padded with missing
    /// cells and long rows truncated so every row matches the header width.
    pub fn new(headers: Vec<String>, kinds: Vec<ColumnKind>, rows: Vec<Row>) -> Self {
        let width = headers.len();
        let mut kinds = kinds;
        kinds.resize(width, ColumnKind::Text);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            headers,
            kinds,
            rows,
        }
    }

    /// Builds a table from raw text cells the way a CSV loader sees them:
    /// missing-value tokens become `None`, and a column whose every present
    /// value is a plain number is loaded as numeric.
    pub fn from_text_rows(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let mut numeric = vec![true; width];
        let mut seen = vec![false; width];
        for record in &records {
            for (idx, raw) in record.iter().enumerate().take(width) {
                if is_missing_token(raw) {
                    continue;
                }
                seen[idx] = true;
                if numeric[idx] && parse_number(raw).is_none() {
                    numeric[idx] = false;
                }
            }
        }
        let kinds = (0..width)
            .map(|idx| {
                if seen[idx] && numeric[idx] {
                    ColumnKind::Number
                } else {
                    ColumnKind::Text
                }
            })
            .collect::<Vec<_>>();
        let rows = records
            .into_iter()
            .map(|record| {
                record
                    .iter()
                    .take(width)
                    .enumerate()
                    .map(|(idx, raw)| {
                        if is_missing_token(raw) {
                            None
                        } else if kinds[idx] == ColumnKind::Number {
                            parse_number(raw).map(Value::Number)
                        } else {
                            Some(Value::Text(raw.clone()))
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(headers, kinds, rows)
    }

    /// Convenience constructor for literal data.
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::from_text_rows(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    pub fn kind(&self, index: usize) -> Option<ColumnKind> {
        self.kinds.get(index).copied()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows.iter().map(move |row| row.get(index).and_then(|cell| cell.as_ref()))
    }

    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|cell| cell.is_none()).count())
            .sum()
    }

    /// Same columns, different rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self::new(self.headers.clone(), self.kinds.clone(), rows)
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|row| keep(row)).cloned().collect();
        self.with_rows(rows)
    }

    /// Returns a copy with column `index` replaced by `values`.
    pub fn with_column(&self, index: usize, kind: ColumnKind, values: Vec<Option<Value>>) -> Self {
        let mut next = self.clone();
        if index >= next.headers.len() {
            return next;
        }
        next.kinds[index] = kind;
        for (row, value) in next.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        next
    }

    /// Returns a copy whose headers are passed through `rename`; headers for
    /// which it returns `None` are kept as they are.
    pub fn renamed<F>(&self, rename: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut next = self.clone();
        next.headers = self
            .headers
            .iter()
            .map(|h| rename(h).unwrap_or_else(|| h.clone()))
            .collect();
        next
    }

    /// Returns a copy holding only the named columns, in the given order.
    /// Names that are not present are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let indices = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect::<Vec<_>>();
        let headers = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let kinds = indices.iter().map(|&i| self.kinds[i]).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self::new(headers, kinds, rows)
    }

    /// Rows rendered as display strings, missing cells as empty strings.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_rows_infers_numeric_columns() {
        let table = Table::from_str_rows(
            &["product", "revenue", "note"],
            &[&["Widget", "10.5", "ok"], &["Gadget", "", "7"], &["Gizmo", "3", "n/a"]],
        );
        assert_eq!(
            table.kinds(),
            &[ColumnKind::Text, ColumnKind::Number, ColumnKind::Text]
        );
        assert_eq!(table.rows()[0][1], Some(Value::Number(10.5)));
        assert_eq!(table.rows()[1][1], None);
        assert_eq!(table.rows()[2][2], None);
        assert_eq!(table.missing_count(), 2);
    }

    #[test]
    fn all_missing_column_loads_as_text() {
        let table = Table::from_str_rows(&["a"], &[&[""], &["NA"]]);
        assert_eq!(table.kinds(), &[ColumnKind::Text]);
    }

    #[test]
    fn ragged_rows_are_padded() {
        let table = Table::from_text_rows(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()]],
        );
        assert_eq!(table.rows()[0].len(), 2);
        assert_eq!(table.rows()[0][1], None);
    }

    #[test]
    fn select_and_rename_produce_copies() {
        let table = Table::from_str_rows(&["Region", "Sales"], &[&["East", "5"]]);
        let renamed = table.renamed(|h| (h == "Sales").then(|| "revenue".to_string()));
        assert_eq!(renamed.headers(), &["Region".to_string(), "revenue".to_string()]);
        assert_eq!(table.headers()[1], "Sales");

        let selected = renamed.select(&["revenue", "missing"]);
        assert_eq!(selected.headers(), &["revenue".to_string()]);
        assert_eq!(selected.rows()[0][0], Some(Value::Number(5.0)));
    }
}
