mod common;

use common::{canonical_table, load_fixture};
use proptest::prelude::*;
use sales_dashboard::{
    ColumnMapper, DataCleaner, MissingValueStrategy, OutlierMethod, Table,
    clean::CleaningEvent,
    data::{ColumnKind, Value},
};

fn column_values(table: &Table, name: &str) -> Vec<Option<Value>> {
    let idx = table.column_index(name).expect("column present");
    table.column(idx).map(|cell| cell.cloned()).collect()
}

#[test]
fn fill_uses_median_for_numeric_gap() {
    let table = Table::from_str_rows(&["revenue"], &[&["1"], &[""], &["3"]]);
    let cleaned = DataCleaner::new().handle_missing_values(&table, MissingValueStrategy::Fill);
    assert_eq!(
        column_values(&cleaned.table, "revenue"),
        vec![
            Some(Value::Number(1.0)),
            Some(Value::Number(2.0)),
            Some(Value::Number(3.0))
        ]
    );
    assert_eq!(
        cleaned.event,
        CleaningEvent::MissingValuesHandled {
            strategy: MissingValueStrategy::Fill,
            before: 1,
            after: 0
        }
    );
}

#[test]
fn fill_uses_mode_for_text() {
    let table = Table::from_str_rows(
        &["region"],
        &[&["East"], &[""], &["West"], &["East"]],
    );
    let cleaned = DataCleaner::new().handle_missing_values(&table, MissingValueStrategy::Fill);
    assert_eq!(
        column_values(&cleaned.table, "region")[1],
        Some(Value::Text("East".to_string()))
    );
}

#[test]
fn drop_removes_rows_with_any_missing_cell() {
    let table = canonical_table(&[
        &["2024-01-01", "Widget", "East", "10", "1"],
        &["2024-01-02", "", "East", "10", "1"],
        &["2024-01-03", "Widget", "West", "12", ""],
    ]);
    let cleaned = DataCleaner::new().handle_missing_values(&table, MissingValueStrategy::Drop);
    assert_eq!(cleaned.table.row_count(), 1);
    assert_eq!(table.row_count(), 3);
}

#[test]
fn interpolate_only_touches_numeric_columns() {
    let table = Table::from_str_rows(
        &["product", "revenue"],
        &[&["A", "10"], &["", ""], &["C", "30"], &["D", ""]],
    );
    let cleaned =
        DataCleaner::new().handle_missing_values(&table, MissingValueStrategy::Interpolate);
    assert_eq!(
        column_values(&cleaned.table, "revenue"),
        vec![
            Some(Value::Number(10.0)),
            Some(Value::Number(20.0)),
            Some(Value::Number(30.0)),
            Some(Value::Number(30.0))
        ]
    );
    assert_eq!(column_values(&cleaned.table, "product")[1], None);
}

#[test]
fn fix_data_types_marks_unparseable_values_missing() {
    let table = canonical_table(&[
        &["2024-01-05", "Widget", "East", "100", "2"],
        &["someday", "Gadget", "West", "lots", "1"],
    ]);
    let fixed = DataCleaner::new().fix_data_types(&table);
    assert_eq!(
        fixed.event,
        CleaningEvent::TypesFixed {
            unparseable_dates: 1,
            unparseable_numbers: 1
        }
    );
    assert_eq!(
        fixed.table.kinds(),
        &[
            ColumnKind::Date,
            ColumnKind::Text,
            ColumnKind::Text,
            ColumnKind::Number,
            ColumnKind::Number
        ]
    );
    assert_eq!(column_values(&fixed.table, "date")[1], None);
    assert_eq!(
        column_values(&fixed.table, "revenue"),
        vec![Some(Value::Number(100.0)), None]
    );
}

#[test]
fn iqr_removes_values_outside_fence() {
    let table = Table::from_str_rows(
        &["revenue"],
        &[&["10"], &["11"], &["12"], &["13"], &["14"], &["1000"]],
    );
    let cleaned = DataCleaner::new().remove_outliers(&table, "revenue", OutlierMethod::Iqr);
    assert_eq!(cleaned.table.row_count(), 5);
    assert!(matches!(
        cleaned.event,
        CleaningEvent::OutliersRemoved { removed: 1, .. }
    ));
}

#[test]
fn zscore_with_zero_deviation_is_skipped() {
    let table = Table::from_str_rows(&["revenue"], &[&["5"], &["5"], &["5"]]);
    let cleaned = DataCleaner::new().remove_outliers(&table, "revenue", OutlierMethod::Zscore);
    assert_eq!(cleaned.table, table);
    match cleaned.event {
        CleaningEvent::Skipped { reason, .. } => {
            assert!(reason.contains("standard deviation is zero"))
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn zscore_drops_extreme_rows() {
    let mut rows = vec!["10"; 20];
    rows.extend(["11", "9", "500"]);
    let rows = rows.iter().map(|v| vec![*v]).collect::<Vec<_>>();
    let borrowed = rows.iter().map(|r| r.as_slice()).collect::<Vec<_>>();
    let table = Table::from_str_rows(&["revenue"], &borrowed);
    let cleaned = DataCleaner::new().remove_outliers(&table, "revenue", OutlierMethod::Zscore);
    assert_eq!(cleaned.table.row_count(), 22);
}

#[test]
fn outliers_on_absent_column_warn_and_return_input() {
    let table = Table::from_str_rows(&["revenue"], &[&["1"]]);
    let cleaned = DataCleaner::new().remove_outliers(&table, "cost", OutlierMethod::Iqr);
    assert!(cleaned.event.is_warning());
    assert_eq!(cleaned.table, table);
}

#[test]
fn clean_all_on_messy_fixture() {
    let raw = load_fixture("sales_messy.csv");
    let (mapped, _) = ColumnMapper::new().map_table(&raw).unwrap();
    let (cleaned, report) = DataCleaner::new().clean_all(&mapped, MissingValueStrategy::Fill);

    assert_eq!(report.duplicates_removed(), 1);
    assert_eq!(cleaned.row_count(), 7);
    assert_eq!(
        column_values(&cleaned, "revenue")
            .iter()
            .filter_map(|v| v.as_ref().and_then(Value::as_number))
            .sum::<f64>(),
        1675.0
    );
    assert_eq!(
        column_values(&cleaned, "product")[2],
        Some(Value::Text("Gadget".to_string()))
    );
    // Dates are never filled.
    assert_eq!(column_values(&cleaned, "date").iter().filter(|v| v.is_none()).count(), 1);
    assert!(matches!(
        report.events[1],
        CleaningEvent::TypesFixed {
            unparseable_dates: 1,
            unparseable_numbers: 1
        }
    ));
}

fn arbitrary_table() -> impl Strategy<Value = Table> {
    let cell = prop_oneof![
        Just(String::new()),
        Just("x".to_string()),
        Just("y".to_string()),
        Just("1".to_string()),
        Just("2".to_string()),
        Just("2024-01-05".to_string()),
        Just("01/05/2024".to_string()),
    ];
    proptest::collection::vec(proptest::collection::vec(cell, 5), 0..25).prop_map(|rows| {
        let headers = common::CANONICAL.iter().map(|h| h.to_string()).collect();
        Table::from_text_rows(headers, rows)
    })
}

proptest! {
    #[test]
    fn dedupe_after_clean_all_removes_nothing(
        table in arbitrary_table(),
        strategy in prop_oneof![
            Just(MissingValueStrategy::Fill),
            Just(MissingValueStrategy::Drop),
            Just(MissingValueStrategy::Interpolate),
        ],
    ) {
        let cleaner = DataCleaner::new();
        let (cleaned, _) = cleaner.clean_all(&table, strategy);
        let again = cleaner.remove_duplicates(&cleaned);
        prop_assert_eq!(again.event, CleaningEvent::DuplicatesRemoved { removed: 0 });
        prop_assert_eq!(again.table, cleaned);
    }

    #[test]
    fn cleaning_never_mutates_input(table in arbitrary_table()) {
        let before = table.clone();
        let _ = DataCleaner::new().clean_all(&table, MissingValueStrategy::Fill);
        prop_assert_eq!(table, before);
    }
}
