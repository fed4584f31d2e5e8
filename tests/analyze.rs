mod common;

use common::{approx_eq, canonical_table, load_fixture};
use proptest::prelude::*;
use sales_dashboard::{
    CanonicalField, ColumnMapper, DataAnalyzer, DataCleaner, MissingValueStrategy, Table,
    analyze::{DateRange, MonthlyRevenue},
};

fn standard_analyzer() -> DataAnalyzer {
    let raw = load_fixture("sales_standard.csv");
    let (mapped, _) = ColumnMapper::new().map_table(&raw).unwrap();
    let (cleaned, _) = DataCleaner::new().clean_all(&mapped, MissingValueStrategy::Fill);
    DataAnalyzer::new(&cleaned)
}

#[test]
fn two_month_growth_scenario() {
    let table = canonical_table(&[
        &["2024-01-05", "Widget", "East", "100", "2"],
        &["2024-02-05", "Widget", "East", "50", "1"],
    ]);
    let monthly = DataAnalyzer::new(&table)
        .calculate_monthly_growth_rate()
        .unwrap();
    assert_eq!(
        monthly,
        vec![
            MonthlyRevenue {
                month: "2024-01".to_string(),
                revenue: 100.0,
                growth_rate: 0.0
            },
            MonthlyRevenue {
                month: "2024-02".to_string(),
                revenue: 50.0,
                growth_rate: -50.0
            },
        ]
    );
}

#[test]
fn single_month_has_zero_growth() {
    let table = canonical_table(&[
        &["2024-03-01", "Widget", "East", "10", "1"],
        &["2024-03-31", "Gadget", "West", "20", "1"],
    ]);
    let monthly = DataAnalyzer::new(&table)
        .calculate_monthly_growth_rate()
        .unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].growth_rate, 0.0);
    assert_eq!(monthly[0].revenue, 30.0);
}

#[test]
fn growth_after_zero_revenue_month_is_zero() {
    let table = canonical_table(&[
        &["2024-01-05", "Widget", "East", "0", "1"],
        &["2024-02-05", "Widget", "East", "40", "1"],
    ]);
    let monthly = DataAnalyzer::new(&table)
        .calculate_monthly_growth_rate()
        .unwrap();
    assert_eq!(monthly[1].growth_rate, 0.0);
}

#[test]
fn estimated_cost_is_sixty_percent_of_revenue() {
    let table = canonical_table(&[&["2024-01-05", "Widget", "East", "100", "1"]]);
    let profit = DataAnalyzer::new(&table)
        .calculate_profit_margin(None)
        .unwrap();
    assert_eq!(profit.len(), 1);
    assert!(approx_eq(profit[0].cost, 60.0));
    assert!(approx_eq(profit[0].profit, 40.0));
    assert!(approx_eq(profit[0].profit_margin, 40.0));
}

#[test]
fn profit_uses_cost_column_and_averages_row_margins() {
    let analyzer = standard_analyzer();
    let profit = analyzer.calculate_profit_margin(Some("Unit Cost")).unwrap();
    let products = profit.iter().map(|p| p.product.as_str()).collect::<Vec<_>>();
    assert_eq!(products, vec!["Gizmo", "Widget", "Gadget"]);
    assert!(approx_eq(profit[0].profit, 350.0));
    assert!(approx_eq(profit[1].cost, 99.0));
    assert!(approx_eq(profit[1].profit_margin, 70.0));
    assert!(approx_eq(profit[2].profit_margin, 40.0));
}

#[test]
fn absent_cost_column_falls_back_to_estimate() {
    let analyzer = standard_analyzer();
    let profit = analyzer.calculate_profit_margin(Some("COGS")).unwrap();
    assert!(profit.iter().all(|p| approx_eq(p.profit_margin, 40.0)));
}

#[test]
fn margin_mean_excludes_zero_revenue_rows() {
    let table = canonical_table(&[
        &["2024-01-05", "Widget", "East", "100", "1"],
        &["2024-01-06", "Widget", "East", "0", "1"],
    ]);
    let profit = DataAnalyzer::new(&table)
        .calculate_profit_margin(None)
        .unwrap();
    assert!(approx_eq(profit[0].profit_margin, 40.0));
}

#[test]
fn standard_fixture_rankings() {
    let analyzer = standard_analyzer();
    assert!(approx_eq(analyzer.calculate_total_revenue().unwrap(), 1555.0));

    let top = analyzer.get_top_products(2).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].product, "Gizmo");
    assert!(approx_eq(top[0].total_revenue, 700.0));
    assert_eq!(top[1].product, "Gadget");

    let regions = analyzer.get_region_wise_revenue().unwrap();
    let order = regions.iter().map(|r| r.region.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["East", "West", "South", "North"]);

    let monthly = analyzer.calculate_monthly_growth_rate().unwrap();
    let months = monthly.iter().map(|m| m.month.as_str()).collect::<Vec<_>>();
    assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
    assert!((monthly[1].growth_rate - 36.046_511_627).abs() < 1e-6);
}

#[test]
fn summary_statistics_for_standard_fixture() {
    let summary = standard_analyzer().get_summary_statistics().unwrap();
    assert_eq!(summary.total_transactions, 9);
    assert!(approx_eq(summary.total_revenue, 1555.0));
    assert!(approx_eq(summary.average_revenue_per_transaction, 1555.0 / 9.0));
    assert_eq!(summary.unique_products, 3);
    assert_eq!(summary.unique_regions, 4);
    assert_eq!(
        summary.date_range,
        Some(DateRange {
            start: "2024-01-05".to_string(),
            end: "2024-03-28".to_string()
        })
    );
}

#[test]
fn every_aggregate_requires_its_columns() {
    let table = Table::from_str_rows(&["date", "quantity"], &[&["2024-01-01", "1"]]);
    let analyzer = DataAnalyzer::new(&table);
    assert_eq!(
        analyzer.calculate_total_revenue().unwrap_err().missing,
        vec![CanonicalField::Revenue]
    );
    assert!(analyzer.get_top_products(5).is_err());
    assert!(analyzer.get_region_wise_revenue().is_err());
    assert!(analyzer.calculate_monthly_growth_rate().is_err());
    assert!(analyzer.calculate_profit_margin(None).is_err());
    assert!(analyzer.get_summary_statistics().is_err());
}

#[test]
fn analyzer_keeps_its_own_copy() {
    let table = canonical_table(&[&["2024-01-05", "Widget", "East", "100", "1"]]);
    let analyzer = DataAnalyzer::new(&table);
    drop(table);
    assert!(approx_eq(analyzer.calculate_total_revenue().unwrap(), 100.0));
}

fn revenue_table() -> impl Strategy<Value = Table> {
    let row = (
        proptest::sample::select(vec!["2024-01-05", "2024-02-10", "2024-03-15", ""]),
        proptest::sample::select(vec!["Widget", "Gadget", "Gizmo", ""]),
        proptest::sample::select(vec!["East", "West", ""]),
        proptest::option::of(0u32..10_000),
    );
    proptest::collection::vec(row, 0..40).prop_map(|rows| {
        let records = rows
            .into_iter()
            .map(|(date, product, region, revenue)| {
                vec![
                    date.to_string(),
                    product.to_string(),
                    region.to_string(),
                    revenue.map(|r| r.to_string()).unwrap_or_default(),
                    "1".to_string(),
                ]
            })
            .collect();
        let headers = common::CANONICAL.iter().map(|h| h.to_string()).collect();
        Table::from_text_rows(headers, records)
    })
}

proptest! {
    #[test]
    fn region_revenue_partitions_total(table in revenue_table()) {
        let analyzer = DataAnalyzer::new(&table);
        let total = analyzer.calculate_total_revenue().unwrap();
        let by_region = analyzer
            .get_region_wise_revenue()
            .unwrap()
            .iter()
            .map(|r| r.total_revenue)
            .sum::<f64>();
        prop_assert!((total - by_region).abs() < 1e-6);
    }

    #[test]
    fn top_products_bounded_and_sorted(table in revenue_table(), n in 0usize..6) {
        let top = DataAnalyzer::new(&table).get_top_products(n).unwrap();
        prop_assert!(top.len() <= n);
        for pair in top.windows(2) {
            prop_assert!(pair[0].total_revenue >= pair[1].total_revenue);
        }
    }
}
