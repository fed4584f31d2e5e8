//! Aggregations over a canonical table.
//!
//! Grouped results keep groups in order of first appearance before a stable
//! descending sort, so ties are reported in row order.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    clean::UNKNOWN_LABEL,
    data::Value,
    error::SchemaError,
    frame::Table,
    mapper::CanonicalField,
    stats::NumericSummary,
};

pub const DEFAULT_TOP_N: usize = 10;
/// Share of revenue assumed to be cost when no cost column is available.
pub const ESTIMATED_COST_RATIO: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product: String,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRevenue {
    pub region: String,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    /// Calendar month as `YYYY-MM`.
    pub month: String,
    pub revenue: f64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductProfit {
    pub product: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    /// Mean of the per-row margins, in percent.
    pub profit_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_transactions: usize,
    pub total_revenue: f64,
    pub average_revenue_per_transaction: f64,
    pub unique_products: usize,
    pub unique_regions: usize,
    pub date_range: Option<DateRange>,
}

/// Read-only view over a canonical table. The analyzer owns its own copy.
#[derive(Debug, Clone)]
pub struct DataAnalyzer {
    table: Table,
}

impl DataAnalyzer {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn calculate_total_revenue(&self) -> Result<f64, SchemaError> {
        let revenue = self.require(&[CanonicalField::Revenue])?[0];
        Ok(self.revenues(revenue).sum())
    }

    pub fn get_top_products(&self, n: usize) -> Result<Vec<ProductRevenue>, SchemaError> {
        let columns = self.require(&[CanonicalField::Product, CanonicalField::Revenue])?;
        let mut products = self
            .sum_by_group(columns[0], columns[1])
            .into_iter()
            .map(|(product, total_revenue)| ProductRevenue {
                product,
                total_revenue,
            })
            .collect::<Vec<_>>();
        products.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
        products.truncate(n);
        Ok(products)
    }

    pub fn get_region_wise_revenue(&self) -> Result<Vec<RegionRevenue>, SchemaError> {
        let columns = self.require(&[CanonicalField::Region, CanonicalField::Revenue])?;
        let mut regions = self
            .sum_by_group(columns[0], columns[1])
            .into_iter()
            .map(|(region, total_revenue)| RegionRevenue {
                region,
                total_revenue,
            })
            .collect::<Vec<_>>();
        regions.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
        Ok(regions)
    }

    /// Revenue per calendar month with percentage change against the
    /// previous month. Rows without a usable date are left out.
    pub fn calculate_monthly_growth_rate(&self) -> Result<Vec<MonthlyRevenue>, SchemaError> {
        let columns = self.require(&[CanonicalField::Date, CanonicalField::Revenue])?;
        let (date_idx, revenue_idx) = (columns[0], columns[1]);

        let mut undated = 0usize;
        let buckets = self
            .table
            .rows()
            .iter()
            .filter_map(|row| {
                let date = row[date_idx].as_ref().and_then(Value::as_date);
                if date.is_none() {
                    undated += 1;
                }
                let revenue = row[revenue_idx].as_ref().and_then(Value::as_number).unwrap_or(0.0);
                date.map(|date| ((date.year(), date.month()), revenue))
            })
            .into_grouping_map()
            .sum();
        if undated > 0 {
            debug!("{undated} row(s) without a usable date left out of monthly revenue");
        }

        let mut previous: Option<f64> = None;
        let monthly = buckets
            .into_iter()
            .sorted_by_key(|(month, _)| *month)
            .map(|((year, month), revenue)| {
                let growth_rate = previous.map_or(0.0, |prev| growth(prev, revenue));
                previous = Some(revenue);
                MonthlyRevenue {
                    month: format!("{year:04}-{month:02}"),
                    revenue,
                    growth_rate,
                }
            })
            .collect();
        Ok(monthly)
    }

    /// Per-product profit. `cost_column` is used when given and present;
    /// otherwise cost is estimated as 60% of revenue. Rows with zero or
    /// missing revenue do not contribute a margin.
    pub fn calculate_profit_margin(
        &self,
        cost_column: Option<&str>,
    ) -> Result<Vec<ProductProfit>, SchemaError> {
        let columns = self.require(&[CanonicalField::Product, CanonicalField::Revenue])?;
        let (product_idx, revenue_idx) = (columns[0], columns[1]);
        let cost_idx = match cost_column {
            Some(name) => {
                let idx = self.table.column_index(name);
                if idx.is_none() {
                    warn!("Cost column '{name}' not found; estimating cost as 60% of revenue");
                }
                idx
            }
            None => None,
        };

        #[derive(Default)]
        struct Accumulator {
            revenue: f64,
            cost: f64,
            margins: Vec<f64>,
        }

        let mut order = Vec::new();
        let mut groups: HashMap<String, Accumulator> = HashMap::new();
        for row in self.table.rows() {
            let product = group_label(row[product_idx].as_ref());
            let revenue = row[revenue_idx].as_ref().and_then(Value::as_number);
            let revenue_amount = revenue.unwrap_or(0.0);
            let cost = cost_idx
                .and_then(|idx| row[idx].as_ref())
                .and_then(Value::as_number)
                .unwrap_or(revenue_amount * ESTIMATED_COST_RATIO);
            let entry = groups.entry(product.clone()).or_insert_with(|| {
                order.push(product);
                Accumulator::default()
            });
            entry.revenue += revenue_amount;
            entry.cost += cost;
            if let Some(revenue) = revenue.filter(|r| *r != 0.0) {
                entry.margins.push((revenue - cost) / revenue * 100.0);
            }
        }

        let mut profits = order
            .into_iter()
            .filter_map(|product| {
                let acc = groups.remove(&product)?;
                let profit_margin = if acc.margins.is_empty() {
                    0.0
                } else {
                    acc.margins.iter().sum::<f64>() / acc.margins.len() as f64
                };
                Some(ProductProfit {
                    product,
                    revenue: acc.revenue,
                    cost: acc.cost,
                    profit: acc.revenue - acc.cost,
                    profit_margin,
                })
            })
            .collect::<Vec<_>>();
        profits.sort_by(|a, b| b.profit.total_cmp(&a.profit));
        Ok(profits)
    }

    pub fn get_summary_statistics(&self) -> Result<SummaryStatistics, SchemaError> {
        let total_revenue = self.calculate_total_revenue()?;
        let revenue_idx = self.require(&[CanonicalField::Revenue])?[0];
        let total_transactions = self.table.row_count();
        // Mean over present revenue cells only.
        let average_revenue_per_transaction =
            NumericSummary::from_values(self.revenues(revenue_idx))
                .mean()
                .unwrap_or(0.0);
        Ok(SummaryStatistics {
            total_transactions,
            total_revenue,
            average_revenue_per_transaction,
            unique_products: self.distinct_count(CanonicalField::Product),
            unique_regions: self.distinct_count(CanonicalField::Region),
            date_range: self.date_range(),
        })
    }

    fn require(&self, fields: &[CanonicalField]) -> Result<Vec<usize>, SchemaError> {
        let mut indices = Vec::with_capacity(fields.len());
        let mut missing = Vec::new();
        for field in fields {
            match self.table.column_index(field.as_str()) {
                Some(idx) => indices.push(idx),
                None => missing.push(*field),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(SchemaError::missing(missing))
        }
    }

    fn revenues(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.table.column(index).filter_map(|cell| cell?.as_number())
    }

    /// Revenue summed per group label, groups in order of first appearance.
    fn sum_by_group(&self, key_idx: usize, revenue_idx: usize) -> Vec<(String, f64)> {
        let mut totals: Vec<(String, f64)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in self.table.rows() {
            let key = group_label(row[key_idx].as_ref());
            let revenue = row[revenue_idx].as_ref().and_then(Value::as_number).unwrap_or(0.0);
            match positions.get(&key) {
                Some(&pos) => totals[pos].1 += revenue,
                None => {
                    positions.insert(key.clone(), totals.len());
                    totals.push((key, revenue));
                }
            }
        }
        totals
    }

    fn distinct_count(&self, field: CanonicalField) -> usize {
        self.table
            .column_index(field.as_str())
            .map(|idx| {
                self.table
                    .column(idx)
                    .flatten()
                    .map(Value::as_display)
                    .unique()
                    .count()
            })
            .unwrap_or(0)
    }

    fn date_range(&self) -> Option<DateRange> {
        let idx = self.table.column_index(CanonicalField::Date.as_str())?;
        let (start, end) = self
            .table
            .column(idx)
            .filter_map(|cell| cell?.as_date())
            .minmax()
            .into_option()?;
        Some(DateRange {
            start: format_date(start),
            end: format_date(end),
        })
    }
}

fn group_label(cell: Option<&Value>) -> String {
    cell.map(Value::as_display)
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

fn growth(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let rate = (current - previous) / previous * 100.0;
    if rate.is_finite() { rate } else { 0.0 }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
