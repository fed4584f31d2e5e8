//! Raw table to dashboard: mapping, the schema gate, cleaning, and analysis.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::Serialize;

use crate::{
    analyze::{
        DEFAULT_TOP_N, DataAnalyzer, MonthlyRevenue, ProductProfit, ProductRevenue, RegionRevenue,
        SummaryStatistics,
    },
    clean::{CleaningReport, DataCleaner, MissingValueStrategy},
    error::{PipelineError, SchemaError},
    frame::Table,
    mapper::{CanonicalField, ColumnMapper, ColumnMapping},
    validate::{QualityIssue, SchemaValidator, ValidationReport, quality_issues},
};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub strategy: MissingValueStrategy,
    pub cost_column: Option<String>,
    pub top_n: usize,
    pub include_profit: bool,
    /// Manual column choices that replace the heuristic for their field.
    pub overrides: BTreeMap<CanonicalField, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategy: MissingValueStrategy::default(),
            cost_column: None,
            top_n: DEFAULT_TOP_N,
            include_profit: false,
            overrides: BTreeMap::new(),
        }
    }
}

/// A mapped, validated, and cleaned table plus the diagnostics gathered on
/// the way.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub mapping: ColumnMapping,
    pub validation: ValidationReport,
    pub quality: Vec<QualityIssue>,
    pub cleaning: CleaningReport,
    pub table: Table,
}

/// Maps and validates without cleaning. Used by callers that only want to
/// show what the mapper and validator made of a file.
pub fn inspect(
    raw: &Table,
    options: &PipelineOptions,
) -> Result<(Table, ColumnMapping, ValidationReport), PipelineError> {
    let mapper = ColumnMapper::with_overrides(options.overrides.clone());
    let (mapped, mapping) = mapper.map_table(raw)?;
    let validation = SchemaValidator::new().validate_mapped(&mapped, &mapping);
    Ok((mapped, mapping, validation))
}

/// Runs the mapper, halts on a failed schema gate, then cleans.
pub fn prepare(raw: &Table, options: &PipelineOptions) -> Result<PreparedData, PipelineError> {
    let (mapped, mapping, validation) = inspect(raw, options)?;
    info!("Mapped {} column(s) to canonical fields", mapping.len());
    validation.clone().into_result()?;

    let quality = quality_issues(&mapped);
    for issue in &quality {
        warn!("{issue}");
    }

    let (table, cleaning) = DataCleaner::new().clean_all(&mapped, options.strategy);
    Ok(PreparedData {
        mapping,
        validation,
        quality,
        cleaning,
        table,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub total_revenue: f64,
    pub top_products: Vec<ProductRevenue>,
    pub region_revenue: Vec<RegionRevenue>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Vec<ProductProfit>>,
    pub summary: SummaryStatistics,
}

impl DashboardReport {
    pub fn build(analyzer: &DataAnalyzer, options: &PipelineOptions) -> Result<Self, SchemaError> {
        let profit = if options.include_profit {
            Some(analyzer.calculate_profit_margin(options.cost_column.as_deref())?)
        } else {
            None
        };
        Ok(Self {
            total_revenue: analyzer.calculate_total_revenue()?,
            top_products: analyzer.get_top_products(options.top_n)?,
            region_revenue: analyzer.get_region_wise_revenue()?,
            monthly_revenue: analyzer.calculate_monthly_growth_rate()?,
            profit,
            summary: analyzer.get_summary_statistics()?,
        })
    }
}

pub fn run(
    raw: &Table,
    options: &PipelineOptions,
) -> Result<(PreparedData, DashboardReport), PipelineError> {
    let prepared = prepare(raw, options)?;
    let analyzer = DataAnalyzer::new(&prepared.table);
    let report = DashboardReport::build(&analyzer, options)?;
    Ok((prepared, report))
}
