use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    analyze::SummaryStatistics,
    cli::SummaryArgs,
    config::DashboardConfig,
    error::PipelineError,
    io_utils,
    pipeline::{self, DashboardReport, PipelineOptions},
    table::{Align, format_count, format_currency, format_percent, print_table},
};

const PROFIT_ROWS: usize = 5;

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let options = resolve_options(args)?;
    let raw = io_utils::load_table(&args.input.input, &args.input.load_options())?;
    let (prepared, report) = match pipeline::run(&raw, &options) {
        Ok(result) => result,
        Err(PipelineError::Schema(err)) => bail!("{}", err.diagnostic().trim_end()),
        Err(err) => return Err(err.into()),
    };
    info!(
        "Analyzed {} cleaned row(s) from {:?}",
        prepared.table.row_count(),
        args.input.input
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Serializing dashboard report")?;
        println!("{json}");
    } else {
        print_report(&report, &options);
    }
    Ok(())
}

fn resolve_options(args: &SummaryArgs) -> Result<PipelineOptions> {
    let config = DashboardConfig::load_optional(args.pipeline.config.as_deref())?;
    Ok(config.resolve(&args.pipeline.overrides(args.profit))?)
}

fn print_report(report: &DashboardReport, options: &PipelineOptions) {
    print_summary(&report.summary);

    println!();
    println!("[TOP {} PRODUCTS BY REVENUE]", options.top_n);
    let rows = report
        .top_products
        .iter()
        .map(|p| vec![p.product.clone(), format_currency(p.total_revenue)])
        .collect::<Vec<_>>();
    print_table(&["product", "total_revenue"], &rows, &[Align::Left, Align::Right]);

    println!();
    println!("[REGION-WISE REVENUE]");
    let rows = report
        .region_revenue
        .iter()
        .map(|r| {
            vec![
                r.region.clone(),
                format_currency(r.total_revenue),
                format_percent(share(r.total_revenue, report.total_revenue)),
            ]
        })
        .collect::<Vec<_>>();
    print_table(
        &["region", "total_revenue", "share"],
        &rows,
        &[Align::Left, Align::Right, Align::Right],
    );

    println!();
    println!("[MONTHLY REVENUE GROWTH]");
    let rows = report
        .monthly_revenue
        .iter()
        .map(|m| {
            let marker = if m.growth_rate >= 0.0 { "[UP]" } else { "[DOWN]" };
            vec![
                m.month.clone(),
                format_currency(m.revenue),
                format!("{marker} {}", format_percent(m.growth_rate)),
            ]
        })
        .collect::<Vec<_>>();
    print_table(
        &["month", "revenue", "growth_rate"],
        &rows,
        &[Align::Left, Align::Right, Align::Right],
    );

    if let Some(profit) = &report.profit {
        println!();
        println!("[TOP {PROFIT_ROWS} PRODUCTS BY PROFIT MARGIN]");
        let rows = profit
            .iter()
            .take(PROFIT_ROWS)
            .map(|p| {
                vec![
                    p.product.clone(),
                    format_currency(p.revenue),
                    format_currency(p.cost),
                    format_currency(p.profit),
                    format_percent(p.profit_margin),
                ]
            })
            .collect::<Vec<_>>();
        print_table(
            &["product", "revenue", "cost", "profit", "profit_margin"],
            &rows,
            &[Align::Left, Align::Right, Align::Right, Align::Right, Align::Right],
        );
    }
}

fn print_summary(summary: &SummaryStatistics) {
    println!("[SUMMARY STATISTICS]");
    println!("  Total transactions: {}", format_count(summary.total_transactions));
    println!("  Total revenue: {}", format_currency(summary.total_revenue));
    println!(
        "  Average revenue per transaction: {}",
        format_currency(summary.average_revenue_per_transaction)
    );
    println!("  Unique products: {}", format_count(summary.unique_products));
    println!("  Unique regions: {}", format_count(summary.unique_regions));
    match &summary.date_range {
        Some(range) => println!("  Date range: {} to {}", range.start, range.end),
        None => println!("  Date range: n/a"),
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total * 100.0 }
}
