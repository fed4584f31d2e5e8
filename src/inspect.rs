use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    cli::MapArgs,
    config::{ConfigOverrides, DashboardConfig},
    io_utils,
    mapper::ColumnMapping,
    pipeline,
    table::{Align, print_table},
    validate::{QualityIssue, TableInfo, ValidationReport, quality_issues, table_info},
};

#[derive(Debug, Serialize)]
struct MappingReport<'a> {
    mapping: &'a ColumnMapping,
    validation: &'a ValidationReport,
    quality: &'a [QualityIssue],
    info: &'a TableInfo,
}

/// Prints what the mapper and validator make of a file. An incomplete
/// mapping is reported, not treated as a failure.
pub fn execute(args: &MapArgs) -> Result<()> {
    let config = DashboardConfig::load_optional(args.config.as_deref())?;
    let options = config.resolve(&ConfigOverrides::default())?;
    let raw = io_utils::load_table(&args.input.input, &args.input.load_options())?;
    let (mapped, mapping, validation) = pipeline::inspect(&raw, &options)?;
    let quality = quality_issues(&mapped);
    let info = table_info(&raw);

    if args.json {
        let report = MappingReport {
            mapping: &mapping,
            validation: &validation,
            quality: &quality,
            info: &info,
        };
        let json = serde_json::to_string_pretty(&report).context("Serializing mapping report")?;
        println!("{json}");
        return Ok(());
    }

    println!("[COLUMN MAPPING]");
    let rows = info
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                mapping
                    .get(&column.name)
                    .map(|field| field.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                column.kind.to_string(),
                column.missing.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(
        &["column", "canonical", "kind", "missing"],
        &rows,
        &[Align::Left, Align::Left, Align::Left, Align::Right],
    );
    println!("{} row(s)", info.rows);

    println!();
    println!("[VALIDATION]");
    if validation.is_valid() {
        println!("All required columns present.");
    } else {
        for candidate in &validation.candidates {
            let found = if candidate.columns.is_empty() {
                "none".to_string()
            } else {
                candidate.columns.join(", ")
            };
            println!(
                "Missing {} ({}); related columns: {found}",
                candidate.field,
                candidate.field.description()
            );
        }
    }
    for issue in &quality {
        println!("Warning: {issue}");
    }
    Ok(())
}
