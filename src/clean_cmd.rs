use anyhow::{Result, bail};
use log::{info, warn};

use crate::{
    clean::{CleaningEvent, DataCleaner, OutlierMethod},
    cli::CleanArgs,
    config::DashboardConfig,
    error::{ConfigurationError, PipelineError},
    io_utils,
    mapper::CanonicalField,
    pipeline,
};

/// Parses `column:method`, e.g. `revenue:iqr`.
pub fn parse_outlier_directive(
    directive: &str,
) -> Result<(String, OutlierMethod), ConfigurationError> {
    let (column, method) = directive
        .rsplit_once(':')
        .ok_or_else(|| ConfigurationError::InvalidOutlierDirective(directive.to_string()))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(ConfigurationError::InvalidOutlierDirective(
            directive.to_string(),
        ));
    }
    Ok((column.to_string(), method.parse()?))
}

pub fn execute(args: &CleanArgs) -> Result<()> {
    let config = DashboardConfig::load_optional(args.pipeline.config.as_deref())?;
    let options = config.resolve(&args.pipeline.overrides(false))?;
    let directives = args
        .outliers
        .iter()
        .map(|d| parse_outlier_directive(d))
        .collect::<Result<Vec<_>, _>>()?;

    let raw = io_utils::load_table(&args.input.input, &args.input.load_options())?;
    let prepared = match pipeline::prepare(&raw, &options) {
        Ok(prepared) => prepared,
        Err(PipelineError::Schema(err)) => bail!("{}", err.diagnostic().trim_end()),
        Err(err) => return Err(err.into()),
    };

    let cleaner = DataCleaner::new();
    let mut table = prepared.table;
    for (column, method) in directives {
        let step = cleaner.remove_outliers(&table, &column, method);
        if let CleaningEvent::Skipped { reason, .. } = &step.event {
            warn!("Outlier removal skipped: {reason}");
        }
        table = step.table;
    }

    let canonical = CanonicalField::ALL.map(|field| field.as_str());
    let output = table.select(&canonical);
    io_utils::write_table(&output, args.output.as_deref(), None)?;
    info!(
        "Wrote {} cleaned row(s) ({} duplicate(s) removed)",
        output.row_count(),
        prepared.cleaning.duplicates_removed()
    );
    Ok(())
}
