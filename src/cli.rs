use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::ConfigOverrides, io_utils::LoadOptions};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sales analytics over arbitrary CSV exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Map, validate, clean, and print the key sales metrics
    Summary(SummaryArgs),
    /// Show the inferred column mapping and the validation report
    Map(MapArgs),
    /// Write the cleaned canonical table as CSV
    Clean(CleanArgs),
    /// Convert a raw export into the five canonical columns
    Convert(ConvertArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (detected when omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl InputArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            encoding: self.input_encoding.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// YAML configuration file (strategy, cost_column, top, include_profit, columns)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Missing-value strategy: fill, drop, or interpolate
    #[arg(long)]
    pub strategy: Option<String>,
    /// Column holding per-row cost for profit analysis
    #[arg(long = "cost-column")]
    pub cost_column: Option<String>,
    /// Number of products in the revenue ranking
    #[arg(long)]
    pub top: Option<usize>,
}

impl PipelineArgs {
    pub fn overrides(&self, include_profit: bool) -> ConfigOverrides {
        ConfigOverrides {
            strategy: self.strategy.clone(),
            cost_column: self.cost_column.clone(),
            top: self.top,
            include_profit,
        }
    }
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// Include per-product profit analysis
    #[arg(long)]
    pub profit: bool,
    /// Emit the dashboard report as JSON instead of text sections
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// YAML configuration file with manual column overrides
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Emit mapping and validation report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Outlier removal directives of the form `column:iqr` or `column:zscore`
    #[arg(long = "outliers", action = clap::ArgAction::Append)]
    pub outliers: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
