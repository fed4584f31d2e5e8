pub mod analyze;
pub mod clean;
pub mod clean_cmd;
pub mod cli;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod frame;
pub mod inspect;
pub mod io_utils;
pub mod mapper;
pub mod pipeline;
pub mod stats;
pub mod summary;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    analyze::DataAnalyzer,
    clean::{DataCleaner, MissingValueStrategy, OutlierMethod},
    error::{ConfigurationError, PipelineError, SchemaError},
    frame::Table,
    mapper::{CanonicalField, ColumnMapper, ColumnMapping},
    validate::SchemaValidator,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("{:?}", cli.command);
    match cli.command {
        Commands::Summary(args) => summary::execute(&args),
        Commands::Map(args) => inspect::execute(&args),
        Commands::Clean(args) => clean_cmd::execute(&args),
        Commands::Convert(args) => convert::execute(&args),
    }
}
