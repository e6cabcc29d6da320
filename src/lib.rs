pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod filter;
pub mod io_utils;
pub mod records;
pub mod schema;
pub mod secrets;
pub mod session;
pub mod shell;
pub mod source;
pub mod table;
pub mod temporal;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    config::DashboardConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("restaurant_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Restaurants(args) => handle_restaurants(&args),
        Commands::View(args) => dashboard::execute(&args),
        Commands::Shell(args) => shell::execute(&args),
    }
}

fn handle_restaurants(args: &cli::RestaurantsArgs) -> Result<()> {
    let config = DashboardConfig::load(&args.config)
        .with_context(|| format!("Loading configuration from {:?}", args.config))?;
    debug!("Configured column candidates: {:?}", config.columns);
    let rows = config
        .restaurants
        .iter()
        .map(|(name, entry)| {
            let source = entry
                .data_source(name)
                .map(|ds| ds.describe())
                .unwrap_or_else(|err| format!("<{err}>"));
            vec![name.clone(), source]
        })
        .collect::<Vec<_>>();
    let headers = vec!["restaurant".to_string(), "source".to_string()];
    table::print_table(&headers, &rows);
    info!("Listed {} restaurant(s) from {:?}", rows.len(), args.config);
    Ok(())
}
