pub mod api;
pub mod config;
pub mod error;
pub mod remote;
pub mod request;
pub mod service;

use crate::config::Config;
use crate::remote::RemoteForecaster;
use crate::service::ForecastService;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowstate_core::{generate_forecast, AuxiliarySignals, LocalModelHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flowstate")]
#[command(about = "Energy-level forecast service")]
struct Cli {
    /// Config file (defaults to ~/.flowstate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP forecast service
    Serve,
    /// Print the built-in sample forecast
    Sample,
    /// Run the heuristic engine once and print the forecast
    Forecast {
        /// Comma-separated primary history
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        history: Vec<f64>,
        /// Number of steps to forecast
        #[arg(long, default_value_t = flowstate_core::DEFAULT_HORIZON as i64, allow_negative_numbers = true)]
        horizon: i64,
        /// Auxiliary signal as name=v1,v2,... (repeatable)
        #[arg(long = "signal", value_parser = parse_signal)]
        signals: Vec<(String, Vec<f64>)>,
    },
}

fn parse_signal(raw: &str) -> Result<(String, Vec<f64>), String> {
    let (name, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=v1,v2,..., got '{}'", raw))?;
    let values = values
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid value '{}' for {}: {}", v, name, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.trim().to_string(), values))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn serve(config: Config) -> Result<()> {
    let remote = RemoteForecaster::from_config(&config.remote)?;
    let local = if remote.is_some() {
        LocalModelHandle::Absent
    } else {
        LocalModelHandle::load(&config.model)
    };

    info!(
        remote_url = ?config.remote.url,
        local_model = local.is_present(),
        sample_only = config.forecast.sample_only,
        "Starting Flowstate forecast service"
    );

    let bind_addr = config.server.bind_addr();
    let service = Arc::new(ForecastService::new(
        config.forecast.clone(),
        remote,
        local,
        config.remote.timeout(),
    ));

    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    rt.block_on(async {
        api::run_api_server(&bind_addr, service)
            .await
            .map_err(|e| anyhow::anyhow!("API server failed: {}", e))
    })
}

fn print_sample() -> Result<()> {
    let sample = ForecastService::heuristic_only().sample();
    println!("{}", serde_json::to_string_pretty(&sample)?);
    Ok(())
}

fn forecast_once(history: &[f64], horizon: i64, signals: Vec<(String, Vec<f64>)>) -> Result<()> {
    let auxiliary: Option<AuxiliarySignals> =
        (!signals.is_empty()).then(|| signals.into_iter().collect());
    let forecast = generate_forecast(history, horizon, auxiliary.as_ref())?;
    let body = serde_json::json!({
        "history": history,
        "forecast_horizon": horizon,
        "forecast": forecast,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize structured logging
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match cli.command {
        None | Some(Commands::Serve) => load_config(&cli).and_then(serve),
        Some(Commands::Sample) => print_sample(),
        Some(Commands::Forecast {
            ref history,
            horizon,
            ref signals,
        }) => forecast_once(history, horizon, signals.clone()),
    };

    if let Err(e) = result {
        let reason = format!("{:#}", e);
        error!(error = %reason, "Fatal Error");
        std::process::exit(1);
    }
}
