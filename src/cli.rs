//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::cache::CachedHistorySource;
use crate::adapters::csv_adapter::{CsvHistorySource, CsvSymbolSource};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::catalog::{SymbolCatalog, SymbolRecord, DEFAULT_SEARCH_LIMIT};
use crate::domain::config_validation::{source_kind, validate_service_config, SOURCE_CSV, SOURCE_POLYGON};
use crate::domain::date_range::{parse_date, DateRange};
use crate::domain::error::StockError;
use crate::domain::history::{HistoryQuery, HistoryService, HistorySettings};
use crate::domain::interval::Interval;
use crate::domain::prediction::PredictionConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::history_port::HistorySource;
use crate::ports::symbol_port::SymbolSource;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3001";

#[derive(Parser, Debug)]
#[command(name = "stocklens", about = "Stock price history with moving averages and trend signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print annotated price history for one symbol as JSON
    History {
        #[arg(short, long)]
        config: PathBuf,
        symbol: String,
        /// max, ytd, 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y or 10y
        #[arg(long, default_value = "max")]
        range: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// 1d, 1wk or 1mo
        #[arg(short, long, default_value = "1d")]
        interval: String,
        /// Attach a buy/sell signal to the last bar
        #[arg(long)]
        predict: bool,
    },
    /// Search the symbol catalog
    Search {
        #[arg(short, long)]
        config: PathBuf,
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// List every symbol in the catalog
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    ValidateConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::History {
            config,
            symbol,
            range,
            start,
            end,
            interval,
            predict,
        } => run_history(
            &config,
            &symbol,
            &range,
            start.as_deref(),
            end.as_deref(),
            &interval,
            predict,
        ),
        Command::Search {
            config,
            query,
            limit,
        } => run_search(&config, &query, limit),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::ValidateConfig { config } => run_validate_config(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Initialises `env_logger` from `[log] level`; `RUST_LOG` still wins.
pub fn init_logging(config: &dyn ConfigPort) {
    let level = config
        .get_nonempty("log", "level")
        .unwrap_or_else(|| "info".to_string());
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

/// Loads, validates and applies logging for a config file.
fn prepare(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    let config = load_config(path)?;
    init_logging(&config);
    validate_service_config(&config).map_err(|err| fail(&err))?;
    Ok(config)
}

fn fail(err: &StockError) -> ExitCode {
    log::error!("{err}");
    eprintln!("error: {err}");
    ExitCode::from(err)
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Runtime::new().map_err(|e| fail(&StockError::Io(e)))
}

pub fn build_prediction_config(config: &dyn ConfigPort) -> PredictionConfig {
    let defaults = PredictionConfig::default();
    let lookback = config.get_int(
        "prediction",
        "crossover_lookback",
        defaults.crossover_lookback as i64,
    );
    PredictionConfig {
        spread_weight: config.get_double("prediction", "spread_weight", defaults.spread_weight),
        max_spread_points: config.get_double(
            "prediction",
            "max_spread_points",
            defaults.max_spread_points,
        ),
        alignment_weight: config.get_double(
            "prediction",
            "alignment_weight",
            defaults.alignment_weight,
        ),
        crossover_bonus: config.get_double("prediction", "crossover_bonus", defaults.crossover_bonus),
        crossover_lookback: usize::try_from(lookback).unwrap_or(defaults.crossover_lookback),
    }
}

pub fn build_history_settings(config: &dyn ConfigPort) -> Result<HistorySettings, StockError> {
    let defaults = HistorySettings::default();
    let timeout_ms = config.get_int("history", "timeout_ms", defaults.timeout.as_millis() as i64);
    let timeout_ms = u64::try_from(timeout_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or_else(|| StockError::ConfigInvalid {
            section: "history".to_string(),
            key: "timeout_ms".to_string(),
            reason: "timeout_ms must be positive".to_string(),
        })?;
    let max_start = match config.get_nonempty("history", "max_start") {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            StockError::ConfigInvalid {
                section: "history".to_string(),
                key: "max_start".to_string(),
                reason: format!("'{raw}' is not a YYYY-MM-DD date"),
            }
        })?,
        None => defaults.max_start,
    };

    Ok(HistorySettings {
        timeout: Duration::from_millis(timeout_ms),
        max_start,
        prediction: build_prediction_config(config),
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, StockError> {
    config
        .get_nonempty(section, key)
        .ok_or_else(|| StockError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

#[cfg(not(feature = "polygon"))]
fn polygon_disabled(section: &str) -> StockError {
    StockError::ConfigInvalid {
        section: section.to_string(),
        key: "source".to_string(),
        reason: "stocklens was built without the polygon feature".to_string(),
    }
}

/// The configured history source, behind the price cache unless `cache_ttl_secs = 0`.
pub fn build_history_source(
    config: &dyn ConfigPort,
    timeout: Duration,
) -> Result<Arc<dyn HistorySource>, StockError> {
    let ttl = Duration::from_secs(config.get_int("history", "cache_ttl_secs", 300).max(0) as u64);
    let kind = source_kind(config, "history");

    let source: Arc<dyn HistorySource> = match kind.as_str() {
        SOURCE_CSV => {
            let dir = required(config, "history", "data_dir")?;
            Arc::new(CachedHistorySource::new(CsvHistorySource::new(dir), ttl))
        }
        #[cfg(feature = "polygon")]
        SOURCE_POLYGON => {
            use crate::adapters::polygon_adapter::PolygonClient;
            let client = PolygonClient::from_config(config, timeout)?;
            Arc::new(CachedHistorySource::new(client, ttl))
        }
        #[cfg(not(feature = "polygon"))]
        SOURCE_POLYGON => return Err(polygon_disabled("history")),
        other => {
            return Err(StockError::ConfigInvalid {
                section: "history".to_string(),
                key: "source".to_string(),
                reason: format!("unknown source '{other}'"),
            });
        }
    };

    log::info!(
        "history source: {} (timeout {} ms, cache ttl {} s)",
        kind,
        timeout.as_millis(),
        ttl.as_secs()
    );
    Ok(source)
}

pub fn build_symbol_source(
    config: &dyn ConfigPort,
    timeout: Duration,
) -> Result<Arc<dyn SymbolSource>, StockError> {
    match source_kind(config, "catalog").as_str() {
        SOURCE_CSV => Ok(Arc::new(CsvSymbolSource::new(required(config, "catalog", "path")?))),
        #[cfg(feature = "polygon")]
        SOURCE_POLYGON => {
            use crate::adapters::polygon_adapter::PolygonClient;
            Ok(Arc::new(PolygonClient::from_config(config, timeout)?))
        }
        #[cfg(not(feature = "polygon"))]
        SOURCE_POLYGON => {
            let _ = timeout;
            Err(polygon_disabled("catalog"))
        }
        other => Err(StockError::ConfigInvalid {
            section: "catalog".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{other}'"),
        }),
    }
}

pub async fn load_catalog(source: &dyn SymbolSource) -> Result<SymbolCatalog, StockError> {
    let records = source.load_symbols().await?;
    let catalog = SymbolCatalog::new(records);
    log::info!("symbol catalog loaded: {} symbols", catalog.len());
    Ok(catalog)
}

/// Reloads the catalog every `every`. A failed reload keeps the current catalog.
pub fn spawn_catalog_refresh(
    catalog: Arc<SymbolCatalog>,
    source: Arc<dyn SymbolSource>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match source.load_symbols().await {
                Ok(records) => catalog.replace(records),
                Err(e) => log::warn!("catalog refresh failed, keeping {} symbols: {}", catalog.len(), e),
            }
        }
    })
}

pub fn build_query(
    symbol: &str,
    range: &str,
    start: Option<&str>,
    end: Option<&str>,
    interval: &str,
    predict: bool,
) -> Result<HistoryQuery, StockError> {
    let date_range = match (start, end) {
        (Some(start), Some(end)) => {
            DateRange::between(parse_date("start", start)?, parse_date("end", end)?)?
        }
        (None, None) => range.parse()?,
        _ => {
            return Err(StockError::validation(
                "date_range",
                "--start and --end must be given together",
            ));
        }
    };
    Ok(HistoryQuery::new(symbol)
        .with_range(date_range)
        .with_interval(interval.parse::<Interval>()?)
        .with_prediction(predict))
}

fn run_history(
    config_path: &PathBuf,
    symbol: &str,
    range: &str,
    start: Option<&str>,
    end: Option<&str>,
    interval: &str,
    predict: bool,
) -> ExitCode {
    let config = match prepare(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let query = match build_query(symbol, range, start, end, interval, predict) {
        Ok(q) => q,
        Err(e) => return fail(&e),
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    let result = rt.block_on(async {
        let settings = build_history_settings(&config)?;
        let source = build_history_source(&config, settings.timeout)?;
        HistoryService::new(source, settings).get_history(&query).await
    });

    match result {
        Ok(annotated) => match serde_json::to_string_pretty(&annotated.records()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(&StockError::Io(std::io::Error::other(e))),
        },
        Err(e) => fail(&e),
    }
}

fn with_catalog(config_path: &PathBuf, f: impl FnOnce(&SymbolCatalog) -> ExitCode) -> ExitCode {
    let config = match prepare(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let catalog = rt.block_on(async {
        let settings = build_history_settings(&config)?;
        let source = build_symbol_source(&config, settings.timeout)?;
        load_catalog(source.as_ref()).await
    });
    match catalog {
        Ok(catalog) => f(&catalog),
        Err(e) => fail(&e),
    }
}

fn print_records(records: &[SymbolRecord]) {
    for record in records {
        match &record.name {
            Some(name) => println!("{}\t{}", record.symbol, name),
            None => println!("{}", record.symbol),
        }
    }
}

fn run_search(config_path: &PathBuf, query: &str, limit: usize) -> ExitCode {
    with_catalog(config_path, |catalog| {
        let matches = catalog.search(query, limit);
        if matches.is_empty() {
            eprintln!("No symbols match '{}'", query);
        }
        print_records(&matches);
        ExitCode::SUCCESS
    })
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    with_catalog(config_path, |catalog| {
        let all = catalog.list_all();
        if all.is_empty() {
            eprintln!("Catalog is empty");
        }
        print_records(&all);
        ExitCode::SUCCESS
    })
}

fn run_validate_config(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match validate_service_config(&config) {
        Ok(()) => {
            println!("Configuration OK: {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        let config = match prepare(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };
        let rt = match runtime() {
            Ok(rt) => rt,
            Err(code) => return code,
        };
        match rt.block_on(serve(config)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}

#[cfg(feature = "web")]
async fn serve(config: FileConfigAdapter) -> Result<(), StockError> {
    use crate::adapters::web::{build_router, AppState};
    use std::net::SocketAddr;

    let settings = build_history_settings(&config)?;
    let history = build_history_source(&config, settings.timeout)?;
    let symbols = build_symbol_source(&config, settings.timeout)?;

    let catalog = Arc::new(match load_catalog(symbols.as_ref()).await {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("symbol catalog unavailable at startup: {}", e);
            SymbolCatalog::default()
        }
    });

    let refresh_secs = config.get_int("catalog", "refresh_secs", 0);
    if refresh_secs > 0 {
        log::info!("catalog refresh every {} s", refresh_secs);
        spawn_catalog_refresh(
            Arc::clone(&catalog),
            symbols,
            Duration::from_secs(refresh_secs as u64),
        );
    }

    let listen = config
        .get_nonempty("server", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen.parse().map_err(|_| StockError::ConfigInvalid {
        section: "server".to_string(),
        key: "listen".to_string(),
        reason: format!("'{listen}' is not a host:port socket address"),
    })?;

    let state = AppState {
        service: Arc::new(HistoryService::new(history, settings)),
        catalog,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
