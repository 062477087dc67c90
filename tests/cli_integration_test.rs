//! CLI wiring tests: config builders, CSV-backed sources on disk, catalog
//! refresh and command exit codes.

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use stocklens::adapters::file_config_adapter::FileConfigAdapter;
use stocklens::cli::{self, Cli};
use stocklens::domain::catalog::{SymbolCatalog, SymbolRecord};
use stocklens::domain::date_range::DateRange;
use stocklens::domain::error::StockError;
use stocklens::domain::history::{HistoryQuery, HistoryService};
use stocklens::domain::interval::Interval;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_debug(code: ExitCode) -> String {
    format!("{:?}", code)
}

/// Writes a price directory and symbol list, returning the dir and a matching INI.
fn csv_fixture() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let prices = dir.path().join("prices");
    fs::create_dir(&prices).unwrap();

    let mut csv = String::from("date,open,high,low,close,volume\n");
    for bar in generate_bars("2024-01-01", 40, 100.0, 1.0) {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    fs::write(prices.join("AAPL.csv"), csv).unwrap();

    let symbols = dir.path().join("symbols.csv");
    fs::write(&symbols, "symbol,name\nAAPL,Apple Inc.\nAAP,Advance Auto Parts\nSNAP,Snap Inc.\n").unwrap();

    let ini = format!(
        "[history]\nsource = csv\ndata_dir = {}\ncache_ttl_secs = 60\n\n[catalog]\nsource = csv\npath = {}\n",
        prices.display(),
        symbols.display()
    );
    (dir, ini)
}

mod config_builders {
    use super::*;

    #[test]
    fn prediction_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[prediction]\n").unwrap();
        let config = cli::build_prediction_config(&adapter);
        assert!((config.spread_weight - 5.0).abs() < f64::EPSILON);
        assert!((config.max_spread_points - 50.0).abs() < f64::EPSILON);
        assert!((config.alignment_weight - 6.0).abs() < f64::EPSILON);
        assert!((config.crossover_bonus - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.crossover_lookback, 5);
    }

    #[test]
    fn prediction_config_overrides() {
        let ini = "[prediction]\nspread_weight = 2.5\ncrossover_bonus = 0\ncrossover_lookback = 12\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let config = cli::build_prediction_config(&adapter);
        assert!((config.spread_weight - 2.5).abs() < f64::EPSILON);
        assert!(config.crossover_bonus.abs() < f64::EPSILON);
        assert_eq!(config.crossover_lookback, 12);
    }

    #[test]
    fn history_settings_from_config() {
        let ini = "[history]\ntimeout_ms = 1500\nmax_start = 2000-01-03\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let settings = cli::build_history_settings(&adapter).unwrap();
        assert_eq!(settings.timeout, Duration::from_millis(1500));
        assert_eq!(settings.max_start, date(2000, 1, 3));
    }

    #[test]
    fn history_settings_defaults() {
        let adapter = FileConfigAdapter::from_string("[history]\n").unwrap();
        let settings = cli::build_history_settings(&adapter).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.max_start, date(1970, 1, 1));
    }

    #[test]
    fn history_settings_reject_bad_max_start() {
        let adapter = FileConfigAdapter::from_string("[history]\nmax_start = yesterday\n").unwrap();
        let err = cli::build_history_settings(&adapter).unwrap_err();
        assert!(matches!(err, StockError::ConfigInvalid { ref key, .. } if key == "max_start"));
    }

    #[test]
    fn csv_source_requires_data_dir() {
        let adapter = FileConfigAdapter::from_string("[history]\nsource = csv\n").unwrap();
        let err = cli::build_history_source(&adapter, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, StockError::ConfigMissing { ref key, .. } if key == "data_dir"));
    }

    #[test]
    fn unknown_catalog_source_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[catalog]\nsource = ftp\n").unwrap();
        let err = cli::build_symbol_source(&adapter, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, StockError::ConfigInvalid { ref key, .. } if key == "source"));
    }
}

mod query_building {
    use super::*;

    #[test]
    fn named_range_and_interval() {
        let query = cli::build_query("msft", "6mo", None, None, "weekly", true).unwrap();
        assert_eq!(query.symbol, "msft");
        assert_eq!(query.date_range, "6mo".parse::<DateRange>().unwrap());
        assert_eq!(query.interval, Interval::Weekly);
        assert!(query.auto_predict);
    }

    #[test]
    fn explicit_dates_override_range() {
        let query =
            cli::build_query("AAPL", "max", Some("2024-01-01"), Some("2024-02-01"), "1d", false).unwrap();
        assert_eq!(
            query.date_range,
            DateRange::between(date(2024, 1, 1), date(2024, 2, 1)).unwrap()
        );
    }

    #[test]
    fn lone_start_is_rejected() {
        let err = cli::build_query("AAPL", "max", Some("2024-01-01"), None, "1d", false).unwrap_err();
        assert!(matches!(err, StockError::Validation { .. }));
    }

    #[test]
    fn bad_interval_is_rejected() {
        let err = cli::build_query("AAPL", "max", None, None, "1h", false).unwrap_err();
        assert!(matches!(err, StockError::Validation { ref field, .. } if field == "interval"));
    }
}

mod csv_backed {
    use super::*;

    #[tokio::test]
    async fn history_pipeline_reads_csv_files() {
        let (_dir, ini) = csv_fixture();
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let settings = cli::build_history_settings(&adapter).unwrap();
        let source = cli::build_history_source(&adapter, settings.timeout).unwrap();
        let service = HistoryService::new(source, settings);

        let range = DateRange::between(date(2024, 1, 1), date(2024, 2, 9)).unwrap();
        let result = service
            .get_history(&HistoryQuery::new("aapl").with_range(range))
            .await
            .unwrap();
        assert_eq!(result.series.len(), 40);
        assert_eq!(result.records()[39].ma20, Some(129.5));

        let err = service
            .get_history(&HistoryQuery::new("MSFT").with_range(range))
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::UnknownSymbol { .. }));
    }

    #[tokio::test]
    async fn catalog_loads_from_symbol_file() {
        let (_dir, ini) = csv_fixture();
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let source = cli::build_symbol_source(&adapter, Duration::from_secs(1)).unwrap();
        let catalog = cli::load_catalog(source.as_ref()).await.unwrap();
        assert_eq!(catalog.len(), 3);
        let symbols: Vec<String> = catalog.search("aap", 20).into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["AAP", "AAPL", "SNAP"]);
    }
}

mod catalog_refresh {
    use super::*;

    #[tokio::test]
    async fn refresh_swaps_catalog_and_survives_failures() {
        let source = Arc::new(MockSymbolSource::new(vec![SymbolRecord::new("NVDA")]));
        let catalog = Arc::new(SymbolCatalog::new(sample_symbols()));
        let handle = cli::spawn_catalog_refresh(
            Arc::clone(&catalog),
            source.clone(),
            Duration::from_millis(30),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(catalog.contains("NVDA"));
        assert_eq!(catalog.len(), 1);

        source.set(Err("listing endpoint down".into()));
        let loads_before = source.loads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(source.loads.load(Ordering::SeqCst) > loads_before);
        assert!(catalog.contains("NVDA"));

        handle.abort();
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_config_accepts_good_file() {
        let (_dir, ini) = csv_fixture();
        let file = write_temp_ini(&ini);
        let cli = Cli::parse_from(["stocklens", "validate-config", "--config", file.path().to_str().unwrap()]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::SUCCESS));
    }

    #[test]
    fn validate_config_reports_config_exit_code() {
        let file = write_temp_ini("[history]\nsource = csv\n");
        let cli = Cli::parse_from(["stocklens", "validate-config", "--config", file.path().to_str().unwrap()]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::from(2)));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let cli = Cli::parse_from(["stocklens", "validate-config", "--config", "/nonexistent/stocklens.ini"]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::from(2)));
    }

    #[test]
    fn history_command_succeeds_for_known_symbol() {
        let (_dir, ini) = csv_fixture();
        let file = write_temp_ini(&ini);
        let cli = Cli::parse_from([
            "stocklens",
            "history",
            "--config",
            file.path().to_str().unwrap(),
            "AAPL",
            "--start",
            "2024-01-01",
            "--end",
            "2024-02-09",
            "--interval",
            "1wk",
            "--predict",
        ]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::SUCCESS));
    }

    #[test]
    fn history_command_unknown_symbol_exit_code() {
        let (_dir, ini) = csv_fixture();
        let file = write_temp_ini(&ini);
        let cli = Cli::parse_from([
            "stocklens",
            "history",
            "--config",
            file.path().to_str().unwrap(),
            "ZZZZ",
        ]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::from(4)));
    }

    #[test]
    fn history_command_bad_interval_is_validation_exit_code() {
        let (_dir, ini) = csv_fixture();
        let file = write_temp_ini(&ini);
        let cli = Cli::parse_from([
            "stocklens",
            "history",
            "--config",
            file.path().to_str().unwrap(),
            "AAPL",
            "--interval",
            "15m",
        ]);
        assert_eq!(exit_debug(cli::run(cli)), exit_debug(ExitCode::from(3)));
    }

    #[test]
    fn search_and_list_commands_succeed() {
        let (_dir, ini) = csv_fixture();
        let file = write_temp_ini(&ini);
        let path = file.path().to_str().unwrap();
        let search = Cli::parse_from(["stocklens", "search", "--config", path, "AAP"]);
        assert_eq!(exit_debug(cli::run(search)), exit_debug(ExitCode::SUCCESS));
        let list = Cli::parse_from(["stocklens", "list-symbols", "--config", path]);
        assert_eq!(exit_debug(cli::run(list)), exit_debug(ExitCode::SUCCESS));
    }
}
