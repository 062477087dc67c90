//! INI file configuration adapter.

use crate::domain::error::StockError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| StockError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[server]
listen = 0.0.0.0:8080

[history]
source = csv
data_dir = /srv/prices
timeout_ms = 2500
cache_ttl_secs = 0

[prediction]
spread_weight = 7.5
"#;

    #[test]
    fn reads_strings_and_numbers() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("server", "listen"), Some("0.0.0.0:8080".to_string()));
        assert_eq!(adapter.get_int("history", "timeout_ms", 0), 2500);
        assert_eq!(adapter.get_int("history", "cache_ttl_secs", 300), 0);
        assert_eq!(adapter.get_double("prediction", "spread_weight", 0.0), 7.5);
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("history", "missing"), None);
        assert_eq!(adapter.get_string("nope", "key"), None);
        assert_eq!(adapter.get_int("polygon", "max_pages", 5), 5);
        assert_eq!(adapter.get_double("prediction", "crossover_bonus", 20.0), 20.0);
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter =
            FileConfigAdapter::from_string("[history]\ntimeout_ms = soon\n[prediction]\nspread_weight = lots\n").unwrap();
        assert_eq!(adapter.get_int("history", "timeout_ms", 10_000), 10_000);
        assert_eq!(adapter.get_double("prediction", "spread_weight", 5.0), 5.0);
    }

    #[test]
    fn get_nonempty_skips_blank_values() {
        let adapter = FileConfigAdapter::from_string("[polygon]\napi_key =   \n").unwrap();
        assert_eq!(adapter.get_nonempty("polygon", "api_key"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[catalog]\npath = /srv/symbols.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("catalog", "path"), Some("/srv/symbols.csv".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/stocklens.ini");
        assert!(matches!(result, Err(StockError::ConfigParse { ref file, .. }) if file.ends_with("stocklens.ini")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }
}
