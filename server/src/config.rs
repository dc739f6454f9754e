//! Configuration for the questbook ledger
//!
//! Paths are resolved with the following precedence:
//! 1. QUESTBOOK_* environment variable
//! 2. Under ~/.config/questbook/data (production default)
//! 3. Under ./data (fallback for development)
//!
//! Economy rules come from an optional TOML file; every key left out keeps
//! the community's published default.

use rules::{EconomyRules, RulesError};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = ".config/questbook/data";
const DEV_DATA_DIR: &str = "./data";
const WORKBOOK_FILE: &str = "workbook.json";
const LOG_DIR: &str = "logs";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read rules file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse rules file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid rules in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: RulesError,
    },
}

/// Get the data directory.
///
/// Priority:
/// 1. QUESTBOOK_DATA_DIR env variable if set
/// 2. $HOME/.config/questbook/data if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUESTBOOK_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Workbook file: QUESTBOOK_WORKBOOK, else `workbook.json` in the data directory.
pub fn get_workbook_path() -> PathBuf {
    std::env::var("QUESTBOOK_WORKBOOK")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join(WORKBOOK_FILE))
}

/// Log directory: QUESTBOOK_LOG_DIR, else `logs` in the data directory.
pub fn get_log_dir() -> PathBuf {
    std::env::var("QUESTBOOK_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join(LOG_DIR))
}

/// Rules file named by QUESTBOOK_RULES, if any.
pub fn get_rules_path() -> Option<PathBuf> {
    std::env::var_os("QUESTBOOK_RULES").map(PathBuf::from)
}

/// Load economy rules from `path`, or the defaults when there is none.
pub fn load_rules(path: Option<&Path>) -> Result<EconomyRules, ConfigError> {
    let Some(path) = path else {
        return Ok(EconomyRules::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let rules: EconomyRules = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    rules.validate().map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Loaded economy rules from {:?}", path);
    Ok(rules)
}
