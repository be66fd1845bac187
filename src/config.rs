//! Process configuration: an rc file overlaid by environment variables.
//!
//! Config supplies defaults (seed, forecast horizon, output formatting); the
//! pipeline itself never reads it, so execution stays parameter-driven.

use std::{
    collections::HashMap,
    env, fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

const ENV_PREFIX: &str = "MODELRUN_";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .modelrunrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay MODELRUN_* environment variables (take precedence)
        for (k, v) in env::vars() {
            if let Some(key) = k.strip_prefix(ENV_PREFIX) {
                if is_config_key(key) {
                    map.insert(key.to_string(), v);
                }
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(v) = env::var(format!("{ENV_PREFIX}{key}")) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    /// Default seed injected as `random_state` when the caller gave none.
    pub fn random_seed(&self) -> u64 {
        self.get_u64("RANDOM_SEED").unwrap_or(42)
    }

    /// Default forecast horizon in days.
    pub fn forecast_horizon(&self) -> usize {
        self.get_usize("FORECAST_HORIZON").unwrap_or(30)
    }

    pub fn log_level(&self) -> String {
        self.get("LOG_LEVEL").unwrap_or_else(|| "warn".to_string())
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &["RANDOM_SEED", "FORECAST_HORIZON", "PRETTY_JSON", "LOG_LEVEL"];
    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("modelrun").join(".modelrunrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("RANDOM_SEED".into(), "42".into());
    m.insert("FORECAST_HORIZON".into(), "30".into());
    m.insert("PRETTY_JSON".into(), "false".into());
    m.insert("LOG_LEVEL".into(), "warn".into());
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_an_rc_file() {
        let cfg = Config::load();
        assert_eq!(cfg.random_seed(), 42);
        assert_eq!(cfg.forecast_horizon(), 30);
    }
}
