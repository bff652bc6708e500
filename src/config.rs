use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the per-organization data directories.
    pub data_dir: PathBuf,
    /// Listen address, e.g. `0.0.0.0:5000`.
    pub bind: String,
    /// Buffered events per organization room before slow dashboards lag.
    pub room_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            data_dir: PathBuf::from(env_str("PROCTORD_DATA_DIR", "data")),
            bind: env_str("PROCTORD_BIND", "0.0.0.0:5000"),
            room_capacity: env_usize("PROCTORD_ROOM_CAPACITY", 256),
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name).ok().unwrap_or_else(|| default.to_string())
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
