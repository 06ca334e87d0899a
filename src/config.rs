use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

/// Server settings, read from the environment (after `.env` is loaded).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub cors_origin: String,
    pub cache_ttl: Duration,
    pub default_study_goal: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            database_url: try_load("DATABASE_URL", "sqlite://studyhabit.db?mode=rwc"),
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:8000"),
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:3000"),
            cache_ttl: Duration::from_secs(try_load("CACHE_TTL_SECS", "300")),
            default_study_goal: try_load("DEFAULT_STUDY_GOAL", "180"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            cache_ttl: Duration::from_secs(300),
            default_study_goal: 180,
        }
    }
}

/// Settings of the `study-timer` client.
#[derive(Clone, Debug)]
pub struct TimerConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub state_path: PathBuf,
    pub request_timeout: Duration,
}

impl TimerConfig {
    pub fn load() -> Self {
        Self {
            api_url: try_load("API_URL", "http://localhost:8000"),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            state_path: PathBuf::from(try_load::<String>("TIMER_STATE_PATH", "timerState.json")),
            request_timeout: Duration::from_secs(try_load("REQUEST_TIMEOUT_SECS", "5")),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            parse_default(key, default)
        }
    }
}

// Defaults are literals in this file, so a failure here is a programming error.
fn parse_default<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    match default.parse() {
        Ok(value) => value,
        Err(e) => panic!("default for {key} does not parse: {e}"),
    }
}
