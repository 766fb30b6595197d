use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::scoring::decay::{DecayPolicy, DEFAULT_LAMBDA, HIGH_VOLATILITY_LAMBDA, LOW_VOLATILITY_LAMBDA};
use crate::scoring::framework::{Framework, FrameworkError};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let framework_path = env::var("SCORE_FRAMEWORK_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let enable_draft_scores = flag_var("SCORE_ENABLE_DRAFT_SCORES", true)?;
        let decay = DecayPolicy {
            default_lambda: rate_var("SCORE_DECAY_LAMBDA_DEFAULT", DEFAULT_LAMBDA)?,
            high_volatility_lambda: rate_var("SCORE_DECAY_LAMBDA_HIGH", HIGH_VOLATILITY_LAMBDA)?,
            low_volatility_lambda: rate_var("SCORE_DECAY_LAMBDA_LOW", LOW_VOLATILITY_LAMBDA)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig {
                framework_path,
                enable_draft_scores,
                decay,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Framework source, draft previews and evidence decay rates.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// YAML framework to load; the bundled sample is used when unset.
    pub framework_path: Option<PathBuf>,
    pub enable_draft_scores: bool,
    pub decay: DecayPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            framework_path: None,
            enable_draft_scores: true,
            decay: DecayPolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn load_framework(&self) -> Result<Framework, FrameworkError> {
        match &self.framework_path {
            Some(path) => Framework::from_path(path),
            None => Framework::sample(),
        }
    }
}

fn flag_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key, value }),
    }
}

fn rate_var(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let Ok(value) = env::var(key) else {
        return Ok(default);
    };
    if value.trim().is_empty() {
        return Ok(default);
    }
    match value.trim().parse::<f64>() {
        Ok(rate) if rate.is_finite() && rate >= 0.0 => Ok(rate),
        _ => Err(ConfigError::InvalidDecayRate { key, value }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { key: &'static str, value: String },
    InvalidDecayRate { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false, found '{value}'")
            }
            ConfigError::InvalidDecayRate { key, value } => {
                write!(f, "{key} must be a non-negative number, found '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidDecayRate { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCORE_FRAMEWORK_PATH",
            "SCORE_ENABLE_DRAFT_SCORES",
            "SCORE_DECAY_LAMBDA_DEFAULT",
            "SCORE_DECAY_LAMBDA_HIGH",
            "SCORE_DECAY_LAMBDA_LOW",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.scoring.enable_draft_scores);
        assert_eq!(config.scoring.decay, DecayPolicy::default());
        assert!(config.scoring.framework_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn scoring_overrides_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORE_ENABLE_DRAFT_SCORES", "off");
        env::set_var("SCORE_DECAY_LAMBDA_HIGH", "0.2");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.scoring.enable_draft_scores);
        assert_eq!(config.scoring.decay.high_volatility_lambda, 0.2);
        assert_eq!(config.scoring.decay.default_lambda, DEFAULT_LAMBDA);
        reset_env();
    }

    #[test]
    fn rejects_negative_decay_rates() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORE_DECAY_LAMBDA_LOW", "-1");
        let err = AppConfig::load().expect_err("negative rate rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidDecayRate { key: "SCORE_DECAY_LAMBDA_LOW", .. }
        ));
        reset_env();
    }

    #[test]
    fn sample_framework_is_used_without_a_path() {
        let framework = ScoringConfig::default()
            .load_framework()
            .expect("sample framework loads");
        assert!(framework.kpi("legal_incorporation").is_some());
    }
}
