use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "TANDEM_ENV";
const CONFIG_DIR_ENV: &str = "TANDEM_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub lookup: LookupSettings,
    #[serde(default)]
    pub rotation: RotationSettings,
    #[serde(default)]
    pub participants: ParticipantSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`load`](Self::load) with an explicit config directory override
    /// (e.g. from a CLI flag) taking precedence over `TANDEM_CONFIG_DIR`.
    pub fn load_from(config_dir_override: Option<PathBuf>) -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = config_dir_override
            .or_else(|| std::env::var(CONFIG_DIR_ENV).map(PathBuf::from).ok())
            .unwrap_or_else(|| {
                // Default to repo root `config` directory.
                std::env::current_dir()
                    .map(|cwd| cwd.join("config"))
                    .expect("unable to resolve current directory")
            });

        let base_path = config_dir.join("base.toml");
        let environment_filename = format!("{}.toml", environment);
        let environment_path = config_dir.join(environment_filename);

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(config::Environment::with_prefix("TANDEM").separator("_"));

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Which document-store engine backs persistence.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile, for tests and throwaway runs.
    Memory,
    /// One JSON file per collection under `data_dir`.
    #[default]
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "StoreSettings::default_data_dir")]
    pub data_dir: String,
}

impl StoreSettings {
    fn default_data_dir() -> String {
        "data".to_string()
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: Self::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupSettings {
    #[serde(default = "LookupSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "LookupSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl LookupSettings {
    fn default_base_url() -> String {
        "https://www.googleapis.com/books/v1".to_string()
    }

    fn default_request_timeout_ms() -> u64 {
        10000
    }
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotationSettings {
    /// Length of one reading cycle; the countdown restarts at this on a draw.
    #[serde(default = "RotationSettings::default_cycle_days")]
    pub cycle_days: u64,
    /// Books handed to each participant on a bulk draw.
    #[serde(default = "RotationSettings::default_books_per_reader")]
    pub books_per_reader: usize,
}

impl RotationSettings {
    fn default_cycle_days() -> u64 {
        30
    }

    fn default_books_per_reader() -> usize {
        2
    }

    /// The full cycle expressed in seconds.
    pub fn cycle_seconds(&self) -> i64 {
        (self.cycle_days * 24 * 60 * 60) as i64
    }
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            cycle_days: Self::default_cycle_days(),
            books_per_reader: Self::default_books_per_reader(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantSettings {
    #[serde(default = "ParticipantSettings::default_name_a")]
    pub name_a: String,
    #[serde(default = "ParticipantSettings::default_name_b")]
    pub name_b: String,
}

impl ParticipantSettings {
    fn default_name_a() -> String {
        "Reader A".to_string()
    }

    fn default_name_b() -> String {
        "Reader B".to_string()
    }
}

impl Default for ParticipantSettings {
    fn default() -> Self {
        Self {
            name_a: Self::default_name_a(),
            name_b: Self::default_name_b(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
