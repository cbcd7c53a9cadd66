use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Fallback PIN used when neither config nor environment provide one.
/// Deployments must override it; the server warns at startup if they don't.
pub const DEFAULT_ADMIN_PIN: &str = "123456";

#[derive(Parser, Debug)]
#[command(name = "picota", about = "An anonymous accusation board server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub admin: AdminConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL prepended to stored-object paths when building public URLs.
    /// Defaults to http://{host}:{port} once the config is loaded.
    pub public_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret presented in the x-admin-pin header on admin requests.
    pub pin: String,
    /// Whether the privileged (ownership-bypassing) repository tier is
    /// available in this deployment. When false, admin listings degrade to
    /// the restricted path.
    pub allow_bypass: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: None,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_ADMIN_PIN.to_string(),
            allow_bypass: true,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Environment override for the admin PIN
        if let Ok(pin) = std::env::var("PICOTA_ADMIN_PIN") {
            if !pin.is_empty() {
                config.admin.pin = pin;
            }
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("picota.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("uploads"));
        }
        if config.server.public_url.is_none() {
            config.server.public_url = Some(format!(
                "http://{}:{}",
                config.server.host, config.server.port
            ));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".picota")
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        self.database.path.as_ref().unwrap()
    }

    pub fn uploads_path(&self) -> &PathBuf {
        self.storage.path.as_ref().unwrap()
    }

    pub fn public_url(&self) -> &str {
        self.server.public_url.as_deref().unwrap_or("")
    }
}
