use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Where tracing output goes; the terminal belongs to the UI.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Labels offered for material items, comma separated in the environment.
    #[serde(default = "default_material_subcategories")]
    pub material_subcategories: Vec<String>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_file() -> String {
    "obras.log".to_string()
}

pub fn default_material_subcategories() -> Vec<String> {
    ["General", "Electrical", "Plumbing", "Painting"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if the file exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let mut config = envy::from_env::<Config>()?;
        config
            .material_subcategories
            .retain(|label| !label.trim().is_empty());
        if config.material_subcategories.is_empty() {
            config.material_subcategories = default_material_subcategories();
        }

        Ok(config)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
