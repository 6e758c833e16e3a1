//! Configuration management for the Plant Inventory server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PIM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{InventoryPolicy, Role};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Outbound notification configuration
    pub notifications: NotificationConfig,

    /// Inventory lifecycle policy
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Mail relay endpoint; notices are only logged when unset
    pub mail_relay_url: Option<String>,

    /// API key sent to the mail relay
    pub mail_relay_api_key: Option<String>,

    /// Sender shown on outgoing mail
    pub sender: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    pub claim_window_minutes: i64,
    pub urgent_lead_minutes: i64,
    /// How often the claim-alert sweep runs
    pub sweep_interval_seconds: u64,
    pub leadership_roles: Vec<Role>,
    pub issuer_departments: Vec<String>,
    pub issuer_designations: Vec<String>,
    pub alert_viewer_roles: Vec<Role>,
    pub history_viewer_roles: Vec<Role>,
}

impl InventoryConfig {
    /// Domain policy handed to every core operation
    pub fn policy(&self) -> InventoryPolicy {
        InventoryPolicy {
            leadership_roles: self.leadership_roles.clone(),
            issuer_departments: self.issuer_departments.clone(),
            issuer_designations: self.issuer_designations.clone(),
            alert_viewer_roles: self.alert_viewer_roles.clone(),
            history_viewer_roles: self.history_viewer_roles.clone(),
            claim_window_minutes: self.claim_window_minutes,
            urgent_lead_minutes: self.urgent_lead_minutes,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PIM_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = InventoryPolicy::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("notifications.sender", "Plant Inventory <inventory@localhost>")?
            .set_default("inventory.claim_window_minutes", defaults.claim_window_minutes)?
            .set_default("inventory.urgent_lead_minutes", defaults.urgent_lead_minutes)?
            .set_default("inventory.sweep_interval_seconds", 60)?
            .set_default("inventory.leadership_roles", role_names(&defaults.leadership_roles))?
            .set_default("inventory.issuer_departments", defaults.issuer_departments.clone())?
            .set_default("inventory.issuer_designations", defaults.issuer_designations.clone())?
            .set_default("inventory.alert_viewer_roles", role_names(&defaults.alert_viewer_roles))?
            .set_default(
                "inventory.history_viewer_roles",
                role_names(&defaults.history_viewer_roles),
            )?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PIM_ prefix)
            .add_source(
                Environment::with_prefix("PIM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("inventory.leadership_roles")
                    .with_list_parse_key("inventory.issuer_departments")
                    .with_list_parse_key("inventory.issuer_designations")
                    .with_list_parse_key("inventory.alert_viewer_roles")
                    .with_list_parse_key("inventory.history_viewer_roles")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sweep = self.inventory.sweep_interval_seconds;
        if !(1..=60).contains(&sweep) {
            return Err(ConfigError::Message(format!(
                "inventory.sweep_interval_seconds must be between 1 and 60, got {}",
                sweep
            )));
        }
        self.inventory
            .policy()
            .validate()
            .map_err(ConfigError::Message)
    }
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}
