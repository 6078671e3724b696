use anyhow::{Context, Result};
use authz::AuthConfig;
use colored::*;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Normalized configuration as shown to operators.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub reseller_prefix: String,
    pub auth_prefix: String,
    pub token_life_secs: u64,
    pub allow_overrides: bool,
    pub ext_authentication_url: String,
    pub allowed_sync_hosts: Vec<String>,
    pub reseller_admin_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timeout_ms: Option<u64>,
}

impl From<&AuthConfig> for ConfigReport {
    fn from(config: &AuthConfig) -> Self {
        Self {
            reseller_prefix: config.reseller_prefix().to_string(),
            auth_prefix: config.auth_prefix().to_string(),
            token_life_secs: config.token_life().as_secs(),
            allow_overrides: config.allow_overrides(),
            ext_authentication_url: config.ext_authentication_url().to_string(),
            allowed_sync_hosts: config.allowed_sync_hosts().to_vec(),
            reseller_admin_group: config.reseller_admin_group(),
            cache_timeout_ms: config
                .cache_timeout()
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// Load a configuration file with the same rules the gate applies at startup.
pub fn load(path: &Path) -> Result<AuthConfig> {
    let config = AuthConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Validate and print a configuration file
pub fn execute(path: &Path, format: &str) -> Result<()> {
    let config = load(path)?;
    let report = ConfigReport::from(&config);

    match format {
        "json" => {
            let json_output = serde_json::to_string_pretty(&report)?;
            println!("{}", json_output);
        }
        _ => print_report_text(&report),
    }

    Ok(())
}

fn print_report_text(report: &ConfigReport) {
    println!("{}", "Configuration OK".green().bold());
    println!("{}", "─".repeat(50).dimmed());
    println!("  {:<24} {}", "reseller_prefix:".cyan(), report.reseller_prefix);
    println!("  {:<24} {}", "auth_prefix:".cyan(), report.auth_prefix);
    println!("  {:<24} {}s", "token_life:".cyan(), report.token_life_secs);
    println!("  {:<24} {}", "allow_overrides:".cyan(), report.allow_overrides);
    println!(
        "  {:<24} {}",
        "ext_authentication_url:".cyan(),
        report.ext_authentication_url
    );
    println!(
        "  {:<24} {}",
        "allowed_sync_hosts:".cyan(),
        report.allowed_sync_hosts.join(", ")
    );
    println!(
        "  {:<24} {}",
        "reseller_admin_group:".cyan(),
        report.reseller_admin_group
    );
    match report.cache_timeout_ms {
        Some(ms) => println!("  {:<24} {}ms", "cache_timeout:".cyan(), ms),
        None => println!("  {:<24} {}", "cache_timeout:".cyan(), "none".dimmed()),
    }
}
