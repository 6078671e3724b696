use anyhow::{Context, Result};
use colored::*;
use identity_cache::{IdentityCache, RedisTokenStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Resolve a token the way the gate would
pub async fn execute(config_path: &Path, redis_url: &str, token: &str, format: &str) -> Result<()> {
    let config = super::check_config::load(config_path)?;

    if !config.owns_token(token) {
        debug!("Token lacks reseller prefix, skipping lookup");
        let message = format!(
            "token does not start with reseller prefix {}; the gate treats it as anonymous",
            config.reseller_prefix()
        );
        print_result(format, false, None, &message)?;
        return Ok(());
    }

    let store = RedisTokenStore::connect(redis_url)
        .await
        .context("Failed to connect to identity cache")?;
    let cache = IdentityCache::new(config.reseller_prefix(), Some(Arc::new(store)))
        .with_lookup_timeout(config.cache_timeout());

    let groups = cache
        .resolve(token)
        .await
        .context("Identity cache lookup failed")?;

    match groups {
        Some(groups) => print_result(format, true, Some(groups.as_slice()), "identity resolved"),
        None => print_result(format, true, None, "no identity (unknown or expired token)"),
    }
}

fn print_result(format: &str, looked_up: bool, groups: Option<&[String]>, message: &str) -> Result<()> {
    match format {
        "json" => {
            let output = serde_json::json!({
                "looked_up": looked_up,
                "groups": groups,
                "message": message,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => match groups {
            Some(groups) => {
                let user = groups.first().map(String::as_str).unwrap_or("-");
                println!("{} {}", "User:".cyan(), user.green().bold());
                println!("{} {}", "Groups:".cyan(), groups.join(","));
            }
            None => println!("{}", message.yellow()),
        },
    }
    Ok(())
}
