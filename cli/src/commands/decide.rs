use anyhow::{Context, Result};
use authz::{AuthzEngine, Decision, Identity, RequestContext};
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Path to the YAML configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Decoded request path, e.g. /v1/AUTH_bob/photos/cat.png
    #[arg(short, long)]
    pub path: String,

    /// Caller groups, comma-joined with the principal first. Omit for an
    /// anonymous caller.
    #[arg(short, long)]
    pub groups: Option<String>,

    /// ACL descriptor stored on the container
    #[arg(long)]
    pub acl: Option<String>,

    /// Referer header
    #[arg(long)]
    pub referer: Option<String>,

    /// X-Container-Sync-Key header
    #[arg(long)]
    pub sync_key: Option<String>,

    /// Sync key stored on the container
    #[arg(long)]
    pub resource_sync_key: Option<String>,

    /// Send an X-Timestamp header
    #[arg(long)]
    pub timestamp: bool,

    /// Peer address of the connection
    #[arg(long)]
    pub remote_addr: Option<String>,

    /// Client address reported by the load balancer
    #[arg(long)]
    pub forwarded_for: Option<String>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

impl DecideArgs {
    fn context(&self) -> Result<RequestContext> {
        let identity = match self.groups.as_deref() {
            Some(groups) => Some(
                Identity::from_remote_user(groups)
                    .context("--groups must start with a non-empty principal")?,
            ),
            None => None,
        };

        let mut ctx = RequestContext::new(&self.method, &self.path)
            .with_identity(identity)
            .with_timestamp(self.timestamp);
        ctx.acl = self.acl.clone();
        ctx.referer = self.referer.clone();
        ctx.sync_key_header = self.sync_key.clone();
        ctx.resource_sync_key = self.resource_sync_key.clone();
        ctx.remote_addr = self.remote_addr.clone();
        ctx.forwarded_client = self.forwarded_for.clone();
        Ok(ctx)
    }
}

/// Run the authorization policy offline and print the decision
pub fn execute(args: DecideArgs) -> Result<()> {
    let config = super::check_config::load(&args.config)?;
    let engine = AuthzEngine::new(config);
    let decision = engine.authorize(&args.context()?);

    match args.format.as_str() {
        "json" => {
            let mut value = serde_json::to_value(decision)?;
            value["status"] = serde_json::json!(decision.status_code());
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => print_decision_text(decision, engine.config().ext_authentication_url()),
    }

    Ok(())
}

fn print_decision_text(decision: Decision, ext_authentication_url: &str) {
    let label = match decision {
        Decision::Allow { .. } => decision.to_string().green().bold(),
        _ => decision.to_string().red().bold(),
    };
    println!("{} {}", "Decision:".cyan(), label);

    match decision.status_code() {
        Some(303) => println!("{} 303 -> {}", "Status:".cyan(), ext_authentication_url),
        Some(status) => println!("{} {}", "Status:".cyan(), status),
        None => println!("{} {}", "Status:".cyan(), "pass-through".dimmed()),
    }
}
