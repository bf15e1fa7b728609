use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secenv::{AuthMethod, ProcessEnv, Resolver, ResolverConfig};
use tracing_subscriber::EnvFilter;

mod config;

use config::{build_config, FileConfig, Overrides};

/// secenv - resolve VAULT: references in environment variables
#[derive(Parser, Debug)]
#[command(name = "secenv")]
#[command(about = "Resolve VAULT: references in environment variables from a Vault KV store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/secenv/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Secret service address (overrides VAULT_ADDR)
    #[arg(long, global = true)]
    addr: Option<String>,

    /// Role used for Kubernetes login (overrides SERVICE_NAME)
    #[arg(long, global = true)]
    service: Option<String>,

    /// Auth method: kubernetes or none (overrides VAULT_AUTH)
    #[arg(long, global = true)]
    auth: Option<AuthMethod>,

    /// Service account token file for Kubernetes login
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Per-request timeout in milliseconds (overrides VAULT_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved value of each variable, one per line
    Get {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run a command with every VAULT: reference in the environment resolved
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            address: self.addr.clone(),
            service: self.service.clone(),
            auth: self.auth,
            token_path: self.token_path.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries resolved values, so logs go to stderr
    let directive = if cli.verbose { "secenv=debug" } else { "secenv=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let file = FileConfig::load_optional(cli.config.as_deref())?;
    let defaults = ResolverConfig::from_env(&ProcessEnv);
    let config = build_config(cli.overrides(), file, &defaults)?;

    let resolver =
        Resolver::with_defaults(config, &defaults).context("Failed to create secret resolver")?;

    match cli.command {
        Commands::Get { names } => run_get(&resolver, &names).await,
        Commands::Exec { command } => run_exec(&resolver, &command).await,
    }
}

async fn run_get(resolver: &Resolver, names: &[String]) -> Result<()> {
    for name in names {
        let value = resolver.get(name).await?;
        println!("{}", value);
    }
    Ok(())
}

async fn run_exec(resolver: &Resolver, command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().context("No command given")?;

    let resolved = resolver.resolve_all().await?;
    tracing::info!("Resolved {} secret(s), starting {}", resolved.len(), program);

    let status = tokio::process::Command::new(program)
        .args(args)
        .envs(resolved)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    std::process::exit(status.code().unwrap_or(1));
}
