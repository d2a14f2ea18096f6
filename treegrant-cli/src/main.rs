//! Treegrant CLI - grant and list provider document trees

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use treegrant_core::config::DEFAULT_CONFIG_PATH;
use treegrant_core::{Config, ListingService, LocalTreeProvider, TreeHandle};

#[derive(Parser)]
#[command(name = "treegrant")]
#[command(about = "Persistent tree grants and child listings", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long, global = true, env = "TREEGRANT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log filter (e.g. "debug", "treegrant_core=trace")
    #[arg(long, global = true, env = "TREEGRANT_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default config file
    Init,

    /// Grant access to a tree and list its immediate children
    List {
        /// Tree handle (e.g. tree://local/Download)
        handle: String,
    },

    /// Show trees holding a persisted grant
    Grants,

    /// Release the persisted grant for a tree
    Revoke {
        /// Tree handle to release
        handle: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Init => cmd_init(&cli.config),
        Commands::List { handle } => cmd_list(&cli.config, handle, cli.json).await,
        Commands::Grants => cmd_grants(&cli.config, cli.json).await,
        Commands::Revoke { handle } => cmd_revoke(&cli.config, handle, cli.json).await,
    };

    if let Err(e) = result {
        if cli.json {
            match serde_json::to_string_pretty(&e.envelope()) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("{} [{}] {}", "Error".red(), e.kind(), e);
            eprintln!("{}: {}", "Hint".yellow(), e.envelope().hint);
        }
        std::process::exit(1);
    }
}

fn open_service(config_path: &std::path::Path) -> treegrant_core::Result<ListingService> {
    let config = Config::load(config_path)?;
    let provider = LocalTreeProvider::from_config(&config);
    Ok(ListingService::new(Arc::new(provider)))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> treegrant_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(config_path: &std::path::Path) -> treegrant_core::Result<()> {
    Config::init(config_path)?;
    println!("{} {}", "Created".green(), config_path.display());
    Ok(())
}

async fn cmd_list(config_path: &std::path::Path, handle: &str, json: bool) -> treegrant_core::Result<()> {
    let service = open_service(config_path)?;
    let listing = service.list_children(handle).await?;

    if json {
        return print_json(&listing);
    }

    if listing.is_empty() {
        println!("{}", "No children".dimmed());
        return Ok(());
    }
    for record in &listing {
        let name = if record.is_directory() {
            format!("{}/", record.name).blue().bold()
        } else {
            record.name.normal()
        };
        println!("{}  {}  {}", name, record.mime.dimmed(), record.reference);
    }
    println!("{}: {} entries", "Listed".green(), listing.len());
    Ok(())
}

async fn cmd_grants(config_path: &std::path::Path, json: bool) -> treegrant_core::Result<()> {
    let service = open_service(config_path)?;
    let granted = service.grants().granted().await?;

    if json {
        let uris: Vec<String> = granted.iter().map(ToString::to_string).collect();
        return print_json(&serde_json::json!({ "grants": uris }));
    }

    if granted.is_empty() {
        println!("{}", "No persisted grants".dimmed());
    }
    for handle in &granted {
        println!("{}", handle);
    }
    Ok(())
}

async fn cmd_revoke(config_path: &std::path::Path, handle: &str, json: bool) -> treegrant_core::Result<()> {
    let service = open_service(config_path)?;
    let tree: TreeHandle = handle.parse()?;
    service.grants().revoke(&tree).await?;

    if json {
        return print_json(&serde_json::json!({ "revoked": tree.to_string() }));
    }
    println!("{} {}", "Revoked".green(), tree);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use treegrant_core::TreeGrantError;

    #[test]
    fn test_cli_parses_list() {
        let cli = Cli::try_parse_from(["treegrant", "--json", "list", "tree://local/Download"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Commands::List { handle } => assert_eq!(handle, "tree://local/Download"),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_revoke_rejects_malformed_handle() {
        let err = "not-a-uri".parse::<TreeHandle>().unwrap_err();
        assert!(matches!(err, TreeGrantError::MalformedHandle { .. }));
    }
}
