use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use megapool::{factory, Backend};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "megapool",
    about = "Store files on one or more MEGA accounts",
    long_about = "Megapool uploads, downloads, lists and removes files on MEGA via megatools, \
                  placing new files on the account with the most free space"
)]
struct Cli {
    #[arg(
        env = "MEGAPOOL_URL",
        help = "Backend URL (mega://user:pass@/Root/dir or megapool:///accounts.toml)"
    )]
    url: String,

    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List remote files")]
    Ls,

    #[command(about = "Upload a file")]
    Put {
        #[arg(help = "Local file")]
        local: PathBuf,

        #[arg(help = "Remote name (defaults to the local file name)")]
        name: Option<String>,
    },

    #[command(about = "Download a file")]
    Get {
        #[arg(help = "Remote name")]
        name: String,

        #[arg(help = "Local destination")]
        local: PathBuf,
    },

    #[command(about = "Remove a file")]
    Rm {
        #[arg(help = "Remote name")]
        name: String,
    },

    #[command(about = "Show free space per account")]
    Df {
        #[arg(long, help = "Print JSON")]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "megapool=debug" } else { "megapool=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    megapool::init();
    let mut backend = factory::new_backend(&cli.url).context("cannot create backend")?;
    backend.init().await?;

    match cli.command {
        Commands::Ls => {
            for name in backend.list().await? {
                println!("{}", name);
            }
        }
        Commands::Put { local, name } => {
            let name = match name {
                Some(name) => name,
                None => local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("cannot derive a remote name from the local path")?,
            };
            backend.put(&local, &name).await?;
            info!(file = %name, "stored");
        }
        Commands::Get { name, local } => {
            backend.get(&name, &local).await?;
        }
        Commands::Rm { name } => {
            backend.delete(&name).await?;
        }
        Commands::Df { json } => {
            let usage = backend.free_space().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&usage)?);
            } else {
                for account in usage {
                    println!(
                        "{:<40} {:>16} bytes free {:>8} files  checked {}",
                        account.username,
                        account.free_bytes,
                        account.files,
                        account.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
        }
    }

    backend.close().await?;
    Ok(())
}
