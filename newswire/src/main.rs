/*
newswire - command-line entry point.
`export` runs the document export flow, `news` the interactive authenticated search.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newswire::cli::{self, ExportOptions, Prompter};
use newswire::news::SearchContext;

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Document export poller and news search")]
struct Args {
    /// Path to newswire.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a document page and save the result
    Export {
        /// Document id (overrides export.doc_id)
        #[arg(long)]
        doc: Option<String>,

        /// Page id (overrides export.page_id)
        #[arg(long)]
        page: Option<String>,

        /// Output file (overrides export.output_path)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Seconds between status checks
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Interactive news search
    News,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    // A missing .env file is fine; real env vars still apply.
    dotenv::dotenv().ok();

    let config = load_config(args.config).await?;
    config.validate().context("invalid configuration")?;

    match args.command {
        Command::Export {
            doc,
            page,
            output,
            interval,
        } => {
            let opts = ExportOptions {
                doc_id: doc,
                page_id: page,
                output,
                interval_secs: interval,
            };
            if !cli::export_session(&config, opts).await? {
                std::process::exit(1);
            }
        }
        Command::News => {
            let api_key = common::secret_from_env(&config.news.api_key_env).with_context(|| {
                format!(
                    "Please set your API key in the env: {}",
                    config.news.api_key_env
                )
            })?;
            let mut ctx = SearchContext::from_config(&config, &api_key)?;
            let mut prompt = Prompter::new(io::stdin().lock(), io::stdout());
            cli::news_session(&mut ctx, &mut prompt).await?;
        }
    }
    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("newswire.default.toml");

    let override_path = match explicit {
        Some(p) if !p.exists() => {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p) => Some(p),
        None => Some(PathBuf::from("newswire.toml")).filter(|p| p.exists()),
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref()).await?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}
