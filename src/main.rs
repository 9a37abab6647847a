use anyhow::{Context, Result};
use autofix::config::{AutofixConfig, DifferKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "autofix")]
#[command(version, about = "Turn a GitHub issue into an applicable patch with a language model")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./autofix.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Propose a fix for an issue and write it as patch.diff in the repository
    Fix {
        /// Issue description passed to the model
        #[arg(long)]
        issue_body: String,

        /// Local checkout to read and write the patch into
        #[arg(long)]
        repo_path: PathBuf,

        /// Diff implementation: git or builtin
        #[arg(long)]
        differ: Option<DifferKind>,
    },
    /// Start the remote autofix workflow and print its execution id
    Trigger {
        #[arg(long)]
        issue_url: String,

        #[arg(long)]
        repo_url: String,

        /// Token the workflow uses to open the pull request
        #[arg(long)]
        github_token: Option<String>,
    },
    /// Follow the logs of a workflow execution
    Logs {
        job_id: String,
    },
    /// Serve the trigger proxy and log stream over HTTP
    Serve {
        /// Port to serve on (defaults to [server] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS, bind 0.0.0.0)
        #[arg(long)]
        dev: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose, cli.log_json);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = AutofixConfig::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Fix {
            issue_body,
            repo_path,
            differ,
        } => cmd::cmd_fix(&config, issue_body, repo_path, differ).await?,
        Commands::Trigger {
            issue_url,
            repo_url,
            github_token,
        } => cmd::cmd_trigger(&config, issue_url, repo_url, github_token).await?,
        Commands::Logs { job_id } => cmd::cmd_logs(&config, job_id).await?,
        Commands::Serve { port, dev } => cmd::cmd_serve(&config, port, dev).await?,
    }

    Ok(())
}
