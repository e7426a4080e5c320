mod commands;
mod config;
mod presenter;
mod prompt;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    DeleteArgs, DiffArgs, EditArgs, MediaArgs, NewArgs, PublishArgs, ShowArgs,
};
use config::Config;
use hugocms_editor::SessionError;
use tracing_subscriber::EnvFilter;

/// hugocms - edit Hugo site content through the hugocms backend
#[derive(Parser, Debug)]
#[command(name = "hugocms")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend URL (overrides hugocms.config.json)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List documents grouped by collection
    List,

    /// Print a document's fields and body
    Show(ShowArgs),

    /// Change fields or body and save
    Edit(EditArgs),

    /// Show what saving the changes would write
    Diff(DiffArgs),

    /// Create a document
    New(NewArgs),

    /// Delete a document
    Delete(DeleteArgs),

    /// Rebuild the site
    Build,

    /// Pull and merge remote changes
    Sync,

    /// Commit and push changes
    Publish(PublishArgs),

    /// Manage media files
    Media(MediaArgs),
}

async fn run(cli: Cli, cwd: &str) -> anyhow::Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    let session = commands::connect(&config, cli.yes)?;

    match cli.command {
        Command::List => commands::list(&session).await,
        Command::Show(args) => commands::show(args, &session).await,
        Command::Edit(args) => commands::edit(args, &session).await,
        Command::Diff(args) => commands::diff(args, &session).await,
        Command::New(args) => commands::new(args, &session).await,
        Command::Delete(args) => commands::delete(args, &session).await,
        Command::Build => commands::build(&session).await,
        Command::Sync => commands::sync(&session).await,
        Command::Publish(args) => commands::publish(args, &session).await,
        Command::Media(args) => commands::media(args, &session).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(e) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli, &cwd).await {
        // Session errors were already shown by the presenter
        if err.downcast_ref::<SessionError>().is_none() {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), err);
            eprintln!();
        }
        std::process::exit(1);
    }
}
