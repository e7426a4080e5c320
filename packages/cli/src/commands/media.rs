use super::Session;
use clap::{Args, Subcommand};
use colored::Colorize;
use hugocms_common::{MediaScope, MediaUpload};
use hugocms_gateway::DocumentGateway;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MediaArgs {
    /// Use the page bundle of this article instead of the static folder
    #[arg(long, global = true)]
    pub article: Option<String>,

    #[command(subcommand)]
    pub command: MediaCommand,
}

#[derive(Subcommand, Debug)]
pub enum MediaCommand {
    /// List media files
    List,

    /// Upload a file
    Upload { file: PathBuf },

    /// Delete a file by name
    Delete { name: String },
}

pub async fn media(args: MediaArgs, session: &Session) -> anyhow::Result<()> {
    let scope = match args.article {
        Some(path) => MediaScope::article(path),
        None => MediaScope::site(),
    };
    let gateway = session.gateway();

    match args.command {
        MediaCommand::List => {
            let files = gateway.list_media(&scope).await?;
            if files.is_empty() {
                println!("{}", "No media files".dimmed());
            }
            for file in files {
                println!("{}  {}  {}", file.name.bold(), file.size, file.path.dimmed());
            }
        }
        MediaCommand::Upload { file } => {
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| anyhow::anyhow!("Not a file: {}", file.display()))?;
            let bytes = std::fs::read(&file)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?;
            let uploaded = gateway
                .upload_media(&scope, MediaUpload { filename, bytes })
                .await?;
            println!("{} Uploaded {}", "✓".green(), uploaded.name);
            if !uploaded.path.is_empty() {
                println!("   Markdown path: {}", uploaded.path);
            }
        }
        MediaCommand::Delete { name } => {
            gateway.delete_media(&scope, &name).await?;
            println!("{} Deleted {}", "✓".green(), name);
        }
    }
    Ok(())
}
