//! Terminal rendering of session events

use crate::prompt::prompt_yes_no;
use async_trait::async_trait;
use colored::Colorize;
use hugocms_editor::{ConfirmAction, Presenter, RenderEvent, SaveTrigger};

pub struct TerminalPresenter {
    server_url: String,
    assume_yes: bool,
}

impl TerminalPresenter {
    pub fn new(server_url: impl Into<String>, assume_yes: bool) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            assume_yes,
        }
    }

    fn preview_link(&self, url: &str) -> String {
        format!("{}{}", self.server_url, url)
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    fn render(&self, event: RenderEvent) {
        match event {
            RenderEvent::Loading { path } => {
                println!("{} {}", "Loading".dimmed(), path.dimmed());
            }
            RenderEvent::Ready { .. } | RenderEvent::Dirty(_) | RenderEvent::Cleared => {}
            RenderEvent::LoadFailed { path, message } => {
                eprintln!("{} {}: {}", "Failed to open".red().bold(), path, message);
            }
            RenderEvent::Error { operation, message } => {
                eprintln!("{} {}", format!("{} failed:", operation).red().bold(), message);
            }
            RenderEvent::Saved { path, trigger } => {
                let how = match trigger {
                    SaveTrigger::Autosave => "Autosaved",
                    SaveTrigger::Manual | SaveTrigger::Preview => "Saved",
                };
                println!("{} {}", "✓".green(), format!("{} {}", how, path).green());
            }
            RenderEvent::SaveFailed { path, message, .. } => {
                eprintln!("{} {}: {}", "Save failed".red().bold(), path, message);
            }
            RenderEvent::Busy { operation, active } => {
                if active {
                    println!("{}", format!("{}...", operation).dimmed());
                }
            }
            RenderEvent::PreviewShouldRefresh { url, .. } => {
                println!("   Preview: {}", self.preview_link(&url).cyan());
            }
            RenderEvent::AuthRequired => {
                eprintln!(
                    "{} log in at {}/login and set HUGOCMS_SESSION to the session cookie",
                    "Session expired:".yellow().bold(),
                    self.server_url
                );
            }
            RenderEvent::NoDocument => {
                eprintln!("{}", "No document is open".yellow());
            }
            RenderEvent::Deleted { path } => {
                println!("{} {}", "✓".green(), format!("Deleted {}", path).green());
            }
            RenderEvent::Created { path } => {
                println!("{} {}", "✓".green(), format!("Created {}", path).green());
            }
            RenderEvent::ConfigLoaded { collections } => {
                tracing::debug!(collections, "schema loaded");
            }
            RenderEvent::DocumentList(groups) => {
                for group in groups {
                    println!("{}", group.label.bold());
                    for document in &group.documents {
                        let marker = if document.is_dirty {
                            "*".yellow().to_string()
                        } else {
                            " ".to_string()
                        };
                        println!(
                            "  {} {}  {}",
                            marker,
                            document.display_title(),
                            document.path.dimmed()
                        );
                    }
                }
            }
            RenderEvent::TaskCompleted { operation, log } => {
                println!("{} {}", "✓".green(), format!("{} finished", operation).green());
                let log = log.trim();
                if !log.is_empty() {
                    println!("{}", log);
                }
            }
        }
    }

    async fn confirm(&self, action: ConfirmAction) -> bool {
        if self.assume_yes {
            return true;
        }
        let label = action.to_string();
        let answer = tokio::task::spawn_blocking(move || prompt_yes_no(&label, false)).await;
        match answer {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt failed");
                false
            }
        }
    }
}
