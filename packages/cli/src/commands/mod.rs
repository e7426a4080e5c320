mod documents;
mod media;
mod tasks;

pub use documents::{
    delete, diff, edit, list, new, show, DeleteArgs, DiffArgs, EditArgs, NewArgs, ShowArgs,
};
pub use media::{media, MediaArgs};
pub use tasks::{build, publish, sync, PublishArgs};

use crate::config::Config;
use crate::presenter::TerminalPresenter;
use hugocms_editor::{Edit, SessionController};
use hugocms_gateway::HttpGateway;
use std::path::Path;

pub type Session = SessionController<HttpGateway, TerminalPresenter>;

/// Open a session against the configured backend
pub fn connect(config: &Config, assume_yes: bool) -> anyhow::Result<Session> {
    let mut builder = HttpGateway::builder(config.server_url.clone());
    if let Some(cookie) = &config.session_cookie {
        builder = builder.session_cookie(cookie.clone());
    }
    let gateway = builder.build()?;
    let presenter = TerminalPresenter::new(config.server_url.clone(), assume_yes);
    Ok(SessionController::new(
        gateway,
        presenter,
        config.session_config()?,
    ))
}

/// Fetch the collection schema. Commands keep working without one.
pub async fn load_schema(session: &Session) {
    if let Err(e) = session.load_config().await {
        tracing::debug!(error = %e, "continuing without schema");
    }
}

/// Parse `name=value` assignments from `--set`
pub fn parse_assignments(assignments: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    assignments
        .iter()
        .map(|assignment| {
            let (name, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Expected name=value, got '{}'", assignment))?;
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("Missing field name in '{}'", assignment);
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Edits for `--set` assignments and an optional replacement body
pub fn collect_edits(assignments: &[String], body_file: Option<&Path>) -> anyhow::Result<Vec<Edit>> {
    let mut edits: Vec<Edit> = parse_assignments(assignments)?
        .into_iter()
        .map(|(name, text)| Edit::FieldText { name, text })
        .collect();
    if let Some(path) = body_file {
        let body = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
        edits.push(Edit::Body(body));
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(&["title=Hello = world".to_string(), " draft =false".to_string()])
            .unwrap();
        assert_eq!(
            parsed,
            vec![
                ("title".to_string(), "Hello = world".to_string()),
                ("draft".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_assignments_rejects_bad_input() {
        assert!(parse_assignments(&["title".to_string()]).is_err());
        assert!(parse_assignments(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_collect_edits_without_body() {
        let edits = collect_edits(&["tags=a, b".to_string()], None).unwrap();
        assert_eq!(
            edits,
            vec![Edit::FieldText {
                name: "tags".to_string(),
                text: "a, b".to_string()
            }]
        );
    }
}
