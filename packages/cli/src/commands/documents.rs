use super::{collect_edits, load_schema, parse_assignments, Session};
use clap::Args;
use colored::Colorize;
use hugocms_common::BODY_FIELD;
use hugocms_editor::{DiffLineKind, DocumentContent, FieldInput, LoadOutcome};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Content-relative path, e.g. posts/hello.md
    pub path: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub path: String,

    /// Set a front-matter field (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Replace the body with the contents of a file
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Save through the preview flow and print the preview URL
    #[arg(long)]
    pub preview: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub path: String,

    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    #[arg(long)]
    pub body_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Collection to create the document in
    #[arg(required_unless_present = "path")]
    pub collection: Option<String>,

    /// Create at an explicit content-relative path instead
    #[arg(long, conflicts_with = "collection")]
    pub path: Option<String>,

    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Initial body, or the whole file with --path
    #[arg(long)]
    pub body_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub path: String,
}

pub async fn list(session: &Session) -> anyhow::Result<()> {
    load_schema(session).await;
    session.refresh_document_list().await?;
    Ok(())
}

pub async fn show(args: ShowArgs, session: &Session) -> anyhow::Result<()> {
    load_schema(session).await;
    session.open_document(&args.path).await?;

    let snapshot = session.snapshot();
    if let Some(content) = &snapshot.content {
        print_content(content);
    }
    session.close_document();
    Ok(())
}

pub async fn edit(args: EditArgs, session: &Session) -> anyhow::Result<()> {
    let edits = collect_edits(&args.set, args.body_file.as_deref())?;
    load_schema(session).await;
    if session.open_document(&args.path).await? == LoadOutcome::Superseded {
        return Ok(());
    }

    for edit in edits {
        session.apply_edit(edit)?;
    }

    if args.preview {
        session.show_preview().await?;
    } else {
        session.save_document().await?;
    }
    session.close_document();
    Ok(())
}

pub async fn diff(args: DiffArgs, session: &Session) -> anyhow::Result<()> {
    let edits = collect_edits(&args.set, args.body_file.as_deref())?;
    load_schema(session).await;
    session.open_document(&args.path).await?;

    for edit in edits {
        session.apply_edit(edit)?;
    }
    let view = session.request_diff().await;
    session.close_document();
    let view = view?;

    if view.is_unchanged() {
        println!("{}", "No changes".dimmed());
        return Ok(());
    }
    for line in view.lines() {
        let text = match line.kind {
            DiffLineKind::Added => line.text.green(),
            DiffLineKind::Removed => line.text.red(),
            DiffLineKind::Header => line.text.cyan(),
            DiffLineKind::Context => line.text.normal(),
        };
        println!("{}", text);
    }
    println!(
        "{}",
        format!("{} added, {} removed", view.added(), view.removed()).dimmed()
    );
    Ok(())
}

pub async fn new(args: NewArgs, session: &Session) -> anyhow::Result<()> {
    load_schema(session).await;

    let content = match &args.body_file {
        Some(file) => Some(
            std::fs::read_to_string(file)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?,
        ),
        None => None,
    };

    let path = match (args.path, args.collection) {
        (Some(path), _) => {
            session
                .create_document_at(&path, content.as_deref().unwrap_or_default())
                .await?
        }
        (None, Some(collection)) => {
            let mut form = session
                .creation_form(&collection)
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            for (name, value) in parse_assignments(&args.set)? {
                form.set_text(&name, &value)?;
            }
            let mut record = form.to_record();
            if let Some(body) = content {
                record.insert(BODY_FIELD.to_string(), serde_json::Value::String(body));
            }
            session.create_document(&collection, record).await?
        }
        (None, None) => anyhow::bail!("Pass a collection or --path"),
    };

    println!("   Path: {}", path);
    session.close_document();
    Ok(())
}

pub async fn delete(args: DeleteArgs, session: &Session) -> anyhow::Result<()> {
    session.open_document(&args.path).await?;
    session.delete_document().await?;
    Ok(())
}

fn print_content(content: &DocumentContent) {
    if let Some(form) = content.form() {
        for field in form.fields() {
            let value = match &field.input {
                FieldInput::Text(text) => text.clone(),
                FieldInput::Checked(checked) => checked.to_string(),
            };
            println!("{}: {}", field.label.bold(), value);
        }
        println!("{}", "---".dimmed());
    }
    println!("{}", content.body());
}
