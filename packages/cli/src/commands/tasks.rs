use super::Session;
use clap::Args;
use hugocms_editor::PublishScope;

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Publish only this document instead of every change
    #[arg(long)]
    pub path: Option<String>,
}

pub async fn build(session: &Session) -> anyhow::Result<()> {
    session.run_build().await?;
    Ok(())
}

pub async fn sync(session: &Session) -> anyhow::Result<()> {
    super::load_schema(session).await;
    session.run_sync().await?;
    Ok(())
}

pub async fn publish(args: PublishArgs, session: &Session) -> anyhow::Result<()> {
    let scope = match &args.path {
        Some(path) => {
            session.open_document(path).await?;
            PublishScope::CurrentDocument
        }
        None => PublishScope::All,
    };
    let result = session.publish(scope).await;
    session.close_document();
    result?;
    Ok(())
}
