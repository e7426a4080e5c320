//! Integration tests for the editing session

use hugocms_common::{
    CmsConfig, Collection, CreateResponse, FetchedDocument, FieldDescriptor, FrontMatter,
    SavePayload, TaskReport, Widget,
};
use hugocms_editor::{
    ConfirmAction, DeleteOutcome, DocumentContent, Edit, FieldInput, LocalZone, Operation, Phase,
    PublishScope, RecordingPresenter, RenderEvent, SaveOutcome, SaveTrigger, SessionConfig,
    SessionController, SessionError,
};
use hugocms_gateway::{ErrorKind, GatewayError, GatewayOp, MemoryGateway};
use serde_json::{json, Value};
use std::sync::Arc;

type Session = SessionController<MemoryGateway, Arc<RecordingPresenter>>;

fn posts_config() -> CmsConfig {
    CmsConfig {
        collections: vec![Collection {
            name: "posts".to_string(),
            label: Some("Posts".to_string()),
            folder: "content/posts".to_string(),
            path: None,
            fields: vec![
                FieldDescriptor::new("title", Widget::String).with_label("Title"),
                FieldDescriptor::new("draft", Widget::Boolean).with_default(json!(true)),
                FieldDescriptor::new("tags", Widget::List),
                FieldDescriptor::new("date", Widget::Datetime),
                FieldDescriptor::new("body", Widget::String),
            ],
        }],
    }
}

fn record(value: Value) -> FrontMatter {
    match value {
        Value::Object(map) => map,
        _ => panic!("record must be an object"),
    }
}

fn backend() -> MemoryGateway {
    let gateway = MemoryGateway::with_config(posts_config());
    gateway.insert_document(
        "posts/a.md",
        FetchedDocument::structured(
            record(json!({
                "title": "Hello",
                "draft": false,
                "tags": ["rust", "cms"],
                "date": "2024-01-05T10:00:00+09:00",
                "weight": 5,
                "aliases": ["/old"]
            })),
            "Body text",
        ),
    );
    gateway.insert_document("about.md", FetchedDocument::plain("About page"));
    gateway
}

async fn session(gateway: &MemoryGateway) -> (Session, Arc<RecordingPresenter>) {
    let presenter = Arc::new(RecordingPresenter::new());
    let config = SessionConfig::default().with_zone(LocalZone::parse("+09:00").unwrap());
    let session = SessionController::new(gateway.clone(), presenter.clone(), config);
    session.load_config().await.unwrap();
    (session, presenter)
}

#[tokio::test]
async fn test_open_structured_document() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    session.open_document("posts/a.md").await.unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert!(!snapshot.dirty);

    let content = snapshot.content.unwrap();
    let form = content.form().unwrap();
    assert_eq!(content.body(), "Body text");
    assert_eq!(form.field("title").unwrap().label, "Title");
    assert_eq!(form.field("tags").unwrap().input, FieldInput::Text("rust, cms".into()));
    assert_eq!(
        form.field("date").unwrap().input,
        FieldInput::Text("2024-01-05T10:00".into())
    );
    assert!(form.field("weight").unwrap().extra);

    let events = presenter.events();
    assert_eq!(
        events.last(),
        Some(&RenderEvent::PreviewShouldRefresh {
            path: "posts/a.md".into(),
            url: "/preview/posts/a/".into()
        })
    );
}

#[tokio::test]
async fn test_unedited_save_is_lossless() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;
    let original = gateway.document("posts/a.md").unwrap();

    session.open_document("posts/a.md").await.unwrap();
    session.save_document().await.unwrap();

    assert_eq!(gateway.document("posts/a.md").unwrap(), original);
}

#[tokio::test]
async fn test_field_edits_reach_the_payload() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("posts/a.md").await.unwrap();

    session
        .apply_edit(Edit::Field {
            name: "tags".into(),
            input: FieldInput::Text(" rust ,  web ,".into()),
        })
        .unwrap();
    session
        .apply_edit(Edit::FieldText {
            name: "draft".into(),
            text: "true".into(),
        })
        .unwrap();
    session
        .apply_edit(Edit::Field {
            name: "date".into(),
            input: FieldInput::Text("2024-02-01T08:30".into()),
        })
        .unwrap();
    assert!(session.snapshot().dirty);
    assert_eq!(presenter.events().last(), Some(&RenderEvent::Dirty(true)));

    assert_eq!(session.save_document().await.unwrap(), SaveOutcome::Saved);

    let SavePayload::Structured { frontmatter, .. } = gateway.saved_payloads().remove(0) else {
        panic!("expected structured payload");
    };
    assert_eq!(frontmatter["tags"], json!(["rust", "web"]));
    assert_eq!(frontmatter["draft"], json!(true));
    assert_eq!(frontmatter["date"], json!("2024-02-01T08:30:00+09:00"));
    assert_eq!(frontmatter["weight"], json!(5));

    let events = presenter.events();
    assert!(events.contains(&RenderEvent::Saved {
        path: "posts/a.md".into(),
        trigger: SaveTrigger::Manual
    }));
    assert_eq!(
        events.last(),
        Some(&RenderEvent::PreviewShouldRefresh {
            path: "posts/a.md".into(),
            url: "/preview/posts/a/".into()
        })
    );
}

#[tokio::test]
async fn test_rejected_edit_is_reported() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();

    let err = session
        .apply_edit(Edit::Field {
            name: "title".into(),
            input: FieldInput::Text("x".into()),
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::Form(_)));
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::Error { operation: Operation::Edit, .. })),
        1
    );
}

#[tokio::test]
async fn test_edit_without_document() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    assert_eq!(
        session.apply_edit(Edit::Body("x".into())),
        Err(SessionError::NoDocument)
    );
    assert_eq!(presenter.events().last(), Some(&RenderEvent::NoDocument));
}

#[tokio::test]
async fn test_failed_load_keeps_path_for_retry() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    gateway.fail_next(GatewayOp::FetchDocument, GatewayError::Network("timeout".into()));
    let err = session.open_document("posts/a.md").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::TransientNetwork));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, Phase::Error);
    assert_eq!(snapshot.handle.unwrap().path, "posts/a.md");
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::LoadFailed { .. })),
        1
    );

    assert_eq!(session.save_document().await.unwrap(), SaveOutcome::NotReady);
    assert_eq!(gateway.calls(GatewayOp::SaveDocument), 0);

    session.open_document("posts/a.md").await.unwrap();
    assert_eq!(session.snapshot().phase, Phase::Ready);
}

#[tokio::test]
async fn test_empty_path_is_rejected() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;

    assert_eq!(
        session.open_document("  ").await,
        Err(SessionError::EmptyPath)
    );
    assert_eq!(gateway.calls(GatewayOp::FetchDocument), 0);
}

#[tokio::test]
async fn test_unauthorized_asks_for_login() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    gateway.fail_next(GatewayOp::FetchDocumentList, GatewayError::Unauthorized);
    let err = session.refresh_document_list().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));

    assert_eq!(presenter.count(|e| *e == RenderEvent::AuthRequired), 1);
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::Error { .. })),
        0
    );
}

#[tokio::test]
async fn test_document_list_is_grouped() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    let groups = session.refresh_document_list().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].label, "Posts");
    assert_eq!(groups[0].documents[0].display_title(), "Hello");
    assert_eq!(groups[1].documents[0].path, "about.md");
    assert_eq!(
        presenter.events().last(),
        Some(&RenderEvent::DocumentList(groups))
    );
}

#[tokio::test]
async fn test_discard_changes_reloads() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();
    session.apply_edit(Edit::Body("scratch".into())).unwrap();

    presenter.answer_next(false);
    assert_eq!(session.discard_changes().await.unwrap(), None);
    assert_eq!(session.snapshot().content.unwrap().body(), "scratch");

    assert!(session.discard_changes().await.unwrap().is_some());
    let snapshot = session.snapshot();
    assert_eq!(snapshot.content.unwrap().body(), "About page");
    assert!(!snapshot.dirty);
    assert_eq!(
        presenter.confirmations()[0],
        ConfirmAction::DiscardChanges {
            path: "about.md".into()
        }
    );
}

#[tokio::test]
async fn test_delete_declined_keeps_document() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();

    presenter.answer_next(false);
    assert_eq!(
        session.delete_document().await.unwrap(),
        DeleteOutcome::Cancelled
    );
    assert!(gateway.contains("about.md"));
    assert_eq!(gateway.calls(GatewayOp::DeleteDocument), 0);
    assert_eq!(session.snapshot().phase, Phase::Ready);
}

#[tokio::test]
async fn test_delete_failure_leaves_state() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();

    gateway.fail_next(
        GatewayOp::DeleteDocument,
        GatewayError::Server {
            status: 500,
            message: "Delete failed".into(),
        },
    );
    assert!(session.delete_document().await.is_err());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.handle.unwrap().path, "about.md");
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::Error { operation: Operation::Delete, .. })),
        1
    );
}

#[tokio::test]
async fn test_delete_of_missing_document_succeeds() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();

    gateway.fail_next(
        GatewayOp::DeleteDocument,
        GatewayError::NotFound("about.md".into()),
    );
    assert_eq!(
        session.delete_document().await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert!(session.snapshot().handle.is_none());
    assert!(presenter.events().contains(&RenderEvent::Cleared));
}

#[tokio::test]
async fn test_create_opens_returned_path() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    let mut form = session.creation_form("posts").unwrap();
    form.set("title", FieldInput::Text("Second Post".into())).unwrap();

    let path = session
        .create_document("posts", form.to_record())
        .await
        .unwrap();
    assert_eq!(path, "posts/second-post.md");

    let snapshot = session.snapshot();
    assert_eq!(snapshot.handle.unwrap().path, path);
    let content = snapshot.content.unwrap();
    assert_eq!(
        content.form().unwrap().field("title").unwrap().input,
        FieldInput::Text("Second Post".into())
    );
    assert!(presenter
        .events()
        .contains(&RenderEvent::Created { path: path.clone() }));
}

#[tokio::test]
async fn test_create_without_returned_path() {
    let gateway = backend();
    gateway.omit_created_path(true);
    let (session, presenter) = session(&gateway).await;

    let err = session
        .create_document("posts", record(json!({"title": "Ghost"})))
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::NotAddressable);
    assert_eq!(gateway.calls(GatewayOp::CreateDocument), 1);
    assert_eq!(gateway.calls(GatewayOp::FetchDocument), 0);
    assert!(session.snapshot().handle.is_none());
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::Error { operation: Operation::Create, .. })),
        1
    );
}

#[tokio::test]
async fn test_create_duplicate_reports_server_message() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    let first = session
        .create_document("posts", record(json!({"title": "Another"})))
        .await;
    assert_eq!(first.unwrap(), "posts/another.md");

    let err = session
        .create_document("posts", record(json!({"title": "Another"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ValidationRejected));
    assert!(presenter.events().contains(&RenderEvent::Error {
        operation: Operation::Create,
        message: "File already exists".into()
    }));
}

#[tokio::test]
async fn test_create_in_unknown_collection() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;

    let err = session
        .create_document("recipes", FrontMatter::new())
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::UnknownCollection("recipes".into()));
    assert_eq!(gateway.calls(GatewayOp::CreateDocument), 0);
}

#[tokio::test]
async fn test_create_at_path() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;

    let path = session
        .create_document_at("notes/todo.md", "- [ ] write tests")
        .await
        .unwrap();
    assert_eq!(path, "notes/todo.md");
    assert_eq!(
        session.snapshot().content,
        Some(DocumentContent::Plain {
            text: "- [ ] write tests".into()
        })
    );
}

#[tokio::test]
async fn test_create_at_path_needs_created_status() {
    let gateway = backend();
    gateway.respond_to_next_create(CreateResponse {
        status: "error".into(),
        path: Some("notes/todo.md".into()),
        log: Some("disk full".into()),
    });
    let (session, presenter) = session(&gateway).await;

    let err = session
        .create_document_at("notes/todo.md", "- [ ] write tests")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::ValidationRejected));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(gateway.calls(GatewayOp::FetchDocument), 0);
    assert!(session.snapshot().handle.is_none());
    assert_eq!(
        presenter.count(|e| matches!(e, RenderEvent::Error { operation: Operation::Create, .. })),
        1
    );
}

#[tokio::test]
async fn test_diff_leaves_session_untouched() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();
    session.apply_edit(Edit::Body("About us".into())).unwrap();
    let before = session.snapshot();

    let diff = session.request_diff().await.unwrap();
    assert_eq!(diff.added(), 1);
    assert_eq!(diff.removed(), 1);

    assert_eq!(session.snapshot(), before);
    assert_eq!(gateway.calls(GatewayOp::SaveDocument), 0);
}

#[tokio::test]
async fn test_diff_without_document() {
    let gateway = backend();
    let (session, _) = session(&gateway).await;
    assert_eq!(
        session.request_diff().await.unwrap_err(),
        SessionError::NoDocument
    );
}

#[tokio::test]
async fn test_show_preview_flushes_or_refreshes() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();
    presenter.take_events();

    assert_eq!(session.show_preview().await.unwrap(), SaveOutcome::Unchanged);
    assert_eq!(
        presenter.take_events(),
        vec![RenderEvent::PreviewShouldRefresh {
            path: "about.md".into(),
            url: "/preview/about/".into()
        }]
    );

    session.apply_edit(Edit::Body("new".into())).unwrap();
    assert_eq!(session.show_preview().await.unwrap(), SaveOutcome::Saved);
    assert!(presenter.events().contains(&RenderEvent::Saved {
        path: "about.md".into(),
        trigger: SaveTrigger::Preview
    }));
    assert!(!session.snapshot().timer_pending);
}

#[tokio::test]
async fn test_build_refreshes_preview() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();
    presenter.take_events();

    session.run_build().await.unwrap();
    let events = presenter.take_events();
    assert_eq!(
        events.first(),
        Some(&RenderEvent::Busy {
            operation: Operation::Build,
            active: true
        })
    );
    assert_eq!(
        events.last(),
        Some(&RenderEvent::PreviewShouldRefresh {
            path: "about.md".into(),
            url: "/preview/about/".into()
        })
    );

    gateway.set_task_report(GatewayOp::RunBuild, TaskReport::error("template error"));
    let err = session.run_build().await.unwrap_err();
    assert_eq!(
        err,
        SessionError::TaskFailed {
            operation: Operation::Build,
            log: "template error".into()
        }
    );
    assert!(!presenter
        .events()
        .iter()
        .any(|e| matches!(e, RenderEvent::PreviewShouldRefresh { .. })));
}

#[tokio::test]
async fn test_sync_refreshes_list() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    presenter.answer_next(false);
    assert_eq!(session.run_sync().await.unwrap(), None);
    assert_eq!(gateway.calls(GatewayOp::RunSync), 0);

    let report = session.run_sync().await.unwrap().unwrap();
    assert!(report.is_ok());
    assert_eq!(gateway.calls(GatewayOp::FetchDocumentList), 1);
    assert!(matches!(
        presenter.events().last(),
        Some(RenderEvent::DocumentList(_))
    ));
}

#[tokio::test]
async fn test_publish_current_document() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;

    assert_eq!(
        session.publish(PublishScope::CurrentDocument).await,
        Err(SessionError::NoDocument)
    );

    session.open_document("about.md").await.unwrap();
    session.apply_edit(Edit::Body("changed".into())).unwrap();
    session.save_document().await.unwrap();

    let report = session
        .publish(PublishScope::CurrentDocument)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.log, "published about.md");
    assert!(presenter.confirmations().contains(&ConfirmAction::Publish {
        path: Some("about.md".into())
    }));

    let report = session.publish(PublishScope::All).await.unwrap().unwrap();
    assert_eq!(report.log, "nothing to commit");
}

#[tokio::test]
async fn test_close_document() {
    let gateway = backend();
    let (session, presenter) = session(&gateway).await;
    session.open_document("about.md").await.unwrap();

    session.close_document();
    assert!(session.snapshot().handle.is_none());
    assert_eq!(presenter.events().last(), Some(&RenderEvent::Cleared));
}
