use std::sync::Arc;

use gallerist::gallery::{Compliance, MessageOutcome, warning_text};
use gallerist::store::{ConfigStore, InMemoryConfigStore};

use crate::gallery_harness::{ScriptedSource, image, message, services};

#[tokio::test]
async fn text_in_gallery_is_warned_deleted_and_warning_cleaned_up() {
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert("gallery_channels", "10").await.unwrap();
    let source = ScriptedSource::new();
    let services = services(store, Arc::clone(&source));

    let outcome = services
        .enforcer
        .handle_message(&message("1", "10", "42", "hi all"), None)
        .await
        .unwrap();

    let MessageOutcome::Remediated(remediation) = outcome else {
        panic!("expected remediation");
    };
    assert!(remediation.original_deleted);
    remediation.cleanup.finished().await;

    let replies = source.replies().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1.content, warning_text("42"));
    assert_eq!(replies[0].1.mention_users, vec!["42"]);
    assert_eq!(source.deleted().await, vec!["1", "warning-1"]);
}

#[tokio::test]
async fn images_and_links_pass_untouched() {
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert("gallery_channels", "10").await.unwrap();
    let source = ScriptedSource::new();
    let services = services(store, Arc::clone(&source));

    for msg in [
        image("1", "10", "42"),
        message("2", "10", "42", "https://cdn.example.com/a.png"),
        message("3", "11", "42", "not a gallery"),
    ] {
        let outcome = services.enforcer.handle_message(&msg, None).await.unwrap();
        assert!(!outcome.was_remediated());
    }

    assert!(source.replies().await.is_empty());
    assert!(source.deleted().await.is_empty());
}

#[tokio::test]
async fn bot_text_in_gallery_is_left_alone() {
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert("gallery_channels", "10").await.unwrap();
    let source = ScriptedSource::new();
    let services = services(store, Arc::clone(&source));
    let mut msg = message("1", "10", "bot", "status update");
    msg.author.bot = true;

    let outcome = services.enforcer.handle_message(&msg, None).await.unwrap();

    assert!(matches!(
        outcome,
        MessageOutcome::Compliant(Compliance::AutomatedSender)
    ));
    assert!(source.replies().await.is_empty());
}
