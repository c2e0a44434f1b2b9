use std::sync::Arc;

use quill::config::Config;
use quill::db::{
    self,
    repositories::{PostRepository, SqlxPostRepository},
};
use quill::jobs::{ChannelJobQueue, JobRunner, JobStats, JobStatsSnapshot};
use quill::models::{CreateAuthorInput, CreatePostInput, SubmitCommentInput};
use quill::services::{NotificationDispatcher, RecordingTransport, Services};

fn comment(text: &str) -> SubmitCommentInput {
    SubmitCommentInput {
        author: "Reader".to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_published_comment_reaches_mail_and_retracted_one_is_skipped() {
    let pool = db::create_test_pool().await.unwrap();
    db::migrations::run_migrations(&pool).await.unwrap();
    let config = Config::default();

    // Same wiring as the server binary, with a recording mail transport
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Arc::new(NotificationDispatcher::from_pool(
        pool.clone(),
        transport.clone(),
        &config,
    ));
    let stats = Arc::new(JobStats::new());
    let (queue, rx) = ChannelJobQueue::new(stats.clone());
    let queue = Arc::new(queue);
    let services = Services::new(pool.clone(), &config, queue.clone());

    let owner = services
        .authors
        .create_author(CreateAuthorInput::new("alice", "alice@example.com", "password123"))
        .await
        .unwrap();
    // Fixture path: already published, no job
    let post = SqlxPostRepository::new(pool.clone())
        .create(owner.id, &CreatePostInput::new("T", "short", "full").published(true))
        .await
        .unwrap();

    let retracted = services
        .moderation
        .submit(post.id, comment("first draft"), None)
        .await
        .unwrap();
    let kept = services
        .moderation
        .submit(post.id, comment("kept comment"), None)
        .await
        .unwrap();

    // Both jobs sit in the channel until the workers start, so the retracted
    // comment is already unpublished when its job runs.
    services.moderation.set_published(retracted.id, true).await.unwrap();
    services.moderation.set_published(retracted.id, false).await.unwrap();
    services.moderation.set_published(kept.id, true).await.unwrap();

    let runner = JobRunner::start(rx, dispatcher, 2, stats.clone());
    runner.shutdown(&queue).await;

    assert_eq!(
        stats.snapshot(),
        JobStatsSnapshot {
            enqueued: 2,
            sent: 1,
            skipped: 1,
            failed: 0,
        }
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New comment on your post \"T\"");
    assert_eq!(sent[0].to, vec!["alice@example.com".to_string()]);
    assert!(sent[0].body.contains("kept comment"));
    assert!(sent[0].body.contains(&format!("#comment-{}", kept.id)));
}

#[tokio::test]
async fn test_jobs_after_shutdown_are_dropped_without_failing() {
    let pool = db::create_test_pool().await.unwrap();
    db::migrations::run_migrations(&pool).await.unwrap();
    let config = Config::default();

    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Arc::new(NotificationDispatcher::from_pool(
        pool.clone(),
        transport.clone(),
        &config,
    ));
    let stats = Arc::new(JobStats::new());
    let (queue, rx) = ChannelJobQueue::new(stats.clone());
    let queue = Arc::new(queue);
    let services = Services::new(pool.clone(), &config, queue.clone());

    let runner = JobRunner::start(rx, dispatcher, 1, stats.clone());
    runner.shutdown(&queue).await;

    let message = services
        .contact
        .submit(quill::models::ContactInput {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            message: "Hello".to_string(),
        })
        .await
        .unwrap();

    // The message is stored even though nobody will mail it
    assert!(message.id > 0);
    assert_eq!(stats.snapshot().enqueued, 0);
    assert!(transport.sent().is_empty());
}
