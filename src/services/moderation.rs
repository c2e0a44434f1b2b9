//! Comment moderation
//!
//! A comment starts unpublished. Only the false→true flip of `is_published`
//! enqueues a `comment_published` job, and the flip is decided by the
//! repository's compare-and-set, so concurrent or repeated publish calls on
//! the same comment notify at most once.

use std::sync::Arc;

use super::error::{CoreError, CoreResult};
use super::paging::fetch_clamped;
use super::validation::non_empty;
use crate::db::repositories::{
    CommentRepository, PostRepository, SqlxCommentRepository, SqlxPostRepository,
};
use crate::db::DynDatabasePool;
use crate::jobs::{enqueue_or_warn, JobQueue};
use crate::models::{
    Comment, Identity, ListParams, NewComment, NotificationJob, PagedResult, SubmitCommentInput,
    AUTHOR_LABEL_MAX_LEN, GUEST_PREFIX,
};

/// Comment moderation service
pub struct CommentModeration {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    queue: Arc<dyn JobQueue>,
}

impl CommentModeration {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            posts,
            comments,
            queue,
        }
    }

    pub fn from_pool(pool: DynDatabasePool, queue: Arc<dyn JobQueue>) -> Self {
        Self::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool),
            queue,
        )
    }

    /// Store a new unpublished comment.
    ///
    /// A logged-in commenter is labelled with their display name and the
    /// submitted label is ignored. Guests must supply a label, which is
    /// stored with the `Guest ` prefix. Only the owner may comment on an
    /// unpublished post; everyone else gets `NotFound`.
    pub async fn submit(
        &self,
        post_id: i64,
        input: SubmitCommentInput,
        submitted_by: Option<&Identity>,
    ) -> CoreResult<Comment> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Post {}", post_id)))?;
        let is_owner = submitted_by.is_some_and(|identity| identity.author_id == post.owner_id);
        if !post.is_published && !is_owner {
            return Err(CoreError::not_found(format!("Post {}", post_id)));
        }

        let author = comment_label(&input.author, submitted_by)?;
        let text = non_empty("Comment text", &input.text)?;

        let comment = self
            .comments
            .create(&NewComment {
                post_id,
                author,
                text,
                is_published: false,
            })
            .await?;

        tracing::info!(
            post_id,
            comment_id = comment.id,
            "Comment submitted for moderation"
        );
        Ok(comment)
    }

    /// Set a comment's publication flag and return the stored comment.
    ///
    /// Enqueues one `comment_published` job if this call flipped the stored
    /// value from false to true. Repeats and unpublishing enqueue nothing.
    pub async fn set_published(&self, comment_id: i64, value: bool) -> CoreResult<Comment> {
        let comment = self.load(comment_id).await?;
        if self.transition(&comment, value).await? {
            return self.load(comment_id).await;
        }
        // Lost the race or already in the requested state; report what is stored
        if comment.is_published == value {
            Ok(comment)
        } else {
            self.load(comment_id).await
        }
    }

    /// Publish each comment individually and return how many actually
    /// flipped. Unknown ids are ignored.
    pub async fn bulk_publish(&self, comment_ids: &[i64]) -> CoreResult<usize> {
        self.bulk_set(comment_ids, true).await
    }

    /// Unpublish each comment individually; never notifies
    pub async fn bulk_unpublish(&self, comment_ids: &[i64]) -> CoreResult<usize> {
        self.bulk_set(comment_ids, false).await
    }

    /// Published comments under a post, newest first, for any viewer.
    ///
    /// The post itself must be visible to `viewer`.
    pub async fn list_for_post(
        &self,
        post_id: i64,
        viewer: Option<&Identity>,
        params: ListParams,
    ) -> CoreResult<PagedResult<Comment>> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Post {}", post_id)))?;
        let is_owner = viewer.is_some_and(|identity| identity.author_id == post.owner_id);
        if !post.is_published && !is_owner {
            return Err(CoreError::not_found(format!("Post {}", post_id)));
        }

        Ok(fetch_clamped(params, |p| self.comments.list_published_for_post(post_id, p)).await?)
    }

    /// Moderation queue: unpublished comments, newest first
    pub async fn list_pending(&self, params: ListParams) -> CoreResult<PagedResult<Comment>> {
        Ok(fetch_clamped(params, |p| self.comments.list_unpublished(p)).await?)
    }

    async fn load(&self, comment_id: i64) -> CoreResult<Comment> {
        self.comments
            .get_by_id(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Comment {}", comment_id)))
    }

    /// Apply `value` row by row. A failing row is logged and skipped so the
    /// rows already flipped (and their queued jobs) are still counted; the
    /// error is returned only when nothing changed.
    async fn bulk_set(&self, comment_ids: &[i64], value: bool) -> CoreResult<usize> {
        let mut changed = 0;
        let mut first_error = None;
        let mut failed = 0;
        for &id in comment_ids {
            match self.bulk_set_one(id, value).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(comment_id = id, error = %e, "Bulk moderation failed for comment");
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        tracing::info!(
            requested = comment_ids.len(),
            changed,
            failed,
            is_published = value,
            "Bulk comment moderation"
        );
        match first_error {
            Some(e) if changed == 0 => Err(e),
            _ => Ok(changed),
        }
    }

    async fn bulk_set_one(&self, comment_id: i64, value: bool) -> CoreResult<bool> {
        let Some(comment) = self.comments.get_by_id(comment_id).await? else {
            tracing::debug!(comment_id, "Bulk moderation skipped unknown comment");
            return Ok(false);
        };
        self.transition(&comment, value).await
    }

    /// Flip `comment` to `value` if the stored flag still differs, enqueueing
    /// the notification on false→true. Returns whether this call flipped it.
    async fn transition(&self, comment: &Comment, value: bool) -> CoreResult<bool> {
        let changed = self
            .comments
            .compare_and_set_published(comment.id, !value, value)
            .await?;

        if !changed {
            tracing::debug!(
                comment_id = comment.id,
                is_published = value,
                "Comment already in requested state"
            );
            return Ok(false);
        }

        tracing::info!(
            comment_id = comment.id,
            post_id = comment.post_id,
            is_published = value,
            "Comment publication changed"
        );
        if value {
            enqueue_or_warn(
                self.queue.as_ref(),
                NotificationJob::comment_published(comment.post_id, comment.id),
            );
        }
        Ok(true)
    }
}

/// Label stored on a new comment
fn comment_label(label: &str, submitted_by: Option<&Identity>) -> CoreResult<String> {
    let stored = match submitted_by {
        Some(identity) => identity.display_name.clone(),
        None => {
            let label = label.trim();
            if label.is_empty() {
                return Err(CoreError::validation("Author name is required"));
            }
            format!("{}{}", GUEST_PREFIX, label)
        }
    };

    if stored.chars().count() > AUTHOR_LABEL_MAX_LEN {
        return Err(CoreError::validation(format!(
            "Author name must be at most {} characters",
            AUTHOR_LABEL_MAX_LEN
        )));
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::author::tests::new_author;
    use crate::db::repositories::{AuthorRepository, SqlxAuthorRepository};
    use crate::db::{create_pool, create_test_pool, migrations};
    use crate::jobs::testing::RecordingQueue;
    use crate::models::{CreatePostInput, JobKind, Post, COMMENT_ID};
    use proptest::prelude::*;

    struct Fixture {
        moderation: CommentModeration,
        queue: Arc<RecordingQueue>,
        posts: Arc<dyn PostRepository>,
        owner: Identity,
    }

    async fn setup_with_pool(pool: DynDatabasePool) -> Fixture {
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let owner = SqlxAuthorRepository::new(pool.clone())
            .create(&new_author("owner"))
            .await
            .unwrap();
        let queue = Arc::new(RecordingQueue::new());
        Fixture {
            moderation: CommentModeration::from_pool(pool.clone(), queue.clone()),
            queue,
            posts: SqlxPostRepository::boxed(pool),
            owner: owner.identity(),
        }
    }

    async fn setup() -> Fixture {
        setup_with_pool(create_test_pool().await.expect("Failed to create test pool")).await
    }

    async fn post(fx: &Fixture, is_published: bool) -> Post {
        fx.posts
            .create(
                fx.owner.author_id,
                &CreatePostInput::new("Post", "short", "full").published(is_published),
            )
            .await
            .unwrap()
    }

    fn guest(label: &str, text: &str) -> SubmitCommentInput {
        SubmitCommentInput {
            author: label.to_string(),
            text: text.to_string(),
        }
    }

    async fn guest_comment(fx: &Fixture, post_id: i64) -> Comment {
        fx.moderation
            .submit(post_id, guest("Alex", "Hello"), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_guest_label_gets_prefix() {
        let fx = setup().await;
        let post = post(&fx, true).await;

        let comment = guest_comment(&fx, post.id).await;

        assert_eq!(comment.author, "Guest Alex");
        assert!(!comment.is_published);
        assert!(fx.queue.is_empty(), "submission must not notify");
    }

    #[tokio::test]
    async fn test_identity_label_replaces_submitted_label() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let reader = Identity {
            author_id: 99,
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            display_name: "reader".to_string(),
            is_staff: false,
        };

        let comment = fx
            .moderation
            .submit(post.id, guest("", "Hi"), Some(&reader))
            .await
            .unwrap();

        assert_eq!(comment.author, "reader");
        let comment = fx
            .moderation
            .submit(post.id, guest("Someone else", "Hi"), Some(&reader))
            .await
            .unwrap();
        assert_eq!(comment.author, "reader");
    }

    #[tokio::test]
    async fn test_guest_without_label_is_rejected() {
        let fx = setup().await;
        let post = post(&fx, true).await;

        let err = fx.moderation.submit(post.id, guest("  ", "Hi"), None).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = fx.moderation.submit(post.id, guest("Alex", " "), None).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_to_missing_or_hidden_post() {
        let fx = setup().await;
        let draft = post(&fx, false).await;

        let err = fx.moderation.submit(999, guest("Alex", "Hi"), None).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err = fx.moderation.submit(draft.id, guest("Alex", "Hi"), None).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        // The owner may comment on their own draft
        let comment = fx
            .moderation
            .submit(draft.id, guest("", "note to self"), Some(&fx.owner))
            .await
            .unwrap();
        assert_eq!(comment.author, "owner");
    }

    #[tokio::test]
    async fn test_publish_twice_notifies_once() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let comment = guest_comment(&fx, post.id).await;

        let first = fx.moderation.set_published(comment.id, true).await.unwrap();
        let second = fx.moderation.set_published(comment.id, true).await.unwrap();

        assert!(first.is_published);
        assert!(second.is_published);
        assert_eq!(fx.queue.len(), 1);
        assert_eq!(
            fx.queue.jobs()[0],
            NotificationJob::comment_published(post.id, comment.id)
        );
    }

    #[tokio::test]
    async fn test_unpublish_does_not_notify() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let comment = guest_comment(&fx, post.id).await;

        fx.moderation.set_published(comment.id, true).await.unwrap();
        let hidden = fx.moderation.set_published(comment.id, false).await.unwrap();
        fx.moderation.set_published(comment.id, false).await.unwrap();

        assert!(!hidden.is_published);
        assert_eq!(fx.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_republish_after_unpublish_notifies_again() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let comment = guest_comment(&fx, post.id).await;

        fx.moderation.set_published(comment.id, true).await.unwrap();
        fx.moderation.set_published(comment.id, false).await.unwrap();
        fx.moderation.set_published(comment.id, true).await.unwrap();

        assert_eq!(fx.queue.count(JobKind::CommentPublished), 2);
    }

    #[tokio::test]
    async fn test_set_published_missing_comment() {
        let fx = setup().await;
        let err = fx.moderation.set_published(404, true).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_publish_counts_only_transitions() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let c1 = guest_comment(&fx, post.id).await;
        let c2 = guest_comment(&fx, post.id).await;
        fx.moderation.set_published(c1.id, true).await.unwrap();
        fx.queue.take();

        let count = fx.moderation.bulk_publish(&[c1.id, c2.id]).await.unwrap();

        assert_eq!(count, 1);
        let jobs = fx.queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].key(COMMENT_ID), Some(c2.id));
    }

    #[tokio::test]
    async fn test_bulk_publish_ignores_unknown_and_duplicate_ids() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let c1 = guest_comment(&fx, post.id).await;

        let count = fx.moderation.bulk_publish(&[c1.id, 12345, c1.id]).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(fx.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_unpublish_is_notification_inert() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let c1 = guest_comment(&fx, post.id).await;
        let c2 = guest_comment(&fx, post.id).await;
        fx.moderation.bulk_publish(&[c1.id, c2.id]).await.unwrap();
        fx.queue.take();

        let count = fx.moderation.bulk_unpublish(&[c1.id, c2.id]).await.unwrap();

        assert_eq!(count, 2);
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_keeps_publication() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let comment = guest_comment(&fx, post.id).await;
        fx.queue.close();

        let published = fx.moderation.set_published(comment.id, true).await.unwrap();

        assert!(published.is_published);
        assert!(fx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_unpublished_comments_hidden_from_everyone() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let visible = guest_comment(&fx, post.id).await;
        let hidden = guest_comment(&fx, post.id).await;
        fx.moderation.set_published(visible.id, true).await.unwrap();

        for viewer in [None, Some(&fx.owner)] {
            let page = fx
                .moderation
                .list_for_post(post.id, viewer, ListParams::default())
                .await
                .unwrap();
            let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![visible.id]);
            assert!(!ids.contains(&hidden.id));
        }
    }

    #[tokio::test]
    async fn test_list_for_hidden_post() {
        let fx = setup().await;
        let draft = post(&fx, false).await;

        let err = fx
            .moderation
            .list_for_post(draft.id, None, ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(fx
            .moderation
            .list_for_post(draft.id, Some(&fx.owner), ListParams::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_list_pending_newest_first() {
        let fx = setup().await;
        let post = post(&fx, true).await;
        let older = guest_comment(&fx, post.id).await;
        let newer = guest_comment(&fx, post.id).await;
        let published = guest_comment(&fx, post.id).await;
        fx.moderation.set_published(published.id, true).await.unwrap();

        let page = fx.moderation.list_pending(ListParams::new(7, 10)).await.unwrap();

        assert_eq!(page.page, 1);
        let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publish_notifies_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("race.db").display());
        let pool = create_pool(&crate::config::DatabaseConfig {
            driver: crate::config::DatabaseDriver::Sqlite,
            url,
        })
        .await
        .expect("Failed to create file pool");
        let fx = Arc::new(setup_with_pool(pool).await);
        let post = post(&fx, true).await;

        for _ in 0..10 {
            let id = guest_comment(&fx, post.id).await.id;
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let fx = fx.clone();
                    tokio::spawn(async move { fx.moderation.set_published(id, true).await })
                })
                .collect();
            for handle in handles {
                assert!(handle.await.unwrap().unwrap().is_published);
            }
        }

        assert_eq!(fx.queue.count(JobKind::CommentPublished), 10);
    }

    /// Comment repository whose compare-and-set fails for one id
    struct FailingCas {
        inner: Arc<dyn CommentRepository>,
        broken_id: i64,
    }

    #[async_trait::async_trait]
    impl CommentRepository for FailingCas {
        async fn create(&self, comment: &NewComment) -> anyhow::Result<Comment> {
            self.inner.create(comment).await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Comment>> {
            self.inner.get_by_id(id).await
        }

        async fn compare_and_set_published(
            &self,
            id: i64,
            expected: bool,
            new: bool,
        ) -> anyhow::Result<bool> {
            if id == self.broken_id {
                anyhow::bail!("database is locked");
            }
            self.inner.compare_and_set_published(id, expected, new).await
        }

        async fn list_published_for_post(
            &self,
            post_id: i64,
            params: ListParams,
        ) -> anyhow::Result<(Vec<Comment>, i64)> {
            self.inner.list_published_for_post(post_id, params).await
        }

        async fn list_unpublished(&self, params: ListParams) -> anyhow::Result<(Vec<Comment>, i64)> {
            self.inner.list_unpublished(params).await
        }
    }

    #[tokio::test]
    async fn test_bulk_publish_keeps_count_past_failing_row() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let fx = setup_with_pool(pool.clone()).await;
        let post = post(&fx, true).await;
        let first = guest_comment(&fx, post.id).await;
        let broken = guest_comment(&fx, post.id).await;
        let last = guest_comment(&fx, post.id).await;

        let moderation = CommentModeration::new(
            fx.posts.clone(),
            Arc::new(FailingCas {
                inner: SqlxCommentRepository::boxed(pool),
                broken_id: broken.id,
            }),
            fx.queue.clone(),
        );

        let count = moderation
            .bulk_publish(&[first.id, broken.id, last.id])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(fx.queue.count(JobKind::CommentPublished), 2);

        // Nothing changed at all: the failure surfaces
        let err = moderation.bulk_publish(&[broken.id]).await.unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn test_label_length_limit_includes_prefix() {
        let max_guest = "a".repeat(AUTHOR_LABEL_MAX_LEN - GUEST_PREFIX.len());
        assert!(comment_label(&max_guest, None).is_ok());
        assert!(comment_label(&format!("{}a", max_guest), None).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_guest_label_is_prefixed_and_trimmed(label in "[A-Za-z0-9 ]{0,40}") {
            match comment_label(&label, None) {
                Ok(stored) => {
                    prop_assert_eq!(stored, format!("{}{}", GUEST_PREFIX, label.trim()));
                }
                Err(CoreError::Validation(_)) => prop_assert!(label.trim().is_empty()),
                Err(e) => prop_assert!(false, "unexpected error {}", e),
            }
        }

        #[test]
        fn prop_identity_label_ignores_input(label in ".{0,40}") {
            let identity = Identity {
                author_id: 1,
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                display_name: "alice".to_string(),
                is_staff: false,
            };
            prop_assert_eq!(comment_label(&label, Some(&identity)).unwrap(), "alice");
        }
    }
}
